use secrecy::Secret;
use service_core::config as core_config;
use service_core::config::get_env;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct OrderConfig {
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory the payment proofs are written to. Also served statically
    /// under /uploads.
    pub local_path: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseBackend {
    Mongo,
    Memory,
}

impl OrderConfig {
    pub fn load() -> Result<Self, AppError> {
        // Common config handles .env and APP__ prefixed overrides.
        let common = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(OrderConfig {
            common,
            database: DatabaseConfig {
                backend: get_env("DATABASE_BACKEND", Some("mongo"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("storefront"), is_prod)?,
            },
            storage: StorageConfig {
                local_path: get_env("UPLOADS_PATH", Some("uploads"), is_prod)?,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(get_env(
                    "JWT_SECRET",
                    Some("dev-secret-change-me"),
                    is_prod,
                )?),
                access_token_expiry_minutes: get_env("JWT_EXPIRY_MINUTES", Some("60"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!("invalid JWT_EXPIRY_MINUTES: {}", e))
                    })?,
            },
        })
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" => Ok(DatabaseBackend::Mongo),
            "memory" => Ok(DatabaseBackend::Memory),
            _ => Err(format!("Invalid database backend: {}", s)),
        }
    }
}
