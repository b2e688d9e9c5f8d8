use crate::config::{DatabaseBackend, OrderConfig};
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::{JwtService, LocalStorage, MemoryStore, MongoDb, OrderStore, Storage};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: OrderConfig,
    pub store: Arc<dyn OrderStore>,
    pub storage: Arc<dyn Storage>,
    pub jwt: JwtService,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    pub async fn build(config: OrderConfig) -> Result<Self, AppError> {
        let store: Arc<dyn OrderStore> = match config.database.backend {
            DatabaseBackend::Mongo => {
                let db = MongoDb::connect(&config.database.uri, &config.database.database)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to MongoDB: {}", e);
                        e
                    })?;
                db.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;
                Arc::new(db)
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory order store; data will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.local_path)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?,
        );

        let jwt = JwtService::new(&config.auth);

        let state = AppState {
            config: config.clone(),
            store,
            storage,
            jwt,
        };

        let api_routes = Router::new()
            .route(
                "/orders",
                post(handlers::orders::create_order).get(handlers::orders::list_all_orders),
            )
            .route("/orders/me", get(handlers::orders::list_my_orders))
            .route("/orders/:id", get(handlers::orders::get_order))
            .route(
                "/orders/:id/payment-proof",
                post(handlers::orders::upload_payment_proof),
            )
            .route(
                "/orders/:id/payment-status",
                put(handlers::orders::update_payment_status),
            )
            .route(
                "/orders/:id/delivery-status",
                put(handlers::orders::update_delivery_status),
            )
            .route_layer(from_fn_with_state(state.clone(), auth_middleware));

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .nest("/api", api_routes)
            // Uploaded proofs are served statically, referenced from orders
            // by their storage key.
            .nest_service("/uploads", ServeDir::new(&config.storage.local_path))
            .layer(DefaultBodyLimit::max(
                handlers::orders::PROOF_BODY_LIMIT_BYTES,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::InternalError(anyhow::Error::new(e))
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?
            .port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> Arc<dyn OrderStore> {
        self.state.store.clone()
    }

    pub fn jwt(&self) -> JwtService {
        self.state.jwt.clone()
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
