use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::services::AccessTokenClaims;
use crate::startup::AppState;

/// Middleware to require authentication. Verifies the bearer token and
/// stores the resolved claims in request extensions so handlers can
/// access them through [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state
        .jwt
        .validate_access_token(token)
        .map_err(AppError::AuthError)?;

    // Add to tracing span for observability
    tracing::Span::current().record("user_id", claims.sub.as_str());

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get the acting identity in handlers
pub struct AuthUser(pub AccessTokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<AccessTokenClaims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser(claims.clone()))
    }
}

/// Gate for the admin-only order mutations.
pub fn require_admin(claims: &AccessTokenClaims) -> Result<(), AppError> {
    if claims.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(anyhow::anyhow!("Admin role required")))
    }
}
