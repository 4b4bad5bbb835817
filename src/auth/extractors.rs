use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::User;

/// Authenticated caller: bearer token verified and the account loaded, so
/// handlers never see a token whose user has been deleted.
pub struct AuthUser(pub User);

// Every failure class gets the same rejection body; logs keep the real
// reason. Callers must not be able to probe which check failed.
fn unauthorized() -> ApiError {
    ApiError::Authentication("Invalid or missing authentication token".into())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                unauthorized()
            })?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| {
                warn!("invalid auth scheme");
                unauthorized()
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(reason = %e, "token rejected");
            unauthorized()
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                unauthorized()
            })?;

        Ok(AuthUser(user))
    }
}
