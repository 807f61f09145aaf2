//! Caller identification.
//!
//! Tokens are issued by the authentication service; this module only
//! resolves them through the configured [`SessionStore`](crate::infrastructure::SessionStore).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiErrorResponse;
use super::handlers::AppState;
use crate::domain::{AccessToken, UserId};

/// Request header carrying the access token.
pub const TOKEN_HEADER: &str = "token";

/// The resolved identity of the caller.
///
/// Extracting it rejects the request with 401 when the `token` header is
/// missing, empty, or unknown to the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            tracing::debug!("Request without access token");
            return Err(ApiErrorResponse::unauthorized());
        };

        let token = AccessToken::new(token);
        match state.session_store.resolve(&token).await? {
            Some(user_id) => Ok(Self(user_id)),
            None => {
                tracing::debug!("Access token did not resolve to a user");
                Err(ApiErrorResponse::unauthorized())
            }
        }
    }
}
