use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use time::OffsetDateTime;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::Role;

use super::session::{self, Session, SessionIdentity};

/// Resolves the session cookie against the store. Rejects with the
/// unauthenticated outcome before the handler body runs.
pub struct AuthedUser(pub SessionIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get(header::COOKIE)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token =
            session::token_from_cookie_header(cookie_header, &state.config.session.cookie_name)
                .ok_or(ApiError::Unauthenticated)?;

        let identity = Session::find_valid(&state.db, token, OffsetDateTime::now_utc())
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(AuthedUser(identity))
    }
}

/// Admin gate. Identity resolves first; the role check runs strictly after
/// it, and a mismatch leaves the session intact.
pub struct AdminUser(pub SessionIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthedUser(identity) = AuthedUser::from_request_parts(parts, state).await?;
        if identity.role != Role::Admin {
            warn!(user_id = %identity.user_id, "admin route refused");
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(identity))
    }
}
