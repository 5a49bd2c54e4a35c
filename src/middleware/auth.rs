use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::session;

/// The authenticated user, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
}

/// Rejects requests whose session carries no user with `401`.
pub async fn require_auth(session: Session, mut request: Request, next: Next) -> AppResult<Response> {
    let Some(id) = session::current_user_id(&session).await? else {
        debug!(method = %request.method(), path = %request.uri().path(), "unauthenticated request rejected");
        return Err(AppError::Unauthorized);
    };

    request.extensions_mut().insert(CurrentUser { id });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}
