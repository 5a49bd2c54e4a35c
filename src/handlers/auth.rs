use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;
use tracing::info;

use super::{json_body, MessageResponse};
use crate::error::AppResult;
use crate::session;
use crate::state::AppState;
use crate::validation::Credentials;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Reports the session's user. A session pointing at a removed user counts as
/// anonymous.
pub async fn me(State(state): State<AppState>, session: Session) -> AppResult<Json<MeResponse>> {
    let user = match session::current_user_id(&session).await? {
        Some(id) => state.auth.find_user(id).await?,
        None => None,
    };

    Ok(Json(MeResponse {
        authenticated: user.is_some(),
        user: user.map(|user| UserSummary {
            id: user.id,
            username: user.username,
        }),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let credentials = Credentials::from_body(&json_body(body)?)?;
    let user = state.auth.authenticate(&credentials).await?;

    session::establish(&session, user.id, state.config.session.ttl).await?;
    info!(user_id = user.id, username = %user.username, "login succeeded");

    Ok(MessageResponse::new("Logged in"))
}

pub async fn logout(session: Session) -> AppResult<Json<MessageResponse>> {
    let user_id = session::current_user_id(&session).await?;
    session::destroy(&session).await?;
    if let Some(user_id) = user_id {
        info!(user_id, "logged out");
    }
    Ok(MessageResponse::new("Logged out"))
}
