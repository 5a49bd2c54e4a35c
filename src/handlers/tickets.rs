use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::{Map, Value};
use tracing::debug;

use super::{json_body, MessageResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::tickets::{Page, TicketView};
use crate::validation::{ticket_id, ListQuery, NewTicket, TicketPatch};

/// Path id that can name a row, else `404`.
fn existing_id(raw: &str) -> AppResult<i32> {
    ticket_id(raw)?.ok_or(AppError::NotFound)
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Page<TicketView>>> {
    let params: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let query = ListQuery::from_query(&params)?;
    Ok(Json(state.tickets.list(query).await?))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TicketView>> {
    let id = existing_id(&id)?;
    Ok(Json(state.tickets.get(id).await?))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<TicketView>> {
    let new = NewTicket::from_body(&json_body(body)?)?;
    debug!(user_id = user.id, account = %new.account_name, "creating ticket");
    Ok(Json(state.tickets.create(new).await?))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<TicketView>> {
    // Ill-formed ids are a 400 even when the body is bad too.
    let id = ticket_id(&id)?;
    let patch = TicketPatch::from_body(&json_body(body)?)?;
    let id = id.ok_or(AppError::NotFound)?;
    debug!(user_id = user.id, ticket_id = id, "updating ticket");
    Ok(Json(state.tickets.update(id, patch).await?))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = existing_id(&id)?;
    debug!(user_id = user.id, ticket_id = id, "deleting ticket");
    state.tickets.delete(id).await?;
    Ok(MessageResponse::new("Deleted"))
}
