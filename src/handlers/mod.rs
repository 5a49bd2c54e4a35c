//! HTTP handlers. Each one parses its input, calls one service and maps the
//! result to JSON; failures go through [`AppError`]'s response mapping.

pub mod auth;
pub mod health;
pub mod tickets;
pub mod uploads;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

/// Unwraps a JSON body, reporting unreadable input as a validation error on
/// `body`.
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> AppResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::invalid("body", rejection.body_text()))
}
