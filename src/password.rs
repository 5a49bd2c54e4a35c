//! bcrypt hashing and verification on the blocking thread pool.

use std::sync::LazyLock;

use crate::error::{AppError, AppResult};

/// Cost used for seeded accounts.
pub const HASH_COST: u32 = 10;

/// Compared against when the username is unknown so both failure paths pay
/// for one bcrypt round.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("ticketdesk-dummy-password", HASH_COST).ok());

pub async fn hash(plaintext: &str) -> AppResult<String> {
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, HASH_COST))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub async fn verify(plaintext: &str, hash: &str) -> AppResult<bool> {
    let plaintext = plaintext.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))
}

/// Burns one comparison for a login attempt whose user does not exist.
pub async fn verify_dummy(plaintext: &str) {
    let plaintext = plaintext.to_string();
    let _ = tokio::task::spawn_blocking(move || {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = bcrypt::verify(plaintext, hash);
        }
    })
    .await;
}
