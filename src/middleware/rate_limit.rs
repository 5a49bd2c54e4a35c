use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Rolling-window counter of login attempts per client address.
#[derive(Debug)]
pub struct LoginRateLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl LoginRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: config.window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Records an attempt for `key`. Over the limit, returns the number of
    /// seconds until the oldest attempt leaves the window.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);

        attempts.retain(|_, hits| {
            while hits
                .front()
                .is_some_and(|hit| now.saturating_duration_since(*hit) >= self.window)
            {
                hits.pop_front();
            }
            !hits.is_empty()
        });

        let hits = attempts.entry(key.to_string()).or_default();
        if hits.len() >= self.max_attempts {
            let waited = hits
                .front()
                .map(|oldest| now.saturating_duration_since(*oldest))
                .unwrap_or_default();
            let remaining = self.window.saturating_sub(waited);
            return Err(remaining.as_secs().max(1));
        }

        hits.push_back(now);
        Ok(())
    }
}

/// The address a login attempt is counted against.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .flatten();

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(ip)) => ip.to_string(),
        (None, None) => "unknown".to_string(),
    }
}

pub async fn rate_limit_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let key = client_key(request.headers(), peer, state.config.trust_proxy);

    if let Err(retry_after) = state.limiter.check(&key) {
        warn!(client = %key, retry_after, "login rate limit exceeded");
        return Err(AppError::RateLimited { retry_after });
    }

    Ok(next.run(request).await)
}
