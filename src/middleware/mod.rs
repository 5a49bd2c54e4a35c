//! Request gates applied at the router.

pub mod auth;
pub mod rate_limit;

pub use auth::{require_auth, CurrentUser};
pub use rate_limit::{client_key, rate_limit_login, LoginRateLimiter};
