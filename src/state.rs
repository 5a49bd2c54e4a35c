use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthService;
use crate::config::Config;
use crate::middleware::LoginRateLimiter;
use crate::tickets::TicketService;
use crate::uploads::UploadService;

/// Handles shared by every handler. Cloned per request, so everything in here
/// is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub tickets: TicketService,
    pub uploads: UploadService,
    pub limiter: Arc<LoginRateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, db: DatabaseConnection) -> Self {
        Self {
            auth: AuthService::new(db.clone()),
            tickets: TicketService::new(db),
            uploads: UploadService::new(config.upload_dir.clone()),
            limiter: Arc::new(LoginRateLimiter::new(config.login_rate_limit)),
            config: Arc::new(config),
        }
    }
}
