use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeader, trace::TraceLayer,
};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::{Config, ConfigError};
use crate::handlers;
use crate::middleware;
use crate::session::{same_site, signing_key};
use crate::session_store::SeaOrmStore;
use crate::state::AppState;
use crate::uploads::{MAX_FILES, MAX_FILE_SIZE};

/// Multipart framing on top of the largest accepted batch.
const UPLOAD_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_SIZE + 1024 * 1024;

pub fn create_router(state: AppState, store: SeaOrmStore) -> Result<Router, ConfigError> {
    let config = state.config.clone();

    let auth = Router::new()
        .route("/me", get(handlers::auth::me))
        .route(
            "/login",
            post(handlers::auth::login).layer(from_fn_with_state(
                state.clone(),
                middleware::rate_limit_login,
            )),
        )
        .route("/logout", post(handlers::auth::logout));

    let tickets = Router::new()
        .route(
            "/",
            get(handlers::tickets::list_tickets).post(handlers::tickets::create_ticket),
        )
        .route(
            "/{id}",
            get(handlers::tickets::get_ticket)
                .put(handlers::tickets::update_ticket)
                .delete(handlers::tickets::delete_ticket),
        )
        .route_layer(from_fn(middleware::require_auth));

    let uploads = Router::new()
        .route(
            "/",
            post(handlers::uploads::upload_files)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
                .route_layer(from_fn(middleware::require_auth)),
        )
        .fallback_service(static_uploads(&config));

    let session_layer = SessionManagerLayer::new(store)
        .with_name(config.session.cookie_name.clone())
        .with_http_only(true)
        .with_secure(config.secure_cookies())
        .with_same_site(same_site(&config))
        .with_expiry(Expiry::OnInactivity(config.session.ttl))
        .with_signed(signing_key(&config.session.secret));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/auth", auth)
        .nest("/tickets", tickets)
        .nest("/uploads", uploads)
        .with_state(state)
        .layer(session_layer);

    if let Some(cors) = cors_layer(&config)? {
        app = app.layer(cors);
    }

    Ok(app.layer(TraceLayer::new_for_http()))
}

fn static_uploads(config: &Config) -> SetResponseHeader<ServeDir, HeaderValue> {
    let cache = if config.environment.is_production() {
        HeaderValue::from_static("public, max-age=31536000, immutable")
    } else {
        HeaderValue::from_static("no-cache")
    };
    SetResponseHeader::overriding(ServeDir::new(&config.upload_dir), header::CACHE_CONTROL, cache)
}

/// Credentialed CORS for the single configured origin.
fn cors_layer(config: &Config) -> Result<Option<CorsLayer>, ConfigError> {
    if !config.cors.enabled {
        return Ok(None);
    }
    let origin = config
        .cors
        .origin
        .as_deref()
        .ok_or(ConfigError::Missing("CORS_ORIGIN"))?;
    let origin = HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
        key: "CORS_ORIGIN",
        message: e.to_string(),
    })?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}
