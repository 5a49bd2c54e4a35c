#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ticketdesk::{auth::AuthService, create_router, prepare_database, AppState, Config, SeaOrmStore};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "changeme";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub store: SeaOrmStore,
    pub config: Config,
    pub upload_dir: TempDir,
}

/// In-memory SQLite. One connection, so every query sees the same database.
pub async fn test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    Database::connect(opt).await.expect("connect to sqlite")
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let db = test_db().await;
    let upload_dir = tempfile::tempdir().expect("temp upload dir");

    let mut config = Config::default();
    config.upload_dir = upload_dir.path().to_path_buf();
    configure(&mut config);

    let store = SeaOrmStore::new(db.clone()).with_table_name(config.session.table_name.clone());
    prepare_database(&db, &store).await.expect("migrate");
    AuthService::new(db.clone())
        .seed_user(USERNAME, PASSWORD)
        .await
        .expect("seed user");

    let router = create_router(AppState::new(config.clone(), db.clone()), store.clone())
        .expect("build router");

    TestApp {
        router,
        db,
        store,
        config,
        upload_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router")
    }

    /// Logs in as the seeded user and returns the `name=value` cookie pair.
    pub async fn login(&self) -> String {
        let response = self
            .send(json_request(
                Method::POST,
                "/auth/login",
                None,
                serde_json::json!({ "username": USERNAME, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response).expect("login sets a session cookie")
    }

    pub async fn json(&self, method: Method, uri: &str, cookie: Option<&str>, body: Value) -> (StatusCode, Value) {
        let response = self.send(json_request(method, uri, cookie, body)).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let response = self.send(empty_request(Method::GET, uri, cookie)).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

pub fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// The full `Set-Cookie` header for the session cookie, if any.
pub fn set_cookie_header<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("connect.sid="))
        .map(str::to_string)
}

/// Just the `name=value` pair of the session cookie.
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    set_cookie_header(response).and_then(|value| value.split(';').next().map(str::to_string))
}

/// One multipart part: (field, filename, content type, bytes).
pub type Part<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

pub const BOUNDARY: &str = "ticketdesk-test-boundary";

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>], cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/uploads")
        .header(header::HOST, "desk.test")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
