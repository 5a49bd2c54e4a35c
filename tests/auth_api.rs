mod common;

use axum::http::{header, Method, StatusCode};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::json;

use common::{
    body_json, empty_request, json_request, session_cookie, set_cookie_header, spawn_app,
    spawn_app_with, TestApp, PASSWORD, USERNAME,
};

/// Stored `expiry_date` of every session row.
async fn session_expiries(app: &TestApp) -> Vec<i64> {
    let conn = app.store.connection();
    let rows = conn
        .query_all(Statement::from_string(
            conn.get_database_backend(),
            format!(
                "SELECT expiry_date FROM {} ORDER BY expiry_date",
                app.store.table_name()
            ),
        ))
        .await
        .unwrap();
    rows.iter()
        .map(|row| row.try_get("", "expiry_date").unwrap())
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn me_without_session_is_anonymous() {
    let app = spawn_app().await;
    let (status, body) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "authenticated": false }));
}

#[tokio::test]
async fn login_sets_cookie_and_me_reports_user() {
    let app = spawn_app().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = set_cookie_header(&response).expect("session cookie");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(!set_cookie.contains("Secure"));

    let cookie = session_cookie(&response).unwrap();
    assert_eq!(body_json(response).await, json!({ "message": "Logged in" }));

    let (_, me) = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me["authenticated"], true);
    assert_eq!(me["user"]["username"], USERNAME);
    assert!(me["user"]["id"].is_number());
}

#[tokio::test]
async fn login_issues_a_fresh_session_id() {
    let app = spawn_app().await;

    let first = app.login().await;

    // Logging in again while carrying the old cookie must not reuse it.
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            Some(&first),
            json!({ "username": USERNAME, "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = session_cookie(&response).expect("new cookie");
    assert_ne!(first, second);

    let (_, me) = app.get("/auth/me", Some(&first)).await;
    assert_eq!(me["authenticated"], false);
    let (_, me) = app.get("/auth/me", Some(&second)).await;
    assert_eq!(me["authenticated"], true);
}

#[tokio::test]
async fn unknown_user_and_wrong_password_look_identical() {
    let app = spawn_app().await;

    let (wrong_status, wrong_body) = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": "nope" }),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": "ghost", "password": "nope" }),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body, json!({ "message": "Invalid credentials" }));
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn failed_login_sets_no_cookie() {
    let app = spawn_app().await;
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": "nope" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn login_validates_body() {
    let app = spawn_app().await;

    let (status, body) = app
        .json(Method::POST, "/auth/login", None, json!({ "username": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error");
    assert_eq!(
        body["errors"],
        json!([
            { "path": "body.username", "message": "Required" },
            { "path": "body.password", "message": "Required" },
        ])
    );
}

#[tokio::test]
async fn login_rejects_unreadable_json() {
    let app = spawn_app().await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Validation error");
    assert_eq!(body["errors"][0]["path"], "body");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn_app().await;
    let cookie = app.login().await;

    let response = app
        .send(empty_request(Method::POST, "/auth/logout", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let removal = set_cookie_header(&response).expect("removal cookie");
    assert!(removal.contains("Max-Age=0"));
    assert_eq!(body_json(response).await, json!({ "message": "Logged out" }));

    let (_, me) = app.get("/auth/me", Some(&cookie)).await;
    assert_eq!(me, json!({ "authenticated": false }));

    let (status, _) = app.get("/tickets", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_is_fine() {
    let app = spawn_app().await;
    let response = app.send(empty_request(Method::POST, "/auth/logout", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_attempts_are_rate_limited() {
    let app = spawn_app_with(|config| config.login_rate_limit.max_attempts = 2).await;
    let attempt = json!({ "username": USERNAME, "password": "nope" });

    for _ in 0..2 {
        let (status, _) = app
            .json(Method::POST, "/auth/login", None, attempt.clone())
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app
        .send(json_request(Method::POST, "/auth/login", None, attempt))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Too many login attempts, please try again later." })
    );

    // Other routes are not counted.
    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn production_cookies_are_secure() {
    let app = spawn_app_with(|config| {
        config.environment = ticketdesk::config::Environment::Production;
    })
    .await;

    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": PASSWORD }),
        ))
        .await;
    let set_cookie = set_cookie_header(&response).expect("session cookie");
    assert!(set_cookie.contains("Secure"));
}

#[tokio::test]
async fn custom_cookie_name_is_used() {
    let app = spawn_app_with(|config| config.session.cookie_name = "desk.sid".into()).await;
    let response = app
        .send(json_request(
            Method::POST,
            "/auth/login",
            None,
            json!({ "username": USERNAME, "password": PASSWORD }),
        ))
        .await;

    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("desk.sid=")));
}

#[tokio::test]
async fn session_lifetime_does_not_slide() {
    let app = spawn_app().await;
    let cookie = app.login().await;
    let at_login = session_expiries(&app).await;
    assert_eq!(at_login.len(), 1);

    // Long enough for a refreshed expiry to land on a later second.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    for uri in ["/auth/me", "/tickets"] {
        let response = app.send(empty_request(Method::GET, uri, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(set_cookie_header(&response).is_none(), "{uri} re-issued the cookie");
    }

    assert_eq!(session_expiries(&app).await, at_login);
}
