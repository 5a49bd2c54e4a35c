mod common;

use std::net::SocketAddr;

use reqwest::StatusCode;

use common::{spawn_app, TestApp, PASSWORD, USERNAME};
use ticketdesk::client::{ApiClient, ClientError, TicketPayload, UploadFile};

/// Serves the app on an ephemeral port and returns its base URL.
async fn serve(app: &TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn full_ticket_workflow() {
    let app = spawn_app().await;
    let client = ApiClient::new(&serve(&app).await).unwrap();

    assert!(!client.me().await.unwrap().authenticated);

    let err = client.list_tickets(None, None).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Status { status, ref message }
            if status == StatusCode::UNAUTHORIZED && message == "Unauthorized"
    ));

    assert_eq!(client.login(USERNAME, PASSWORD).await.unwrap(), "Logged in");
    let me = client.me().await.unwrap();
    assert_eq!(me.user.unwrap().username, USERNAME);

    let uploaded = client
        .upload(vec![UploadFile {
            file_name: "front.png".into(),
            mime_type: "image/png".into(),
            bytes: b"\x89PNG fake".to_vec(),
        }])
        .await
        .unwrap();
    assert_eq!(uploaded.len(), 1);
    assert!(uploaded[0].url.starts_with("http://127.0.0.1:"));

    let ticket = client
        .create_ticket(TicketPayload {
            account_name: Some("Acme".into()),
            city: Some("Springfield".into()),
            priority: Some("medium".into()),
            work_type: Some("removal".into()),
            pictures: Some(vec![uploaded[0].url.clone()]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(ticket.priority.as_str(), "MEDIUM");
    assert_eq!(ticket.images.len(), 1);

    let updated = client
        .update_ticket(
            ticket.id,
            TicketPayload {
                priority: Some("high".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.priority.as_str(), "HIGH");
    assert_eq!(client.get_ticket(ticket.id).await.unwrap(), updated);

    let page = client.list_tickets(Some(1), Some(10)).await.unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.data[0].id, ticket.id);

    client.delete_ticket(ticket.id).await.unwrap();
    let err = client.get_ticket(ticket.id).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Status { status, ref message }
            if status == StatusCode::NOT_FOUND && message == "Ticket not found"
    ));

    assert_eq!(client.logout().await.unwrap(), "Logged out");
    assert!(!client.me().await.unwrap().authenticated);
}

#[tokio::test]
async fn bad_credentials_surface_server_message() {
    let app = spawn_app().await;
    let client = ApiClient::new(&serve(&app).await).unwrap();

    let err = client.login(USERNAME, "wrong").await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other}"),
    }
}
