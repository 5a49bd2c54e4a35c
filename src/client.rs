//! Typed HTTP client for the ticket API.
//!
//! The client keeps the session cookie between calls, so a [`ApiClient::login`]
//! authenticates every request made afterwards on the same instance.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handlers::auth::MeResponse;
use crate::handlers::uploads::UploadResponse;
use crate::tickets::{Page, TicketView};
use crate::uploads::StoredFile;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded {status}: {message}")]
    Status { status: StatusCode, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Fields of a ticket to create or change. `None` fields are left out of the
/// request; an empty string clears a nullable field on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub under_warranty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_model_or_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requesting_tech_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pictures: Option<Vec<String>>,
}

impl TicketPayload {
    /// Upper-cases the enum fields the server matches against.
    pub fn normalized(mut self) -> Self {
        self.priority = self.priority.map(|p| p.trim().to_uppercase());
        self.work_type = self.work_type.map(|w| w.trim().to_uppercase());
        self
    }
}

/// An image to send with [`ApiClient::upload`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(base_url, http))
    }

    /// Uses a caller-built client. It needs a cookie store for the session to
    /// stick.
    pub fn with_client(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<String> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        Ok(expect_success(resp).await?.json::<MessageBody>().await?.message)
    }

    pub async fn logout(&self) -> ClientResult<String> {
        let resp = self.http.post(self.url("/auth/logout")).send().await?;
        Ok(expect_success(resp).await?.json::<MessageBody>().await?.message)
    }

    pub async fn me(&self) -> ClientResult<MeResponse> {
        let resp = self.http.get(self.url("/auth/me")).send().await?;
        Ok(expect_success(resp).await?.json().await?)
    }

    pub async fn list_tickets(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> ClientResult<Page<TicketView>> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page));
        }
        if let Some(page_size) = page_size {
            query.push(("pageSize", page_size));
        }
        let resp = self
            .http
            .get(self.url("/tickets"))
            .query(&query)
            .send()
            .await?;
        Ok(expect_success(resp).await?.json().await?)
    }

    pub async fn get_ticket(&self, id: i32) -> ClientResult<TicketView> {
        let resp = self
            .http
            .get(self.url(&format!("/tickets/{id}")))
            .send()
            .await?;
        Ok(expect_success(resp).await?.json().await?)
    }

    pub async fn create_ticket(&self, payload: TicketPayload) -> ClientResult<TicketView> {
        let resp = self
            .http
            .post(self.url("/tickets"))
            .json(&payload.normalized())
            .send()
            .await?;
        Ok(expect_success(resp).await?.json().await?)
    }

    pub async fn update_ticket(&self, id: i32, payload: TicketPayload) -> ClientResult<TicketView> {
        let resp = self
            .http
            .put(self.url(&format!("/tickets/{id}")))
            .json(&payload.normalized())
            .send()
            .await?;
        Ok(expect_success(resp).await?.json().await?)
    }

    pub async fn delete_ticket(&self, id: i32) -> ClientResult<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/tickets/{id}")))
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    pub async fn upload(&self, files: Vec<UploadFile>) -> ClientResult<Vec<StoredFile>> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)?;
            form = form.part("files", part);
        }

        let resp = self
            .http
            .post(self.url("/uploads"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = expect_success(resp).await?.json().await?;
        Ok(body.uploaded)
    }
}

/// Turns a non-2xx response into [`ClientError::Status`], using the server's
/// `message` when the body carries one.
async fn expect_success(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(ClientError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_omits_absent_fields_and_uppercases_enums() {
        let payload = TicketPayload {
            account_name: Some("Acme".into()),
            priority: Some("high".into()),
            work_type: Some(" removal ".into()),
            lease: Some(false),
            ..Default::default()
        }
        .normalized();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "accountName": "Acme",
                "priority": "HIGH",
                "workType": "REMOVAL",
                "lease": false,
            })
        );
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = ApiClient::with_client("http://localhost:3001/", Client::new());
        assert_eq!(client.url("/tickets"), "http://localhost:3001/tickets");
    }
}
