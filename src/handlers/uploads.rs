use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::uploads::{check_file, IncomingFile, StoredFile, MAX_FILES, MAX_FILE_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub uploaded: Vec<StoredFile>,
}

pub async fn upload_files(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let multipart =
        multipart.map_err(|rejection| AppError::invalid("body", rejection.body_text()))?;
    let files = read_files(multipart).await?;

    let base = format!("{}/uploads", public_origin(&headers, state.config.trust_proxy, state.config.port));
    let uploaded = state.uploads.store_batch(files, &base).await?;

    info!(user_id = user.id, count = uploaded.len(), "upload batch stored");
    Ok(Json(UploadResponse { uploaded }))
}

/// Buffers every `files` part, rejecting the batch on the first bad one.
async fn read_files(mut multipart: Multipart) -> AppResult<Vec<IncomingFile>> {
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if !matches!(field.name(), Some("files" | "files[]")) {
            continue;
        }
        if files.len() == MAX_FILES {
            return Err(AppError::PayloadTooLarge("Too many files"));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > MAX_FILE_SIZE {
                return Err(AppError::PayloadTooLarge("File too large"));
            }
            bytes.extend_from_slice(&chunk);
        }

        let file = IncomingFile {
            original_name,
            mime_type,
            bytes,
        };
        check_file(&file)?;
        files.push(file);
    }

    Ok(files)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large")
    } else {
        AppError::invalid("body", "Malformed multipart body")
    }
}

/// `<scheme>://<host>` as seen by the client.
pub fn public_origin(headers: &HeaderMap, trust_proxy: bool, port: u16) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let forwarded_proto = trust_proxy.then(|| header_value("x-forwarded-proto")).flatten();
    let forwarded_host = trust_proxy.then(|| header_value("x-forwarded-host")).flatten();

    let scheme = forwarded_proto.unwrap_or("http");
    let host = forwarded_host
        .or_else(|| header_value(header::HOST.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{port}"));

    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn origin_from_host_header() {
        let h = headers(&[("host", "desk.local:3001")]);
        assert_eq!(public_origin(&h, false, 3001), "http://desk.local:3001");
        assert_eq!(public_origin(&HeaderMap::new(), false, 8080), "http://localhost:8080");
    }

    #[test]
    fn forwarded_headers_need_trust() {
        let h = headers(&[
            ("host", "10.0.0.5:3001"),
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "desk.example.com"),
        ]);
        assert_eq!(public_origin(&h, true, 3001), "https://desk.example.com");
        assert_eq!(public_origin(&h, false, 3001), "http://10.0.0.5:3001");
    }
}
