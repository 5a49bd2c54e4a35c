//! Image uploads written to a local directory.
//!
//! A batch is validated in full before the first byte hits the disk, so a
//! rejected batch leaves nothing behind. Once writing starts each file is
//! independent: a failure part-way keeps the files already written, which no
//! ticket references.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{AppError, AppResult};

pub const MAX_FILES: usize = 10;
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const MAX_BASE_LEN: usize = 50;

/// Accepted MIME types and the extension each is stored under.
pub const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpeg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
];

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9_-]+").expect("static pattern")
});

/// One file part received from the client.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
}

/// Canonical MIME type and extension for an allowed type. Parameters such as
/// `; charset=binary` are ignored, as is the client's own file extension.
pub fn allowed_type(mime_type: &str) -> Option<(&'static str, &'static str)> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_TYPES
        .iter()
        .copied()
        .find(|(allowed, _)| allowed.eq_ignore_ascii_case(essence))
}

/// Base name without directories or extension, reduced to
/// `[A-Za-z0-9_-]`, at most 50 characters, `file` when nothing is left.
pub fn sanitize_base_name(original: &str) -> String {
    let name = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    };
    let cleaned: String = UNSAFE_CHARS
        .replace_all(stem, "_")
        .chars()
        .take(MAX_BASE_LEN)
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Checks one part as it arrives. Enforces the per-file size and the MIME
/// allow-list.
pub fn check_file(file: &IncomingFile) -> AppResult<(&'static str, &'static str)> {
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::PayloadTooLarge("File too large"));
    }
    allowed_type(&file.mime_type).ok_or(AppError::UnsupportedFileType)
}

#[derive(Debug, Clone)]
pub struct UploadService {
    dir: PathBuf,
}

impl UploadService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Validates the whole batch, then writes each file. `public_base` is the
    /// URL prefix files are served under, e.g. `http://host/uploads`.
    pub async fn store_batch(
        &self,
        files: Vec<IncomingFile>,
        public_base: &str,
    ) -> AppResult<Vec<StoredFile>> {
        if files.len() > MAX_FILES {
            return Err(AppError::PayloadTooLarge("Too many files"));
        }
        let types = files
            .iter()
            .map(check_file)
            .collect::<AppResult<Vec<_>>>()?;

        self.ensure_dir().await?;

        let mut stored = Vec::with_capacity(files.len());
        for (file, (mime_type, ext)) in files.into_iter().zip(types) {
            let base = sanitize_base_name(&file.original_name);
            let filename = self.write_new(&base, ext, &file.bytes).await?;
            info!(%filename, size = file.bytes.len(), mime = mime_type, "stored upload");
            stored.push(StoredFile {
                url: format!("{}/{}", public_base.trim_end_matches('/'), filename),
                filename,
                size: file.bytes.len() as u64,
                mime_type: mime_type.to_string(),
            });
        }
        Ok(stored)
    }

    /// Creates `<base>_<millis>.<ext>` exclusively, bumping the stamp while
    /// the name is taken.
    async fn write_new(&self, base: &str, ext: &str, bytes: &[u8]) -> AppResult<String> {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let filename = format!("{base}_{stamp}.{ext}");
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&filename))
                .await;
            match opened {
                Ok(mut out) => {
                    out.write_all(bytes).await?;
                    out.flush().await?;
                    return Ok(filename);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
