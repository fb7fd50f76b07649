/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Attachment blob store backed by the local filesystem, plus the multipart
//! upload endpoint. Uploads are streamed to disk and capped at 10 MiB; only
//! an allow-list of MIME prefixes is accepted.

use crate::api::ApiError;
use crate::constants::{ALLOWED_MIME_PREFIXES, MAX_UPLOAD_BYTES};
use crate::models::AppState;
use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures::TryStreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex =
        Regex::new(r"[^A-Za-z0-9._-]+").expect("invalid filename regex");
}

#[derive(Debug)]
pub enum UploadError {
    MissingFile,
    TooLarge,
    DisallowedType(String),
    Multipart(actix_multipart::MultipartError),
    Io(std::io::Error),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::MissingFile => write!(f, "No file field in upload"),
            UploadError::TooLarge => write!(f, "File exceeds the 10 MiB limit"),
            UploadError::DisallowedType(t) => write!(f, "File type not allowed: {t}"),
            UploadError::Multipart(e) => write!(f, "Malformed multipart body: {e}"),
            UploadError::Io(e) => write!(f, "Storage error: {e}"),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<actix_multipart::MultipartError> for UploadError {
    fn from(e: actix_multipart::MultipartError) -> Self {
        UploadError::Multipart(e)
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Io(e)
    }
}

impl UploadError {
    fn to_response(&self) -> HttpResponse {
        match self {
            UploadError::MissingFile => {
                HttpResponse::BadRequest().json(ApiError::bad_request("No file field in upload"))
            }
            UploadError::TooLarge => HttpResponse::PayloadTooLarge()
                .json(ApiError::bad_request("File exceeds the 10 MiB limit")),
            UploadError::DisallowedType(t) => HttpResponse::BadRequest()
                .json(ApiError::bad_request(&format!("File type not allowed: {t}"))),
            UploadError::Multipart(_) => {
                HttpResponse::BadRequest().json(ApiError::bad_request("Malformed multipart body"))
            }
            UploadError::Io(_) => HttpResponse::InternalServerError()
                .json(ApiError::bad_request("Storage error")),
        }
    }
}

/// Descriptor returned to the client; it is the `file` payload clients attach
/// to `send_file_message`.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Open (and create if needed) the upload directory.
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(UploadStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn allowed(content_type: &str) -> bool {
        ALLOWED_MIME_PREFIXES
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
    }

    fn sanitize(name: &str) -> String {
        UNSAFE_FILENAME_CHARS.replace_all(name, "_").to_string()
    }

    /// Stream one multipart field to disk, enforcing the size cap as bytes
    /// arrive. A half-written oversized file is removed.
    async fn save_field(
        &self,
        field: &mut actix_multipart::Field,
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredFile, UploadError> {
        let stored_name = format!("{}_{}", Uuid::new_v4(), Self::sanitize(original_name));
        let path = self.dir.join(&stored_name);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut size: usize = 0;
        while let Some(chunk) = field.try_next().await? {
            size += chunk.len();
            if size > MAX_UPLOAD_BYTES {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(UploadError::TooLarge);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        info!(file = %stored_name, size, "stored upload");
        Ok(StoredFile {
            url: format!("/uploads/{stored_name}"),
            filename: stored_name,
            original_name: original_name.to_string(),
            size: size as u64,
            content_type: content_type.to_string(),
        })
    }
}

#[post("/upload")]
pub async fn upload(payload: Multipart, state: web::Data<AppState>) -> HttpResponse {
    match save_upload(payload, &state.uploads).await {
        Ok(stored) => HttpResponse::Ok().json(stored),
        Err(e) => {
            warn!(error = %e, "upload rejected");
            e.to_response()
        }
    }
}

async fn save_upload(mut payload: Multipart, store: &UploadStore) -> Result<StoredFile, UploadError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "file" {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !UploadStore::allowed(&content_type) {
            return Err(UploadError::DisallowedType(content_type));
        }
        let original_name = field
            .content_disposition()
            .get_filename()
            .unwrap_or("upload.bin")
            .to_string();
        return store.save_field(&mut field, &original_name, &content_type).await;
    }
    Err(UploadError::MissingFile)
}
