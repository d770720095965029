//! Multipart parsing and the standalone image upload routes.

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::routing::post;
use axum::Router;

use crate::error::ApiError;
use crate::images::{StoredImage, MAX_BATCH_IMAGES};
use crate::middleware::AdminSession;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_one))
        .route("/images", post(upload_many))
}

/// A file part of a multipart form.
pub(super) struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A fully read multipart form.
#[derive(Default)]
pub(super) struct Form {
    pub text: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl Form {
    pub async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ApiError> {
        let mut multipart = multipart?;
        let mut form = Form::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    form.files.push(FilePart {
                        field: name,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.text.push((name, value));
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Remove and return the file parts named `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<FilePart> {
        let (taken, rest): (Vec<FilePart>, Vec<FilePart>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|part| part.field == name);
        self.files = rest;
        taken
    }
}

/// Store one file part.
pub(super) async fn store(state: &AppState, part: &FilePart) -> Result<StoredImage, ApiError> {
    state
        .images
        .save(&part.file_name, part.content_type.as_deref(), &part.bytes)
        .await
}

async fn upload_one(
    State(state): State<AppState>,
    _session: AdminSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<StoredImage>, ApiError> {
    let mut form = Form::read(multipart).await?;
    let mut files = form.take_files("image");
    if files.len() > 1 {
        return Err(ApiError::bad_request("Only one image may be uploaded here"));
    }
    let part = files
        .pop()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let stored = store(&state, &part).await?;
    Ok(ApiResponse::ok(stored).with_message("Image uploaded successfully"))
}

async fn upload_many(
    State(state): State<AppState>,
    _session: AdminSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Vec<StoredImage>>, ApiError> {
    let mut form = Form::read(multipart).await?;
    let files = form.take_files("images");
    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }
    if files.len() > MAX_BATCH_IMAGES {
        return Err(ApiError::bad_request(format!(
            "Too many files, at most {MAX_BATCH_IMAGES} per upload"
        )));
    }

    let mut stored = Vec::with_capacity(files.len());
    for part in &files {
        match store(&state, part).await {
            Ok(image) => stored.push(image),
            Err(e) => {
                for image in &stored {
                    state.images.delete_by_url(&image.url).await;
                }
                return Err(e);
            }
        }
    }

    let message = format!("{} image(s) uploaded successfully", stored.len());
    Ok(ApiResponse::ok(stored).with_message(message))
}
