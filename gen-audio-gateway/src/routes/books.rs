//! Book submission, listing, status, and deletion (§4.1). The multipart
//! upload handler streams to disk and enforces the size cap incrementally
//! rather than buffering the whole file, per the REDESIGN FLAGS note on
//! bounding peak memory during upload — grounded on `los-libros`'s
//! chunked-upload handshake/accept flow, simplified to a single-shot
//! multipart field since resumable upload is an explicit non-goal.

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
};
use gen_audio_core::ApiError;
use gen_audio_core::envelope::{ENVELOPE_VERSION, ExtractTask};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::state::{AppState, CurrentUser};

const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "epub", "txt"];

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub state: gen_audio_core::models::BookState,
    pub percent_complete: i16,
    pub error_message: Option<String>,
    pub total_chunks: Option<i32>,
}

impl From<gen_audio_core::models::Book> for BookResponse {
    fn from(b: gen_audio_core::models::Book) -> Self {
        Self {
            id: b.id,
            title: b.title,
            state: b.state,
            percent_complete: b.percent_complete,
            error_message: b.error_message,
            total_chunks: b.total_chunks,
        }
    }
}

pub async fn list_books(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = state
        .store
        .list_books_for_owner(current.id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

pub async fn submit_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<BookResponse>, ApiError> {
    let mut title: Option<String> = None;
    let mut format: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut dest: Option<tokio::fs::File> = None;
    let mut written: u64 = 0;
    let mut dest_path: Option<std::path::PathBuf> = None;
    let book_id = Uuid::new_v4();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| ApiError::Validation(e.to_string()))? {
        match field.name() {
            Some("title") => {
                title = Some(field.text().await.map_err(|e| ApiError::Validation(e.to_string()))?);
            }
            Some("format") => {
                format = Some(field.text().await.map_err(|e| ApiError::Validation(e.to_string()))?.to_lowercase());
            }
            Some("file") => {
                let name = field.file_name().ok_or_else(|| ApiError::Validation("missing filename".into()))?.to_string();
                let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
                if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(ApiError::UnsupportedMediaType);
                }

                let dir = state.config.text_data_path.join("uploads").join(book_id.to_string());
                tokio::fs::create_dir_all(&dir).await.map_err(|e| ApiError::Internal(e.into()))?;
                let path = dir.join(&name);
                let file = tokio::fs::File::create(&path).await.map_err(|e| ApiError::Internal(e.into()))?;
                dest = Some(file);
                dest_path = Some(path);
                filename = Some(name);

                while let Some(chunk) = field.chunk().await.map_err(|e| ApiError::Validation(e.to_string()))? {
                    written += chunk.len() as u64;
                    if written > MAX_UPLOAD_BYTES {
                        if let Some(path) = &dest_path {
                            let _ = tokio::fs::remove_file(path).await;
                        }
                        return Err(ApiError::PayloadTooLarge);
                    }
                    let f = dest.as_mut().expect("file opened above");
                    f.write_all(&chunk).await.map_err(|e| ApiError::Internal(e.into()))?;
                }
            }
            _ => continue,
        }
    }

    let title = title.ok_or_else(|| ApiError::Validation("missing title field".into()))?;
    let title = title.trim().to_string();
    if title.is_empty() || title.chars().count() > 255 {
        return Err(ApiError::Validation("title must be non-empty and at most 255 characters".into()));
    }

    let format = format.ok_or_else(|| ApiError::Validation("missing format field".into()))?;
    if !ALLOWED_EXTENSIONS.contains(&format.as_str()) {
        return Err(ApiError::Validation(format!("unsupported format {format}")));
    }

    let filename = filename.ok_or_else(|| ApiError::Validation("no file field in request".into()))?;
    let dest_path = dest_path.expect("set alongside filename");
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    if extension != format {
        let _ = tokio::fs::remove_file(&dest_path).await;
        return Err(ApiError::Validation(format!(
            "File extension .{extension} doesn't match format {format}"
        )));
    }

    let book = state
        .store
        .create_book(book_id, current.id, &title, &filename, &format)
        .await
        .map_err(ApiError::Internal)?;

    let task = ExtractTask {
        version: ENVELOPE_VERSION,
        book_id: book.id,
        source_path: dest_path.to_string_lossy().to_string(),
        source_format: format.clone(),
    };
    let payload = serde_json::to_string(&task).map_err(|e| ApiError::Internal(e.into()))?;
    state
        .broker
        .push_left("extract_queue", &payload)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(book.into()))
}

pub async fn book_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state.store.find_book(book_id).await.map_err(ApiError::Internal)?.ok_or(ApiError::NotFound)?;
    if book.owner_id != current.id {
        return Err(ApiError::NotFound);
    }
    Ok(Json(book.into()))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let book = state.store.find_book(book_id).await.map_err(ApiError::Internal)?.ok_or(ApiError::NotFound)?;
    if book.owner_id != current.id {
        return Err(ApiError::NotFound);
    }
    state.store.delete_chunks(book_id).await.map_err(ApiError::Internal)?;
    state.store.delete_book(book_id).await.map_err(ApiError::Internal)?;
    Ok(Json(serde_json::json!({ "detail": "deleted" })))
}
