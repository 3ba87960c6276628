//! Audio chunk listing and signed streaming delivery (§4.1, §6). The
//! signed-URL construction/verification mirrors
//! `original_source/services/api/main.py`'s `generate_signed_url`/
//! `verify_signed_url` exactly: `signature_data = "{endpoint}:{expires}:{token}"`,
//! HMAC-SHA256, constant-time compare via `gen_audio_core::signing`.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use gen_audio_core::ApiError;
use gen_audio_core::models::TokenType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::{AppState, CurrentUser};

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub seq: i32,
    pub duration_s: f64,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChunkListResponse {
    pub chunks: Vec<ChunkResponse>,
    pub total_duration_s: f64,
}

pub async fn list_chunks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<ChunkListResponse>, ApiError> {
    let book = state.store.find_book(book_id).await.map_err(ApiError::Internal)?.ok_or(ApiError::NotFound)?;
    if book.owner_id != current.id {
        return Err(ApiError::NotFound);
    }
    let chunks = state.store.list_chunks(book_id).await.map_err(ApiError::Internal)?;
    let total_duration_s = chunks.iter().map(|c| c.duration_ms as f64 / 1000.0).sum();
    let chunks = chunks
        .into_iter()
        .map(|c| ChunkResponse {
            seq: c.seq,
            duration_s: c.duration_ms as f64 / 1000.0,
            url: endpoint_path(book_id, c.seq),
            file_size: Some(c.byte_size),
        })
        .collect();
    Ok(Json(ChunkListResponse { chunks, total_duration_s }))
}

#[derive(Debug, Serialize)]
pub struct SignedUrlResponse {
    pub url: String,
    pub expires_in: i64,
}

fn endpoint_path(book_id: Uuid, seq: i32) -> String {
    format!("/api/v1/books/{book_id}/chunks/{seq}")
}

fn build_signed_url(state: &AppState, book_id: Uuid, seq: i32, session_token: &str) -> SignedUrlResponse {
    let expires_in = state.config.signed_url_ttl.as_secs() as i64;
    let expires_at = Utc::now().timestamp() + expires_in;
    let path = endpoint_path(book_id, seq);
    let signature = gen_audio_core::signing::sign(&state.config.secret_key, &path, expires_at, session_token);
    let url = format!(
        "{}{path}?expires={expires_at}&token={session_token}&signature={signature}",
        state.config.api_base_url
    );
    SignedUrlResponse { url, expires_in }
}

pub async fn signed_url(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((book_id, seq)): Path<(Uuid, i32)>,
) -> Result<Json<SignedUrlResponse>, ApiError> {
    let book = state.store.find_book(book_id).await.map_err(ApiError::Internal)?.ok_or(ApiError::NotFound)?;
    if book.owner_id != current.id {
        return Err(ApiError::NotFound);
    }
    let session_token = state
        .tokens
        .issue(current.id, &current.username, TokenType::Session, chrono::Duration::from_std(state.config.signed_url_ttl).unwrap_or(chrono::Duration::hours(1)))
        .map_err(ApiError::Internal)?;
    Ok(Json(build_signed_url(&state, book_id, seq, &session_token)))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub seqs: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub signed_urls: HashMap<String, String>,
    pub expires_in: i64,
}

pub async fn batch_signed_urls(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let book = state.store.find_book(book_id).await.map_err(ApiError::Internal)?.ok_or(ApiError::NotFound)?;
    if book.owner_id != current.id {
        return Err(ApiError::NotFound);
    }
    let session_token = state
        .tokens
        .issue(current.id, &current.username, TokenType::Session, chrono::Duration::from_std(state.config.signed_url_ttl).unwrap_or(chrono::Duration::hours(1)))
        .map_err(ApiError::Internal)?;

    let expires_in = state.config.signed_url_ttl.as_secs() as i64;
    let mut signed_urls = HashMap::new();
    for seq in req.seqs {
        let resp = build_signed_url(&state, book_id, seq, &session_token);
        signed_urls.insert(seq.to_string(), resp.url);
    }
    Ok(Json(BatchResponse { signed_urls, expires_in }))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub expires: Option<i64>,
    pub token: Option<String>,
    pub signature: Option<String>,
}

/// Resolves the three auth methods §4.1 "Get audio chunk" allows: a
/// signed URL (`expires`+`token`+`signature`, with `token` then validated
/// as a session JWT), a bearer `Authorization` header, or a bare `token`
/// query parameter. Whichever is present is used to recover the caller's
/// identity; none present is unauthenticated.
fn authenticate_chunk_request(
    state: &AppState,
    headers: &HeaderMap,
    q: &StreamQuery,
    book_id: Uuid,
    seq: i32,
) -> Result<Uuid, ApiError> {
    if let (Some(expires), Some(token), Some(signature)) = (q.expires, &q.token, &q.signature) {
        let path = endpoint_path(book_id, seq);
        let now = Utc::now().timestamp();
        if !gen_audio_core::signing::verify(&state.config.secret_key, &path, expires, token, signature, now) {
            return Err(ApiError::Unauthenticated);
        }
        let claims = state.tokens.verify(token, TokenType::Session).map_err(|_| ApiError::Unauthenticated)?;
        return Ok(claims.sub);
    }

    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let claims = state.tokens.verify(bearer, TokenType::Session).map_err(|_| ApiError::Unauthenticated)?;
        return Ok(claims.sub);
    }

    if let Some(token) = &q.token {
        let claims = state.tokens.verify(token, TokenType::Session).map_err(|_| ApiError::Unauthenticated)?;
        return Ok(claims.sub);
    }

    Err(ApiError::Unauthenticated)
}

/// Streams a single chunk's bytes. Reachable via a signed URL, a bearer
/// token, or a bare `token` query parameter (§4.1). Ownership mismatches
/// resolve to `NotFound`, never `Unauthenticated`/`Forbidden`, to avoid
/// existence oracles.
pub async fn get_chunk(
    State(state): State<AppState>,
    Path((book_id, seq)): Path<(Uuid, i32)>,
    Query(q): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = authenticate_chunk_request(&state, &headers, &q, book_id, seq)?;

    let book = state.store.find_book(book_id).await.map_err(ApiError::Internal)?.ok_or(ApiError::NotFound)?;
    if book.owner_id != user_id {
        return Err(ApiError::NotFound);
    }

    let chunks = state.store.list_chunks(book_id).await.map_err(ApiError::Internal)?;
    let chunk = chunks.into_iter().find(|c| c.seq == seq).ok_or(ApiError::NotFound)?;

    let metadata = tokio::fs::metadata(&chunk.storage_path).await.map_err(|e| ApiError::Internal(e.into()))?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let etag = gen_audio_core::signing::strong_etag(&chunk.storage_path, mtime, metadata.len());

    if headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) == Some(etag.as_str()) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        response.headers_mut().insert(header::ETAG, etag.parse().expect("etag is valid header value"));
        return Ok(response);
    }

    let file = tokio::fs::File::open(&chunk.storage_path).await.map_err(|e| ApiError::Internal(e.into()))?;
    let stream = tokio_util::io::ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut response = (StatusCode::OK, body).into_response();
    let headers_mut = response.headers_mut();
    headers_mut.insert(header::CONTENT_TYPE, "audio/ogg".parse().expect("valid header value"));
    headers_mut.insert(header::CACHE_CONTROL, "public, max-age=3600".parse().expect("valid header value"));
    headers_mut.insert(header::ETAG, etag.parse().expect("etag is valid header value"));
    Ok(response)
}
