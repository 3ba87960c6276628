//! Domain types: §3 DATA MODEL. These mirror the teacher's
//! `session::types::Session`/`ChunkStatus` structs in shape (plain serde
//! structs with small `new`/`mark_*` helpers) but are backed by the
//! metadata store rather than a JSON file on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookState {
    Pending,
    Extracting,
    Segmenting,
    GeneratingAudio,
    Transcoding,
    Completed,
    Failed,
}

impl BookState {
    /// Percent-complete is monotonic across the state machine (§4.7):
    /// a later state never reports a lower percentage than an earlier one.
    pub fn base_percent(self) -> u8 {
        match self {
            BookState::Pending => 0,
            BookState::Extracting => 5,
            BookState::Segmenting => 25,
            BookState::GeneratingAudio => 50,
            BookState::Transcoding => 75,
            BookState::Completed => 100,
            BookState::Failed => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub source_format: String,
    pub state: BookState,
    /// `smallint` in Postgres; Rust has no single-byte integer sqlx can
    /// decode from it, so this stays `i16` even though the domain range is
    /// 0-100.
    pub percent_complete: i16,
    pub error_message: Option<String>,
    pub total_chunks: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AudioChunk {
    pub book_id: Uuid,
    pub seq: i32,
    pub duration_ms: i64,
    pub byte_size: i64,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Session,
    PasswordReset,
}

/// Claims carried by every signed bearer token (§3): `sub`/`username`
/// identify the subject, `jti` lets the token be referenced without
/// re-deriving it, `type` distinguishes session tokens from password-reset
/// tokens so one cannot be replayed as the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_state_percent_is_monotonic_along_happy_path() {
        let order = [
            BookState::Pending,
            BookState::Extracting,
            BookState::Segmenting,
            BookState::GeneratingAudio,
            BookState::Transcoding,
            BookState::Completed,
        ];
        let mut last = 0u8;
        for state in order {
            let p = state.base_percent();
            assert!(p >= last, "{state:?} percent {p} regressed below {last}");
            last = p;
        }
    }
}
