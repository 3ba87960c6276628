//! The pipeline task/completion envelopes (§3, §6), generalizing the
//! teacher's `worker::protocol::{TtsJob, TtsResult}` — a versioned struct
//! with a constructor per outcome — from one TTS job shape to one envelope
//! per stage, each carried verbatim through the broker's named queues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractTask {
    pub version: u32,
    pub book_id: Uuid,
    pub source_path: String,
    pub source_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentTask {
    pub version: u32,
    pub book_id: Uuid,
    pub extracted_text_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthTask {
    pub version: u32,
    pub book_id: Uuid,
    pub segment_seq: u32,
    pub markup_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeTask {
    pub version: u32,
    pub book_id: Uuid,
    /// Directory holding every segment's `{seq:06}.wav`, in document order.
    pub wav_dir: String,
}

/// Shared by every `*_completed` envelope: the orchestrator only ever needs
/// to know whether the task succeeded and, if not, why — matching
/// `TtsResult`'s `status`/`error` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion<T> {
    pub version: u32,
    pub book_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: T,
}

impl<T> Completion<T> {
    pub fn success(book_id: Uuid, detail: T) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            book_id,
            success: true,
            error: None,
            completed_at: Utc::now(),
            detail,
        }
    }

    pub fn failure(book_id: Uuid, error: impl Into<String>, detail: T) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            book_id,
            success: false,
            error: Some(error.into()),
            completed_at: Utc::now(),
            detail,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractDetail {
    pub extracted_text_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentDetail {
    pub segment_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthDetail {
    pub segment_seq: Option<u32>,
    pub wav_path: Option<String>,
}

/// Per §9: the transcoder posts the *full* chunk list on completion (the
/// orchestrator does not assemble it incrementally), and `global_seq` is
/// contiguous across the whole book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscodeDetail {
    pub chunks: Vec<TranscodedChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodedChunk {
    pub global_seq: u32,
    pub duration_ms: u64,
    pub byte_size: u64,
    pub storage_path: String,
}

pub type ExtractCompletion = Completion<ExtractDetail>;
pub type SegmentCompletion = Completion<SegmentDetail>;
pub type SynthCompletion = Completion<SynthDetail>;
pub type TranscodeCompletion = Completion<TranscodeDetail>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_success_carries_no_error() {
        let c = Completion::success(Uuid::nil(), ExtractDetail { extracted_text_path: Some("x".into()) });
        assert!(c.success);
        assert!(c.error.is_none());
    }

    #[test]
    fn completion_failure_carries_message() {
        let c: ExtractCompletion = Completion::failure(Uuid::nil(), "boom", ExtractDetail::default());
        assert!(!c.success);
        assert_eq!(c.error.as_deref(), Some("boom"));
    }

    #[test]
    fn completion_round_trips_through_json() {
        let c = Completion::success(
            Uuid::nil(),
            TranscodeDetail {
                chunks: vec![TranscodedChunk {
                    global_seq: 0,
                    duration_ms: 3140,
                    byte_size: 4096,
                    storage_path: "/data/ogg/book/0.ogg".into(),
                }],
            },
        );
        let json = serde_json::to_string(&c).unwrap();
        let back: TranscodeCompletion = serde_json::from_str(&json).unwrap();
        assert_eq!(back.detail.chunks.len(), 1);
        assert_eq!(back.detail.chunks[0].global_seq, 0);
    }
}
