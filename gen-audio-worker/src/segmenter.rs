//! Segmentation (§4.4): clean → split into sentences → pack to the
//! character budget → wrap each packed segment in prosody markup → write
//! one markup file per segment in document order (zero-based `seq`).

use std::path::{Path, PathBuf};

use gen_audio_core::error::StageError;

use crate::chunker::pack_sentences;
use crate::markup::wrap_segment;
use crate::sentence::split_into_sentences;
use crate::text_clean::clean_text;

pub struct SegmentOutcome {
    pub segment_count: u32,
}

pub async fn segment_book(
    extracted_text_path: &Path,
    segments_dir: &Path,
    budget: usize,
) -> Result<SegmentOutcome, StageError> {
    let raw = tokio::fs::read_to_string(extracted_text_path)
        .await
        .map_err(|e| StageError::MissingInput(format!("{}: {e}", extracted_text_path.display())))?;

    let cleaned = clean_text(&raw);
    let sentences = split_into_sentences(&cleaned);
    let packed = pack_sentences(sentences, budget);

    tokio::fs::create_dir_all(segments_dir)
        .await
        .map_err(|e| StageError::Store(anyhow::anyhow!("failed to create segments dir: {e}")))?;

    for (seq, sentences) in packed.iter().enumerate() {
        let markup = wrap_segment(sentences);
        let path = segment_markup_path(segments_dir, seq as u32);
        tokio::fs::write(&path, markup)
            .await
            .map_err(|e| StageError::Store(anyhow::anyhow!("failed to write segment {seq}: {e}")))?;
    }

    Ok(SegmentOutcome { segment_count: packed.len() as u32 })
}

pub fn segment_markup_path(segments_dir: &Path, seq: u32) -> PathBuf {
    segments_dir.join(format!("{seq:06}.xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn segments_a_small_book_into_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("extracted.txt");
        tokio::fs::write(&text_path, "Hello world. This is a short book.").await.unwrap();
        let segments_dir = dir.path().join("segments");

        let outcome = segment_book(&text_path, &segments_dir, 800).await.unwrap();
        assert_eq!(outcome.segment_count, 1);

        let content = tokio::fs::read_to_string(segment_markup_path(&segments_dir, 0)).await.unwrap();
        assert!(content.starts_with("<speak>"));
        assert!(content.contains("Hello world."));
    }

    #[tokio::test]
    async fn missing_input_is_a_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let result = segment_book(&missing, &dir.path().join("segments"), 800).await;
        assert!(matches!(result, Err(StageError::MissingInput(_))));
    }
}
