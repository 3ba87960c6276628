//! Canonical per-book filesystem layout (§6): every stage derives its
//! input/output paths from these helpers rather than constructing path
//! strings inline, so the four stages agree on where artifacts live.

use std::path::{Path, PathBuf};

use uuid::Uuid;

pub fn extracted_text_path(text_data_path: &Path, book_id: Uuid) -> PathBuf {
    text_data_path.join(book_id.to_string()).join("extracted.txt")
}

pub fn segments_dir(text_data_path: &Path, book_id: Uuid) -> PathBuf {
    text_data_path.join(book_id.to_string()).join("segments")
}

pub fn wav_dir(wav_data_path: &Path, book_id: Uuid) -> PathBuf {
    wav_data_path.join(book_id.to_string())
}

pub fn wav_segment_path(wav_data_path: &Path, book_id: Uuid, seq: u32) -> PathBuf {
    wav_dir(wav_data_path, book_id).join(format!("{seq:06}.wav"))
}

pub fn ogg_dir(ogg_data_path: &Path, book_id: Uuid) -> PathBuf {
    ogg_data_path.join(book_id.to_string())
}

pub fn ogg_chunk_path(ogg_data_path: &Path, book_id: Uuid, global_seq: u32) -> PathBuf {
    ogg_dir(ogg_data_path, book_id).join(format!("{global_seq}.ogg"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_namespaced_per_book() {
        let base = Path::new("/data");
        let book = Uuid::new_v4();
        assert!(extracted_text_path(base, book).starts_with(base));
        assert!(wav_segment_path(base, book, 3).ends_with("000003.wav"));
        assert!(ogg_chunk_path(base, book, 7).ends_with("7.ogg"));
    }
}
