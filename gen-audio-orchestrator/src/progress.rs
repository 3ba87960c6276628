//! In-memory segment-completion bookkeeping, generalizing the teacher's
//! `JobScheduler` fields (`pending`, `in_flight`, `completed`) from a
//! single process's job list to per-book segment counts tracked across the
//! synthesis fan-out. A book's segment count is learned once from the
//! segmenter's completion and compared against synth completions as they
//! trickle in.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

#[derive(Default)]
struct BookProgress {
    total_segments: u32,
    completed_segments: u32,
}

/// Tracks how many of a book's synth tasks have completed so the
/// orchestrator knows when to advance to transcoding. This state is
/// process-local: if the orchestrator restarts mid-synthesis, outstanding
/// `synth_completed` messages still drain from the broker and re-populate
/// the count, since the queue is durable.
pub struct ProgressTracker {
    books: Mutex<HashMap<Uuid, BookProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self { books: Mutex::new(HashMap::new()) }
    }

    pub fn set_total_segments(&self, book_id: Uuid, total: u32) {
        let mut books = self.books.lock().expect("progress mutex poisoned");
        books.entry(book_id).or_default().total_segments = total;
    }

    /// Records one more completed segment and returns `true` if this was
    /// the last one needed (i.e. the book is ready to transcode).
    pub fn record_segment_completion(&self, book_id: Uuid) -> bool {
        let mut books = self.books.lock().expect("progress mutex poisoned");
        let entry = books.entry(book_id).or_default();
        entry.completed_segments += 1;
        entry.total_segments > 0 && entry.completed_segments >= entry.total_segments
    }

    pub fn clear(&self, book_id: Uuid) {
        let mut books = self.books.lock().expect("progress mutex poisoned");
        books.remove(&book_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_ready_only_once_every_segment_lands() {
        let tracker = ProgressTracker::new();
        let book_id = Uuid::new_v4();
        tracker.set_total_segments(book_id, 3);
        assert!(!tracker.record_segment_completion(book_id));
        assert!(!tracker.record_segment_completion(book_id));
        assert!(tracker.record_segment_completion(book_id));
    }

    #[test]
    fn unknown_book_never_reports_ready() {
        let tracker = ProgressTracker::new();
        assert!(!tracker.record_segment_completion(Uuid::new_v4()));
    }
}
