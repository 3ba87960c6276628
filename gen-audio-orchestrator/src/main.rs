//! Orchestrator entrypoint: four independent blocking-pop loops, one per
//! completion queue, each applying the book state transition for its
//! stage and — on success — enqueuing the next stage's task. This
//! generalizes the teacher's `JobScheduler::run_to_completion` (pending/
//! in-flight bookkeeping around one queue) into one loop per queue with
//! no shared mutable job list, since unlike the teacher's scheduler there
//! is no retry bookkeeping to coordinate (§4.2: "Retries are not
//! automatic; failure is terminal").

mod progress;

use std::sync::Arc;
use std::time::Duration;

use gen_audio_core::broker::{Broker, RedisBroker};
use gen_audio_core::config::Config;
use gen_audio_core::envelope::{
    ENVELOPE_VERSION, ExtractCompletion, SegmentCompletion, SegmentTask, SynthCompletion,
    SynthTask, TranscodeCompletion, TranscodeTask,
};
use gen_audio_core::models::{AudioChunk, BookState};
use gen_audio_core::store::{MetadataStore, PgMetadataStore};
use progress::ProgressTracker;

const POP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Config::init_tracing();
    let config = Config::from_env()?;

    let store: Arc<dyn MetadataStore> = Arc::new(PgMetadataStore::connect(&config.database_url).await?);
    let broker: Arc<dyn Broker> = Arc::new(RedisBroker::connect(&config.redis_url).await?);
    let tracker = Arc::new(ProgressTracker::new());

    tracing::info!("orchestrator starting four completion-queue loops");

    let config = Arc::new(config);
    let extract = tokio::spawn(extract_loop(broker.clone(), store.clone()));
    let segment = tokio::spawn(segment_loop(broker.clone(), store.clone(), tracker.clone()));
    let synth = tokio::spawn(synth_loop(broker.clone(), store.clone(), tracker.clone(), config.clone()));
    let transcode = tokio::spawn(transcode_loop(broker.clone(), store.clone(), tracker));

    let _ = tokio::try_join!(extract, segment, synth, transcode)?;
    Ok(())
}

async fn extract_loop(broker: Arc<dyn Broker>, store: Arc<dyn MetadataStore>) -> anyhow::Result<()> {
    loop {
        let Some(payload) = broker.pop_right_blocking("extract_completed", POP_TIMEOUT).await? else {
            continue;
        };
        let completion: ExtractCompletion = match serde_json::from_str(&payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "malformed extract_completed payload");
                continue;
            }
        };
        if !completion.success {
            fail_book(&store, completion.book_id, completion.error.as_deref().unwrap_or("extraction failed")).await;
            continue;
        }
        let Some(text_path) = completion.detail.extracted_text_path else {
            fail_book(&store, completion.book_id, "extraction reported success with no output path").await;
            continue;
        };
        if let Err(e) = store
            .transition_book(completion.book_id, BookState::Segmenting, Some(BookState::Segmenting.base_percent()), None)
            .await
        {
            tracing::error!(error = %e, "failed to transition book to segmenting");
            continue;
        }
        let task = SegmentTask { version: ENVELOPE_VERSION, book_id: completion.book_id, extracted_text_path: text_path };
        enqueue(&broker, "segment_queue", &task).await;
    }
}

async fn segment_loop(
    broker: Arc<dyn Broker>,
    store: Arc<dyn MetadataStore>,
    tracker: Arc<ProgressTracker>,
) -> anyhow::Result<()> {
    loop {
        let Some(payload) = broker.pop_right_blocking("segment_completed", POP_TIMEOUT).await? else {
            continue;
        };
        let completion: SegmentCompletion = match serde_json::from_str(&payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "malformed segment_completed payload");
                continue;
            }
        };
        if !completion.success {
            fail_book(&store, completion.book_id, completion.error.as_deref().unwrap_or("segmentation failed")).await;
            continue;
        }
        let Some(segment_count) = completion.detail.segment_count else {
            fail_book(&store, completion.book_id, "segmentation reported success with no segment count").await;
            continue;
        };
        if let Err(e) = store
            .transition_book(completion.book_id, BookState::GeneratingAudio, Some(BookState::GeneratingAudio.base_percent()), None)
            .await
        {
            tracing::error!(error = %e, "failed to transition book to generating_audio");
            continue;
        }
        tracker.set_total_segments(completion.book_id, segment_count);
        for seq in 0..segment_count {
            let task = SynthTask {
                version: ENVELOPE_VERSION,
                book_id: completion.book_id,
                segment_seq: seq,
                markup_path: format!("segments/{}/{:06}.xml", completion.book_id, seq),
            };
            enqueue(&broker, "synth_queue", &task).await;
        }
    }
}

async fn synth_loop(
    broker: Arc<dyn Broker>,
    store: Arc<dyn MetadataStore>,
    tracker: Arc<ProgressTracker>,
    config: Arc<Config>,
) -> anyhow::Result<()> {
    loop {
        let Some(payload) = broker.pop_right_blocking("synth_completed", POP_TIMEOUT).await? else {
            continue;
        };
        let completion: SynthCompletion = match serde_json::from_str(&payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "malformed synth_completed payload");
                continue;
            }
        };
        if !completion.success {
            fail_book(&store, completion.book_id, completion.error.as_deref().unwrap_or("synthesis failed")).await;
            tracker.clear(completion.book_id);
            continue;
        }
        let ready_to_transcode = tracker.record_segment_completion(completion.book_id);
        if !ready_to_transcode {
            continue;
        }
        tracker.clear(completion.book_id);
        if let Err(e) = store
            .transition_book(completion.book_id, BookState::Transcoding, Some(BookState::Transcoding.base_percent()), None)
            .await
        {
            tracing::error!(error = %e, "failed to transition book to transcoding");
            continue;
        }
        let wav_dir = config.wav_data_path.join(completion.book_id.to_string());
        let task = TranscodeTask {
            version: ENVELOPE_VERSION,
            book_id: completion.book_id,
            wav_dir: wav_dir.to_string_lossy().into_owned(),
        };
        enqueue(&broker, "transcode_queue", &task).await;
    }
}

async fn transcode_loop(broker: Arc<dyn Broker>, store: Arc<dyn MetadataStore>, tracker: Arc<ProgressTracker>) -> anyhow::Result<()> {
    loop {
        let Some(payload) = broker.pop_right_blocking("transcode_completed", POP_TIMEOUT).await? else {
            continue;
        };
        let completion: TranscodeCompletion = match serde_json::from_str(&payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "malformed transcode_completed payload");
                continue;
            }
        };
        if !completion.success {
            fail_book(&store, completion.book_id, completion.error.as_deref().unwrap_or("transcoding failed")).await;
            continue;
        }
        // §9: the transcoder posts the full chunk list; replace_chunks is
        // idempotent on duplicate delivery (at-least-once semantics).
        let chunks: Vec<AudioChunk> = completion
            .detail
            .chunks
            .iter()
            .map(|c| AudioChunk {
                book_id: completion.book_id,
                seq: c.global_seq as i32,
                duration_ms: c.duration_ms as i64,
                byte_size: c.byte_size as i64,
                storage_path: c.storage_path.clone(),
                created_at: completion.completed_at,
            })
            .collect();
        if let Err(e) = store.replace_chunks(completion.book_id, &chunks).await {
            tracing::error!(error = %e, "failed to persist chunk registry");
            continue;
        }
        if let Err(e) = store
            .transition_book(completion.book_id, BookState::Completed, Some(BookState::Completed.base_percent()), None)
            .await
        {
            tracing::error!(error = %e, "failed to transition book to completed");
        }
        tracker.clear(completion.book_id);
    }
}

async fn fail_book(store: &Arc<dyn MetadataStore>, book_id: uuid::Uuid, error: &str) {
    tracing::warn!(book_id = %book_id, error, "book pipeline failed");
    if let Err(e) = store.transition_book(book_id, BookState::Failed, None, Some(error)).await {
        tracing::error!(error = %e, "failed to mark book as failed");
    }
}

async fn enqueue<T: serde::Serialize>(broker: &Arc<dyn Broker>, queue: &str, task: &T) {
    match serde_json::to_string(task) {
        Ok(payload) => {
            if let Err(e) = broker.push_left(queue, &payload).await {
                tracing::error!(error = %e, queue, "failed to enqueue task");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to serialize task"),
    }
}
