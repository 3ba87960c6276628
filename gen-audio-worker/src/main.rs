//! Worker entrypoint: one `clap` subcommand per pipeline stage, each
//! running its own `run_stage_loop` against a dedicated queue pair. This
//! generalizes the teacher's single-purpose `gen-audiobook` binary (one
//! job kind, one executor) into four stage-specific long-running
//! processes sharing one binary and one broker connection pool, so an
//! operator scales each stage independently (§5).

mod chunker;
mod extractor;
mod markup;
mod paths;
mod segmenter;
mod sentence;
mod stage;
mod synthesizer;
mod text_clean;
mod transcoder;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gen_audio_core::broker::{Broker, RedisBroker};
use gen_audio_core::config::Config;
use gen_audio_core::envelope::{
    Completion, ExtractDetail, ExtractTask, SegmentDetail, SegmentTask, SynthDetail, SynthTask,
    TranscodeDetail, TranscodeTask, TranscodedChunk as EnvelopeTranscodedChunk,
};
use stage::{completion_json, run_stage_loop};
use synthesizer::{CommandLineTtsBackend, TtsBackend};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Extract {
        #[arg(long, default_value_t = num_cpus::get())]
        concurrency: usize,
    },
    Segment {
        #[arg(long, default_value_t = num_cpus::get())]
        concurrency: usize,
    },
    Synth {
        #[arg(long, default_value_t = num_cpus::get())]
        concurrency: usize,
    },
    Transcode {
        #[arg(long, default_value_t = num_cpus::get())]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Config::init_tracing();
    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);
    let broker: Arc<dyn Broker> = Arc::new(RedisBroker::connect(&config.redis_url).await?);

    match cli.command {
        Command::Extract { concurrency } => {
            tracing::info!(concurrency, "starting extract stage");
            run_stage_loop(broker, "extract_queue", "extract_completed", concurrency, {
                let config = config.clone();
                move |task: ExtractTask| {
                    let config = config.clone();
                    async move { run_extract(&config, task).await }
                }
            })
            .await
        }
        Command::Segment { concurrency } => {
            tracing::info!(concurrency, "starting segment stage");
            run_stage_loop(broker, "segment_queue", "segment_completed", concurrency, {
                let config = config.clone();
                move |task: SegmentTask| {
                    let config = config.clone();
                    async move { run_segment(&config, task).await }
                }
            })
            .await
        }
        Command::Synth { concurrency } => {
            tracing::info!(concurrency, "starting synth stage");
            let backend: Arc<dyn TtsBackend> = Arc::new(CommandLineTtsBackend::new());
            run_stage_loop(broker, "synth_queue", "synth_completed", concurrency, {
                let config = config.clone();
                move |task: SynthTask| {
                    let config = config.clone();
                    let backend = backend.clone();
                    async move { run_synth(&config, backend, task).await }
                }
            })
            .await
        }
        Command::Transcode { concurrency } => {
            tracing::info!(concurrency, "starting transcode stage");
            run_stage_loop(broker, "transcode_queue", "transcode_completed", concurrency, {
                let config = config.clone();
                move |task: TranscodeTask| {
                    let config = config.clone();
                    async move { run_transcode(&config, task).await }
                }
            })
            .await
        }
    }
}

async fn run_extract(config: &Config, task: ExtractTask) -> anyhow::Result<serde_json::Value> {
    let source_path = PathBuf::from(&task.source_path);
    let outcome = extractor::extract(&source_path, &task.source_format).await;

    let completion = match outcome {
        Ok(text) => {
            let out_path = paths::extracted_text_path(&config.text_data_path, task.book_id);
            if let Some(parent) = out_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&out_path, text).await?;
            Completion::success(
                task.book_id,
                ExtractDetail { extracted_text_path: Some(out_path.to_string_lossy().into_owned()) },
            )
        }
        Err(e) => Completion::failure(task.book_id, e.to_string(), ExtractDetail::default()),
    };
    completion_json(&completion)
}

async fn run_segment(config: &Config, task: SegmentTask) -> anyhow::Result<serde_json::Value> {
    let text_path = PathBuf::from(&task.extracted_text_path);
    let segments_dir = paths::segments_dir(&config.text_data_path, task.book_id);

    let outcome = segmenter::segment_book(&text_path, &segments_dir, config.chunk_size_chars).await;

    let completion = match outcome {
        Ok(result) => Completion::success(task.book_id, SegmentDetail { segment_count: Some(result.segment_count) }),
        Err(e) => Completion::failure(task.book_id, e.to_string(), SegmentDetail::default()),
    };
    completion_json(&completion)
}

async fn run_synth(
    config: &Config,
    backend: Arc<dyn TtsBackend>,
    task: SynthTask,
) -> anyhow::Result<serde_json::Value> {
    let markup_path = PathBuf::from(&task.markup_path);
    let outcome = synthesize_one(&config.wav_data_path, backend, task.book_id, task.segment_seq, &markup_path).await;

    let completion = match outcome {
        Ok(wav_path) => Completion::success(
            task.book_id,
            SynthDetail { segment_seq: Some(task.segment_seq), wav_path: Some(wav_path) },
        ),
        Err(e) => Completion::failure(task.book_id, e.to_string(), SynthDetail { segment_seq: Some(task.segment_seq), wav_path: None }),
    };
    completion_json(&completion)
}

async fn synthesize_one(
    wav_data_path: &std::path::Path,
    backend: Arc<dyn TtsBackend>,
    book_id: uuid::Uuid,
    seq: u32,
    markup_path: &std::path::Path,
) -> anyhow::Result<String> {
    let markup = tokio::fs::read_to_string(markup_path).await?;
    let out_path = paths::wav_segment_path(wav_data_path, book_id, seq);
    backend.synthesize(&markup, &out_path).await?;
    Ok(out_path.to_string_lossy().into_owned())
}

async fn run_transcode(config: &Config, task: TranscodeTask) -> anyhow::Result<serde_json::Value> {
    let wav_dir = PathBuf::from(&task.wav_dir);
    let ogg_dir = paths::ogg_dir(&config.ogg_data_path, task.book_id);

    let outcome = transcoder::transcode_book(
        &wav_dir,
        &ogg_dir,
        config.transcode_segment_seconds,
        config.opus_bitrate_kbps,
    )
    .await;

    let completion = match outcome {
        Ok(chunks) => Completion::success(
            task.book_id,
            TranscodeDetail {
                chunks: chunks
                    .into_iter()
                    .map(|c| EnvelopeTranscodedChunk {
                        global_seq: c.global_seq,
                        duration_ms: c.duration_ms,
                        byte_size: c.byte_size,
                        storage_path: c.storage_path.to_string_lossy().into_owned(),
                    })
                    .collect(),
            },
        ),
        Err(e) => Completion::failure(task.book_id, e.to_string(), TranscodeDetail::default()),
    };
    completion_json(&completion)
}
