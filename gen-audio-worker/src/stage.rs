//! The task-worker main loop (§5): blocking pop with timeout, execute,
//! push completion, repeat — generalizing the teacher's
//! `worker::executor::execute_job_from_stdin` (read one job, run it,
//! write one result) into a long-lived loop against the broker, with a
//! small `tokio::task` pool so distinct books process concurrently
//! (§5's "distinct books in parallel" rule) while this process still
//! bounds its own resource usage.
//!
//! A task's body is always fully captured into a completion push; a
//! panic or unhandled error inside `handler` never escapes the loop,
//! satisfying the "workers must never terminate on an unhandled error"
//! redesign guidance.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gen_audio_core::broker::Broker;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Semaphore;

const POP_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_stage_loop<Task, Fut, F>(
    broker: Arc<dyn Broker>,
    task_queue: &'static str,
    completed_queue: &'static str,
    concurrency: usize,
    handler: F,
) -> anyhow::Result<()>
where
    Task: DeserializeOwned + Send + 'static,
    Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    F: Fn(Task) -> Fut + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    loop {
        let Some(payload) = broker.pop_right_blocking(task_queue, POP_TIMEOUT).await? else {
            continue;
        };
        let task: Task = match serde_json::from_str(&payload) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, queue = task_queue, "malformed task payload, dropping");
                continue;
            }
        };

        let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");
        let broker = broker.clone();
        let handler = handler.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let outcome = handler(task).await;
            let payload = serialize_outcome(outcome);
            if let Err(e) = broker.push_left(completed_queue, &payload).await {
                tracing::error!(error = %e, queue = completed_queue, "failed to push completion");
            }
        });
    }
}

fn serialize_outcome(outcome: anyhow::Result<serde_json::Value>) -> String {
    match outcome {
        Ok(value) => value.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "stage task failed");
            serde_json::json!({ "success": false, "error": e.to_string() }).to_string()
        }
    }
}

/// Helper used by each stage's handler to build the completion payload
/// from a typed envelope without duplicating the `to_string` call site.
pub fn completion_json<T: Serialize>(completion: &T) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(completion)?)
}
