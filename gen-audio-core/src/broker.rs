//! The durable FIFO message broker (§2, §6). A thin `Broker` trait wraps
//! `redis::aio::ConnectionManager` so the gateway/orchestrator/workers
//! depend on the trait rather than the `redis` crate directly — the same
//! explicit-construction-over-implicit-global discipline the teacher
//! applies to its `WorkerPool` (built once in `main`, passed down via
//! `Arc`, never reached for through a static).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;

#[async_trait]
pub trait Broker: Send + Sync {
    /// `LPUSH queue payload` — push a new task onto the head of a named
    /// queue.
    async fn push_left(&self, queue: &str, payload: &str) -> Result<()>;

    /// `BRPOP queue timeout` — block for up to `timeout` for a task to
    /// appear at the tail of a named queue. Returns `None` on timeout.
    async fn pop_right_blocking(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;

    /// `LLEN queue` — current queue depth, for operator inspection.
    async fn queue_len(&self, queue: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct RedisBroker {
    manager: redis::aio::ConnectionManager,
}

impl RedisBroker {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("invalid REDIS_URL")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn push_left(&self, queue: &str, payload: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(queue, payload)
            .await
            .with_context(|| format!("LPUSH {queue} failed"))
    }

    async fn pop_right_blocking(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let secs = timeout.as_secs_f64().max(0.0);
        let result: Option<(String, String)> = conn
            .brpop(queue, secs)
            .await
            .with_context(|| format!("BRPOP {queue} failed"))?;
        Ok(result.map(|(_, payload)| payload))
    }

    async fn queue_len(&self, queue: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        conn.llen(queue).await.with_context(|| format!("LLEN {queue} failed"))
    }
}

/// An in-memory broker used by gateway/orchestrator unit tests, grounded
/// on the same "trait boundary exists so tests don't need a live
/// dependency" pattern the teacher applies via `TtsBackend`.
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct MockBroker {
        queues: Mutex<std::collections::HashMap<String, VecDeque<String>>>,
    }

    impl MockBroker {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Broker for MockBroker {
        async fn push_left(&self, queue: &str, payload: &str) -> Result<()> {
            let mut queues = self.queues.lock().await;
            queues
                .entry(queue.to_string())
                .or_default()
                .push_front(payload.to_string());
            Ok(())
        }

        async fn pop_right_blocking(&self, queue: &str, _timeout: Duration) -> Result<Option<String>> {
            let mut queues = self.queues.lock().await;
            Ok(queues.entry(queue.to_string()).or_default().pop_back())
        }

        async fn queue_len(&self, queue: &str) -> Result<u64> {
            let queues = self.queues.lock().await;
            Ok(queues.get(queue).map(|q| q.len()).unwrap_or(0) as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockBroker;
    use super::*;

    #[tokio::test]
    async fn mock_broker_is_fifo() {
        let broker = MockBroker::new();
        broker.push_left("q", "a").await.unwrap();
        broker.push_left("q", "b").await.unwrap();
        let first = broker.pop_right_blocking("q", Duration::from_millis(10)).await.unwrap();
        let second = broker.pop_right_blocking("q", Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.as_deref(), Some("a"));
        assert_eq!(second.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn mock_broker_times_out_on_empty_queue() {
        let broker = MockBroker::new();
        let result = broker.pop_right_blocking("empty", Duration::from_millis(1)).await.unwrap();
        assert!(result.is_none());
    }
}
