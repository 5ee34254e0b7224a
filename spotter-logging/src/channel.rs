//! Call logger backed by a bounded channel and a worker task

use crate::call_logger::CallLogger;
use crate::event::CallLogMessage;
use crate::store::{CallLogStats, CallLogStore};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use spotter_config::CallLogConfig;
use spotter_core::{CallId, NormalizedError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// [`CallLogger`] that never blocks its caller.
///
/// Events go through a bounded channel to a worker task that owns the
/// writes to the shared [`CallLogStore`]. When the channel is full the event
/// is dropped and counted. The worker also prunes expired calls once per
/// retention window while the channel is quiet.
#[derive(Clone)]
pub struct ChannelCallLogger {
    sender: mpsc::Sender<CallLogMessage>,
    store: Arc<Mutex<CallLogStore>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelCallLogger {
    /// Start the worker on the current tokio runtime
    pub fn spawn(config: &CallLogConfig) -> (Self, JoinHandle<()>) {
        Self::spawn_with_store(
            config.channel_capacity,
            Arc::new(Mutex::new(CallLogStore::from_config(config))),
        )
    }

    /// Start the worker writing into an existing store
    pub fn spawn_with_store(
        capacity: usize,
        store: Arc<Mutex<CallLogStore>>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel(capacity.max(1));
        let worker_store = store.clone();
        let prune_every = store.lock().retention().max(Duration::from_secs(1));

        let handle = tokio::spawn(async move {
            let mut prune = tokio::time::interval(prune_every);
            prune.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    message = receiver.recv() => match message {
                        Some(message) => worker_store.lock().apply(message),
                        None => break,
                    },
                    _ = prune.tick() => worker_store.lock().prune_expired(Instant::now()),
                }
            }
            debug!("Call log worker stopped");
        });

        let logger = Self {
            sender,
            store,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (logger, handle)
    }

    /// Shared handle to the underlying store for queries
    pub fn store(&self) -> Arc<Mutex<CallLogStore>> {
        self.store.clone()
    }

    pub fn stats(&self) -> CallLogStats {
        self.store.lock().stats()
    }

    /// Number of events discarded because the channel was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait until every event sent before this call has been applied
    pub async fn flush(&self) {
        let (reply, done) = oneshot::channel();
        if self.sender.send(CallLogMessage::Flush(reply)).await.is_ok() {
            let _ = done.await;
        }
    }

    fn send(&self, message: CallLogMessage) {
        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "Call log channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Call log worker gone, dropping event");
            }
        }
    }
}

impl CallLogger for ChannelCallLogger {
    fn log_call_start(&self, context: &str) -> CallId {
        let call_id = CallId::new();
        self.send(CallLogMessage::Started {
            call_id,
            context: context.to_string(),
            at: Instant::now(),
        });
        call_id
    }

    fn log_retry(
        &self,
        call_id: CallId,
        attempt: u32,
        max_attempts: u32,
        error: Option<&NormalizedError>,
    ) {
        self.send(CallLogMessage::Retry {
            call_id,
            attempt,
            max_attempts,
            error: error.cloned(),
        });
    }

    fn log_success(&self, call_id: CallId, summary: Option<JsonValue>) {
        self.send(CallLogMessage::Succeeded {
            call_id,
            summary,
            at: Instant::now(),
        });
    }

    fn log_failure(&self, call_id: CallId, error: &NormalizedError) {
        self.send(CallLogMessage::Failed {
            call_id,
            error: error.clone(),
            at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CallStatus;
    use spotter_core::ErrorKind;

    #[tokio::test]
    async fn test_events_reach_the_store() {
        let (logger, _worker) = ChannelCallLogger::spawn(&CallLogConfig::default());

        let ok = logger.log_call_start("athletes");
        logger.log_success(ok, None);

        let failed = logger.log_call_start("payments");
        let error = NormalizedError::new(ErrorKind::Network, "Network error: down", "payments");
        logger.log_retry(failed, 2, 2, Some(&error));
        logger.log_failure(failed, &error);

        logger.flush().await;

        let store = logger.store();
        let store = store.lock();
        assert_eq!(store.call(&ok).unwrap().status, CallStatus::Success);
        assert_eq!(store.call(&failed).unwrap().status, CallStatus::Error);
        assert_eq!(store.call(&failed).unwrap().retry_attempts, 2);
        assert_eq!(store.len(), 5);
        assert_eq!(logger.dropped(), 0);
    }

    #[tokio::test]
    async fn test_full_channel_drops_instead_of_blocking() {
        let config = CallLogConfig {
            max_entries: 100,
            channel_capacity: 1,
            retention: Duration::from_secs(60),
        };
        // The worker cannot run before this test yields, so the channel fills up
        let (logger, _worker) = ChannelCallLogger::spawn(&config);

        for _ in 0..10 {
            logger.log_call_start("flood");
        }
        assert_eq!(logger.dropped(), 9);

        logger.flush().await;
        assert!(logger.stats().total_logs >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_prunes_while_idle() {
        let (logger, _worker) = ChannelCallLogger::spawn(&CallLogConfig::default());
        let call_id = logger.log_call_start("athletes");
        logger.log_success(call_id, None);
        logger.flush().await;
        assert!(logger.store().lock().call(&call_id).is_some());

        tokio::time::sleep(CallLogConfig::default().retention * 2 + Duration::from_secs(1)).await;
        assert!(logger.store().lock().call(&call_id).is_none());
        assert_eq!(logger.store().lock().tracked_calls(), 0);
    }

    #[tokio::test]
    async fn test_worker_stops_when_loggers_are_dropped() {
        let (logger, worker) = ChannelCallLogger::spawn(&CallLogConfig::default());
        let clone = logger.clone();
        drop(logger);
        drop(clone);
        worker.await.unwrap();
    }
}
