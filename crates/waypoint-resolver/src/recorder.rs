//! Deferred access bookkeeping.
//!
//! The redirect path only sends an [`AccessEvent`] into a bounded broadcast
//! channel with a single subscriber. When the channel is full the oldest
//! event is overwritten, and the worker learns how many it missed from
//! [`RecvError::Lagged`]. Each write to the [`AccessSink`] is bounded by a
//! timeout; failures and timeouts are logged and the event is dropped.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use waypoint_core::{AccessEvent, AccessSink, SinkError};

const SLOW_SINK_THRESHOLD: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct AccessRecorder {
    sender: Mutex<Option<broadcast::Sender<AccessEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: Arc<AtomicU64>,
    drain_timeout: Duration,
}

impl AccessRecorder {
    /// Starts the worker on the current Tokio runtime.
    ///
    /// The channel keeps at least `capacity` events; Tokio rounds the
    /// buffer up to a power of two.
    pub fn spawn(
        sink: Arc<dyn AccessSink>,
        capacity: NonZeroUsize,
        sink_timeout: Duration,
        drain_timeout: Duration,
    ) -> Self {
        let (sender, receiver) = broadcast::channel(capacity.get());
        let dropped = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_worker(
            receiver,
            sink,
            sink_timeout,
            Arc::clone(&dropped),
        ));

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            dropped,
            drain_timeout,
        }
    }

    /// Schedules an event. Never waits.
    pub fn record(&self, event: AccessEvent) {
        match self.sender.lock().as_ref() {
            Some(sender) => {
                if sender.send(event).is_err() {
                    debug!("Access recorder worker is gone, discarding event");
                }
            }
            None => debug!("Access recorder is shut down, discarding event"),
        }
    }

    /// Events waiting for the worker.
    pub fn pending(&self) -> usize {
        self.sender.lock().as_ref().map_or(0, |sender| sender.len())
    }

    /// Events the worker never saw because the channel overflowed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting events and waits for the worker to finish what is
    /// queued. A worker still busy after the drain timeout is aborted and
    /// the remaining events are lost. Later calls return immediately.
    pub async fn shutdown(&self) {
        // Dropping the only sender closes the channel once it is drained.
        drop(self.sender.lock().take());

        let worker = self.worker.lock().take();
        let Some(mut worker) = worker else {
            return;
        };

        match tokio::time::timeout(self.drain_timeout, &mut worker).await {
            Ok(Ok(())) => info!(dropped = self.dropped(), "Access recorder drained"),
            Ok(Err(e)) => warn!(error = %e, "Access recorder worker terminated abnormally"),
            Err(_) => {
                worker.abort();
                warn!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    dropped = self.dropped(),
                    "Access recorder did not drain in time, abandoning pending events"
                );
            }
        }
    }
}

async fn run_worker(
    mut receiver: broadcast::Receiver<AccessEvent>,
    sink: Arc<dyn AccessSink>,
    sink_timeout: Duration,
    dropped: Arc<AtomicU64>,
) {
    loop {
        match receiver.recv().await {
            Ok(event) => write_event(sink.as_ref(), &event, sink_timeout).await,
            Err(RecvError::Lagged(missed)) => {
                let total = dropped.fetch_add(missed, Ordering::Relaxed) + missed;
                trace!(missed, dropped = total, "Access channel full, oldest events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("Access recorder worker stopped");
}

async fn write_event(sink: &dyn AccessSink, event: &AccessEvent, sink_timeout: Duration) {
    let started = Instant::now();
    let result = tokio::time::timeout(sink_timeout, sink.record(event)).await;
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(())) => {
            if elapsed > SLOW_SINK_THRESHOLD {
                warn!(
                    key = %event.short_key,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Slow access sink write"
                );
            }
        }
        Ok(Err(e)) => {
            warn!(key = %event.short_key, error = %e, "Failed to record access event");
        }
        Err(_) => {
            warn!(
                key = %event.short_key,
                timeout_ms = sink_timeout.as_millis() as u64,
                "Access sink write timed out, dropping event"
            );
        }
    }
}

/// Writes one structured log line per access under the `waypoint::access`
/// target, for deployments without a dedicated analytics store.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAccessSink;

#[async_trait]
impl AccessSink for TracingAccessSink {
    async fn record(&self, event: &AccessEvent) -> Result<(), SinkError> {
        info!(
            target: "waypoint::access",
            key = %event.short_key,
            destination = %event.destination_url,
            referrer = event.referrer.as_deref(),
            user_agent = event.user_agent.as_deref(),
            client_addr = event.client_addr.as_deref(),
            accessed_at = %event.accessed_at,
            "link accessed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSink, HangingSink, RecordingSink};
    use waypoint_core::{RequestMeta, ShortKey};

    const SINK_TIMEOUT: Duration = Duration::from_secs(2);
    const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

    fn event(key: &str) -> AccessEvent {
        AccessEvent::new(
            ShortKey::new_unchecked(key),
            "https://example.com",
            RequestMeta::default(),
        )
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn spawn(sink: Arc<dyn AccessSink>, n: usize) -> AccessRecorder {
        AccessRecorder::spawn(sink, capacity(n), SINK_TIMEOUT, DRAIN_TIMEOUT)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn events_reach_sink() {
        let sink = Arc::new(RecordingSink::default());
        let recorder = spawn(sink.clone(), 16);

        recorder.record(event("abc123"));
        recorder.record(event("abc123"));
        recorder.record(event("xyz789"));

        awaitility::at_most(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10))
            .until(|| sink.len() == 3);

        recorder.shutdown().await;
        assert_eq!(recorder.dropped(), 0);
    }

    #[tokio::test]
    async fn shutdown_drains_pending_events() {
        let sink = Arc::new(RecordingSink::default());
        let recorder = spawn(sink.clone(), 128);

        for i in 0..100 {
            recorder.record(event(&format!("key{i}")));
        }
        recorder.shutdown().await;

        assert_eq!(sink.len(), 100);
        assert_eq!(recorder.pending(), 0);

        // Nothing is accepted afterwards, and a second shutdown is harmless.
        recorder.record(event("late01"));
        recorder.shutdown().await;
        assert_eq!(sink.len(), 100);
    }

    #[tokio::test]
    async fn sink_failures_do_not_stop_the_worker() {
        let sink = Arc::new(FailingSink::default());
        let recorder = spawn(sink.clone(), 16);

        recorder.record(event("abc123"));
        recorder.record(event("abc123"));
        recorder.shutdown().await;

        assert_eq!(sink.attempts(), 2);
    }

    #[tokio::test]
    async fn hanging_sink_writes_time_out_one_by_one() {
        let sink = Arc::new(HangingSink::default());
        let recorder = AccessRecorder::spawn(
            sink.clone(),
            capacity(16),
            Duration::from_millis(20),
            DRAIN_TIMEOUT,
        );

        recorder.record(event("abc123"));
        recorder.record(event("abc456"));
        recorder.record(event("abc789"));
        recorder.shutdown().await;

        assert_eq!(sink.attempts(), 3);
    }

    #[tokio::test]
    async fn shutdown_gives_up_after_drain_timeout() {
        let sink = Arc::new(HangingSink::default());
        let recorder = AccessRecorder::spawn(
            sink.clone(),
            capacity(16),
            Duration::from_secs(60),
            Duration::from_millis(100),
        );

        for i in 0..5 {
            recorder.record(event(&format!("key{i}")));
        }

        let finished = tokio::time::timeout(Duration::from_secs(2), recorder.shutdown()).await;

        assert!(finished.is_ok(), "shutdown must not wait on a stuck sink");
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn overflow_drops_oldest_events() {
        let sink = Arc::new(RecordingSink::default());
        let recorder = spawn(sink.clone(), 2);

        // On a current-thread runtime the worker cannot run until we yield.
        recorder.record(event("first"));
        recorder.record(event("second"));
        recorder.record(event("third"));
        assert_eq!(recorder.pending(), 2);

        recorder.shutdown().await;

        let keys: Vec<String> = sink
            .events()
            .into_iter()
            .map(|e| e.short_key.to_string())
            .collect();
        assert_eq!(keys, vec!["second", "third"]);
        assert_eq!(recorder.dropped(), 1);
    }

    #[tokio::test]
    async fn tracing_sink_accepts_events() {
        assert!(TracingAccessSink.record(&event("abc123")).await.is_ok());
    }
}
