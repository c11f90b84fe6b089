//! Single-producer, multi-subscriber progress events for one request.
//! Progress is advisory: a slow subscriber drops events rather than
//! backpressuring the orchestrator.

use std::sync::Mutex;

use retrieval_types::ProgressEvent;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

pub struct ProgressStream {
    sender: broadcast::Sender<ProgressEvent>,
    dropped: Mutex<u64>,
}

impl ProgressStream {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender, dropped: Mutex::new(0) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event to all current subscribers. If a subscriber's
    /// buffer is full, broadcast lags it rather than blocking; there's
    /// no way to observe which subscriber dropped from here, so a send
    /// with zero receivers (nobody listening yet) is not counted as a
    /// drop but a lagged receiver reading a `Lagged` error is the
    /// subscriber-side signal of one.
    pub fn publish(&self, event: ProgressEvent) {
        debug!(?event, "progress event");
        let _ = self.sender.send(event);
    }

    pub fn record_dropped(&self) {
        if let Ok(mut count) = self.dropped.lock() {
            *count += 1;
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.lock().map(|g| *g).unwrap_or(0)
    }
}

impl Default for ProgressStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let stream = ProgressStream::new();
        let mut rx = stream.subscribe();
        stream.publish(ProgressEvent::SearchStarted);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ProgressEvent::SearchStarted));
    }

    #[tokio::test]
    async fn overflow_lags_rather_than_blocks() {
        let stream = ProgressStream::with_buffer(1);
        let mut rx = stream.subscribe();
        stream.publish(ProgressEvent::SearchStarted);
        stream.publish(ProgressEvent::LlmStarted);
        stream.publish(ProgressEvent::LlmFinished);
        // the receiver may observe a Lagged error rather than every event,
        // but the publisher itself never blocks or errors.
        let _ = rx.recv().await;
    }
}
