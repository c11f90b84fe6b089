//! Maps a client-chosen `request_id` to the `ProgressStream` for the
//! in-flight tool call it names, so a separate SSE connection can
//! observe the same request's progress events.

use std::collections::HashMap;
use std::sync::Arc;

use retrieval_engine::ProgressStream;
use retrieval_types::ProgressEvent;
use tokio::sync::broadcast;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct ProgressRegistry {
    streams: Mutex<HashMap<String, Arc<ProgressStream>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, request_id: String) -> Arc<ProgressStream> {
        let stream = Arc::new(ProgressStream::new());
        self.streams.lock().await.insert(request_id, Arc::clone(&stream));
        stream
    }

    pub async fn lookup(&self, request_id: &str) -> Option<Arc<ProgressStream>> {
        self.streams.lock().await.get(request_id).cloned()
    }

    /// Subscribes to the stream registered under `request_id` without
    /// holding a strong reference to it. Once the tool call finishes and
    /// [`ProgressRegistry::remove`] drops the registry's own reference,
    /// the stream's sender drops too (assuming the tool call itself has
    /// also returned), and the returned receiver observes a closed
    /// channel — the "stream closed" signal a subscriber relies on
    /// rather than polling forever.
    pub async fn subscribe(&self, request_id: &str) -> Option<broadcast::Receiver<ProgressEvent>> {
        self.streams.lock().await.get(request_id).map(|s| s.subscribe())
    }

    pub async fn remove(&self, request_id: &str) {
        self.streams.lock().await.remove(request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval_types::ProgressEvent;

    #[tokio::test]
    async fn registered_stream_is_reachable_by_id() {
        let registry = ProgressRegistry::new();
        let stream = registry.register("abc".to_string()).await;
        stream.publish(ProgressEvent::SearchStarted);

        let found = registry.lookup("abc").await.expect("stream should be registered");
        assert!(Arc::ptr_eq(&stream, &found));

        registry.remove("abc").await;
        assert!(registry.lookup("abc").await.is_none());
    }
}
