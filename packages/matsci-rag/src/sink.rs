//! Output sinks for streamed answers.
//!
//! The final stage forwards the growing answer to a sink after every
//! fragment. A sink that reports its consumer is gone stops the stream.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Consumer of the partially generated answer.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Receive the answer accumulated so far.
    ///
    /// Returns `false` when the consumer has disconnected and no more
    /// fragments should be pulled.
    async fn partial(&self, accumulated: &str) -> bool;
}

/// Sink that accepts and ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl OutputSink for NullSink {
    async fn partial(&self, _accumulated: &str) -> bool {
        true
    }
}

/// Sink that forwards each partial answer over a channel.
///
/// The sink reports a disconnect once the receiving half is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver it feeds.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn partial(&self, accumulated: &str) -> bool {
        self.tx.send(accumulated.to_string()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_until_dropped() {
        let (sink, mut rx) = ChannelSink::new(4);
        assert!(sink.partial("Band").await);
        assert_eq!(rx.recv().await.as_deref(), Some("Band"));

        drop(rx);
        assert!(!sink.partial("Band gap").await);
    }
}
