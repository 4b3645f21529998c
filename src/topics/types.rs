//! Topic types: sinks, subscriptions and channel handles.

use crate::types::{HistoryOffset, TopicId, Value};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Why a push to a topic failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("topic buffer is full")]
    Full,

    #[error("topic receiver is gone")]
    Disconnected,

    #[error("push rejected: {0}")]
    Rejected(String),

    #[error("sink panicked")]
    Panicked,
}

/// Destination for values pushed to a topic.
///
/// A panic inside `push` is caught and reported as [`PushError::Panicked`]
/// for that topic only.
///
/// Implementations are owned by the subscriber and must not block: `push`
/// runs while the alias lock is held.
pub trait TopicSink: Send + Sync {
    fn push(&self, value: Value) -> Result<(), PushError>;
}

impl<F> TopicSink for F
where
    F: Fn(Value) -> Result<(), PushError> + Send + Sync,
{
    fn push(&self, value: Value) -> Result<(), PushError> {
        self(value)
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn TopicSink>;

/// Sink backed by a bounded channel.
pub struct ChannelSink {
    sender: Sender<Value>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn bounded(buffer_size: usize) -> (Self, Receiver<Value>) {
        let (sender, receiver) = bounded(buffer_size.max(1));
        (Self { sender }, receiver)
    }
}

impl TopicSink for ChannelSink {
    fn push(&self, value: Value) -> Result<(), PushError> {
        match self.sender.try_send(value) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PushError::Full),
            Err(TrySendError::Disconnected(_)) => Err(PushError::Disconnected),
        }
    }
}

/// A topic registered against a coordinate.
#[derive(Clone)]
pub struct Subscription {
    pub topic: TopicId,
    /// `None` pushes the raw incoming value; `Some` reads from history.
    pub history: Option<HistoryOffset>,
    sink: SharedSink,
}

impl Subscription {
    pub fn new(topic: TopicId, history: Option<HistoryOffset>, sink: SharedSink) -> Self {
        Self {
            topic,
            history,
            sink,
        }
    }

    /// Push a value to the subscriber.
    pub fn push(&self, value: Value) -> Result<(), PushError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.sink.push(value)))
            .unwrap_or(Err(PushError::Panicked))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

/// Handle to a channel-backed topic.
pub struct TopicHandle {
    pub id: TopicId,
    /// Channel to receive values.
    pub receiver: Receiver<Value>,
}

impl TopicHandle {
    /// Receive the next value (blocking).
    pub fn recv(&self) -> Result<Value, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a value (non-blocking).
    pub fn try_recv(&self) -> Result<Value, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Value, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<Value> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_full_and_disconnected() {
        let (sink, receiver) = ChannelSink::bounded(1);
        assert_eq!(sink.push(Value::Int(1)), Ok(()));
        assert_eq!(sink.push(Value::Int(2)), Err(PushError::Full));

        assert_eq!(receiver.try_recv().unwrap(), Value::Int(1));
        drop(receiver);
        assert_eq!(sink.push(Value::Int(3)), Err(PushError::Disconnected));
    }

    #[test]
    fn test_closure_sink() {
        let sink: SharedSink = Arc::new(|value: Value| {
            if value.is_empty() {
                Err(PushError::Rejected("empty".into()))
            } else {
                Ok(())
            }
        });
        let sub = Subscription::new(TopicId(1), None, sink);
        assert!(sub.push(Value::Int(1)).is_ok());
        assert!(matches!(sub.push(Value::Empty), Err(PushError::Rejected(_))));
    }

    #[test]
    fn test_panicking_sink_reports_error() {
        let sink: SharedSink =
            Arc::new(|_: Value| -> Result<(), PushError> { panic!("sink bug") });
        let sub = Subscription::new(TopicId(1), None, sink);
        assert_eq!(sub.push(Value::Int(1)), Err(PushError::Panicked));
    }
}
