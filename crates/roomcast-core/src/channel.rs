//! Send/close capability owned by a connection.
//!
//! The hub never touches a socket. Each connection exclusively owns one
//! `Channel`, and everything the hub does to a peer goes through it. This
//! keeps the hub transport-agnostic and trivially testable with an in-memory
//! fake.

use crate::error::ChannelError;

/// Minimal capability for delivering frames to one peer.
///
/// # Contract
///
/// - `send` MUST NOT block. Implementations queue the frame for a writer
///   task that owns the actual socket; a full or closed queue is reported as
///   an error, never awaited. This is what keeps one slow peer from stalling
///   a broadcast to everyone else.
/// - `send` failures are delivery failures for that one peer only. Callers
///   convert them to a boolean result; they never propagate.
/// - `close` is idempotent. The hub may close a channel whose transport
///   already went away (stale-heartbeat sweep racing a socket error).
/// - Frames sent through one channel are delivered in send order.
pub trait Channel: Send + Sync + 'static {
    /// Queue one serialized envelope for delivery.
    fn send(&self, message: String) -> Result<(), ChannelError>;

    /// Ask the transport to close the underlying connection.
    fn close(&self);
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    /// In-memory fake: records frames, refuses sends after close.
    #[derive(Clone, Default)]
    struct FakeChannel {
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl Channel for FakeChannel {
        fn send(&self, message: String) -> Result<(), ChannelError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChannelError::Closed);
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn fake_channel_records_sends() {
        let channel = FakeChannel::default();

        channel.send("one".into()).unwrap();
        channel.send("two".into()).unwrap();

        assert_eq!(*channel.sent.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn send_after_close_fails() {
        let channel = FakeChannel::default();

        channel.close();
        assert!(matches!(channel.send("late".into()), Err(ChannelError::Closed)));
    }

    #[test]
    fn close_is_idempotent() {
        let channel = FakeChannel::default();

        channel.close();
        channel.close();
        assert!(channel.closed.load(Ordering::SeqCst));
    }
}
