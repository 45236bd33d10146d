//! Stock channel implementation for tokio transports.
//!
//! A connection's writer task owns the socket; the hub owns an
//! [`MpscChannel`] whose unbounded sender feeds that task. Sends never
//! block and never fail for backpressure, only for a hung-up receiver, so a
//! broadcast can touch thousands of channels without awaiting any of them.
//! The unbounded queue preserves per-connection send order.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use roomcast_core::{Channel, ChannelError};
use tokio::sync::mpsc;

/// What the hub hands a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// A serialized envelope to write to the socket.
    Frame(String),
    /// Request to close the socket and exit the writer task.
    Close,
}

/// [`Channel`] backed by an unbounded tokio mpsc queue.
#[derive(Debug, Clone)]
pub struct MpscChannel {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    closed: Arc<AtomicBool>,
}

impl MpscChannel {
    /// Create a channel and the receiver its writer task reads from.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, closed: Arc::new(AtomicBool::new(false)) }, rx)
    }

    /// Whether [`Channel::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Channel for MpscChannel {
    fn send(&self, message: String) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.tx.send(OutboundMessage::Frame(message)).map_err(|_| ChannelError::Closed)
    }

    fn close(&self) {
        // First close wins; the writer task exits on the Close marker. A
        // dropped receiver makes the send a no-op, which is fine.
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(OutboundMessage::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_arrive_in_send_order() {
        let (channel, mut rx) = MpscChannel::pair();

        channel.send("a".into()).unwrap();
        channel.send("b".into()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::Frame("a".into()));
        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::Frame("b".into()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_emits_one_marker_and_stops_sends() {
        let (channel, mut rx) = MpscChannel::pair();

        channel.close();
        channel.close();

        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::Close);
        assert!(rx.try_recv().is_err());
        assert!(matches!(channel.send("late".into()), Err(ChannelError::Closed)));
    }

    #[test]
    fn dropped_receiver_fails_sends() {
        let (channel, rx) = MpscChannel::pair();
        drop(rx);

        assert!(matches!(channel.send("gone".into()), Err(ChannelError::Closed)));
    }

    #[test]
    fn clones_share_closed_state() {
        let (channel, _rx) = MpscChannel::pair();
        let clone = channel.clone();

        channel.close();
        assert!(clone.is_closed());
    }
}
