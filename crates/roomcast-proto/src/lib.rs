//! Wire contract for the roomcast hub.
//!
//! Every message to or from a connection travels in a three-field JSON
//! envelope: `{"type": string, "data": object, "timestamp": ISO-8601}`.
//! Inbound text decodes into the closed [`ClientFrame`] enum; outbound
//! payloads are built from the typed structs in [`events`] and wrapped in an
//! [`Envelope`].
//!
//! We chose plain JSON over a binary framing because the peers are browser
//! and mobile chat clients; the envelope is self-describing and the hub never
//! inspects `data` beyond routing.
//!
//! # Invariants
//!
//! - Each outbound event kind maps to exactly one [`EventType`] variant
//!   (enforced by match exhaustiveness).
//! - [`ClientFrame::parse`] never panics on untrusted input; every failure is
//!   a [`FrameError`] that maps to a closed [`ErrorCode`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod envelope;
mod errors;
pub mod events;

pub use client::ClientFrame;
pub use envelope::{Envelope, EventType};
pub use errors::{ErrorCode, FrameError, ProtocolError};
