//! SDP offer/answer signaling.
//!
//! A [`SignalingSession`] is one peer's view of a negotiation: it fixes
//! a role (offerer or answerer) on first description activity, tracks
//! the local and remote descriptions, and buffers ICE candidates that
//! arrive before the remote description is set.
//!
//! Negotiation steps complete through one-shot [`Reply`] futures; the
//! [`exchange`] helpers compose them into a full round trip between two
//! sessions.

mod error;
mod reply;
mod sdp;
mod session;

pub mod exchange;

pub use error::NegotiationError;
pub use reply::{reply_pair, Reply, ReplySlot};
pub use sdp::{IceCandidate, MediaKind, MediaSpec, SdpType, SessionDescription};
pub use session::{CallbackId, Role, SessionState, SignalingSession};
