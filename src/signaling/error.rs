//! Negotiation error types.

use super::sdp::SdpType;
use super::session::{Role, SessionState};
use thiserror::Error;

/// Error raised during an offer/answer negotiation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The operation is not valid in the session's current state.
    #[error("cannot {operation} in state {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The session state at the time.
        state: SessionState,
    },

    /// A description's type contradicts the session's fixed role.
    #[error("{side} description of type {got} conflicts with role {role}")]
    RoleMismatch {
        /// "local" or "remote".
        side: &'static str,
        /// The offered description type.
        got: SdpType,
        /// The role the session committed to earlier.
        role: Role,
    },

    /// A different description of the same side was already set.
    ///
    /// Re-setting the identical description is accepted; replacing it is
    /// not.
    #[error("a different {side} description is already set")]
    DescriptionConflict {
        /// "local" or "remote".
        side: &'static str,
    },

    /// The SDP text could not be interpreted.
    #[error("invalid SDP: {0}")]
    InvalidSdp(String),

    /// The other end of a reply was dropped before completing it.
    #[error("reply abandoned before completion")]
    ReplyDropped,
}
