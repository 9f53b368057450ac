//! Error types for Conflux.

use crate::pipeline::State;
use thiserror::Error;

/// Result type alias using Conflux's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Conflux operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Element creation failed (no factory registered for the type name).
    #[error("no element registered for type name '{name}'")]
    ElementCreation {
        /// The unknown type name.
        name: String,
    },

    /// Element configuration rejected at construction.
    #[error("invalid configuration for {element}: {reason}")]
    InvalidConfig {
        /// Element type name.
        element: &'static str,
        /// Why the configuration was rejected.
        reason: String,
    },

    /// Linking two elements failed.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// A requested state change was rejected by the pipeline.
    #[error("state change {from:?} -> {to:?} failed: {reason}")]
    StateChange {
        /// State the pipeline was in when the request was made.
        from: State,
        /// Requested target state.
        to: State,
        /// Why the change failed.
        reason: String,
    },

    /// Bus delivery error.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Signaling negotiation error.
    #[error(transparent)]
    Negotiation(#[from] crate::signaling::NegotiationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while linking two pipeline elements.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The declared format sets of the two elements have no overlap.
    #[error("no common format between {upstream} and {downstream}:\n  {explanation}")]
    Incompatible {
        /// Name of the upstream element.
        upstream: String,
        /// Name of the downstream element.
        downstream: String,
        /// Detailed explanation.
        explanation: String,
    },

    /// The link would create a cycle in the pipeline graph.
    #[error("linking {upstream} -> {downstream} would create a cycle")]
    WouldCycle {
        /// Name of the upstream element.
        upstream: String,
        /// Name of the downstream element.
        downstream: String,
    },

    /// One of the endpoints is not in this pipeline.
    #[error("element not found: {name}")]
    ElementNotFound {
        /// Element name or id description.
        name: String,
    },

    /// The element has no pad in the required direction
    /// (e.g. linking out of a sink, or into a source).
    #[error("element '{element}' has no {direction} pad")]
    NoSuchPad {
        /// Element name.
        element: String,
        /// "output" or "input".
        direction: &'static str,
    },
}

impl LinkError {
    /// Create an "incompatible formats" error describing both caps sets.
    pub fn incompatible(
        upstream: impl Into<String>,
        downstream: impl Into<String>,
        upstream_caps: &str,
        downstream_caps: &str,
    ) -> Self {
        Self::Incompatible {
            upstream: upstream.into(),
            downstream: downstream.into(),
            explanation: format!(
                "upstream produces: {upstream_caps}\n  downstream accepts: {downstream_caps}"
            ),
        }
    }
}

/// Error raised by the message bus.
#[derive(Error, Debug)]
pub enum BusError {
    /// The bus is already committed to the other delivery path.
    ///
    /// Each bus instance uses exactly one delivery path per run: either
    /// blocking pops or a registered watch, never both.
    #[error("bus already delivers via {active}; cannot also use {requested}")]
    DeliveryModeConflict {
        /// The delivery path already in use.
        active: &'static str,
        /// The delivery path that was requested.
        requested: &'static str,
    },

    /// A watch is already registered on this bus.
    #[error("a watch is already registered on this bus")]
    WatchExists,

    /// A message could not be interpreted.
    #[error("malformed message: {0}")]
    Malformed(String),
}
