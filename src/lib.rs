//! # Conflux
//!
//! A minimal media-pipeline coordination layer.
//!
//! Conflux provides the thin orchestration that sits between an application
//! and a media engine: a pipeline of named elements with an explicit
//! lifecycle state machine, a message bus for asynchronous notifications,
//! and an offer/answer signaling session for peer negotiation.
//!
//! ## Features
//!
//! - **Pipeline controller**: directed graph of source/filter/sink elements,
//!   adjacent-only state transitions (NULL → READY → PAUSED → PLAYING),
//!   position/duration queries and seeking in buffer units, ordered
//!   teardown on every exit path
//! - **Bus dispatcher**: FIFO message queue with blocking filtered pop
//!   (explicit timeouts, sentinel on expiry) or an exclusive watch callback
//! - **Signaling**: SDP offer/answer exchange with ICE candidate buffering
//!   and one-shot async reply objects
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conflux::prelude::*;
//!
//! let pipeline = Pipeline::new("demo");
//! let src = pipeline.add_source("src", TestSource::new(TestSourceConfig::default())?);
//! let sink = pipeline.add_sink("sink", NullSink::new());
//! pipeline.link(src, sink)?;
//!
//! pipeline.set_state(State::Playing);
//! let bus = pipeline.bus();
//! while let Some(msg) = bus.timed_pop_filtered(MessageMask::ERROR | MessageMask::EOS, None)? {
//!     match msg.kind() {
//!         MessageKind::Eos => break,
//!         MessageKind::Error { description, .. } => eprintln!("error: {description}"),
//!         _ => {}
//!     }
//! }
//! pipeline.shutdown()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod bus;
pub mod element;
pub mod elements;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod signaling;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::Buffer;
    pub use crate::bus::{Bus, Message, MessageKind, MessageMask};
    pub use crate::element::{ElementDyn, Filter, Sink, Source};
    pub use crate::error::{Error, LinkError, Result};
    pub use crate::format::{Caps, MediaFormat};
    pub use crate::pipeline::{ElementId, Pipeline, State, StateChangeResult};
    pub use crate::signaling::{SdpType, SessionDescription, SessionState, SignalingSession};
}

pub use error::{Error, Result};
