//! Pipeline assembly and lifecycle.
//!
//! A [`Pipeline`] owns a validated element graph and a four-state
//! lifecycle (`NULL`, `READY`, `PAUSED`, `PLAYING`). State requests walk
//! one adjacent step at a time; every committed step is announced on the
//! pipeline's [`Bus`](crate::bus::Bus).

mod controller;
mod factory;
mod graph;
mod state;

pub use controller::Pipeline;
pub use factory::ElementFactory;
pub use graph::{ElementId, Node, PipelineGraph};
pub use state::{State, StateChangeResult, Transition};
