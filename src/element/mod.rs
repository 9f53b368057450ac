//! Element traits and adapters.
//!
//! An element is a named processing node with a role (source, filter, or
//! sink) and declared capability sets. Elements are owned exclusively by
//! the pipeline they are added to.

mod traits;

pub use traits::{
    ElementDyn, ElementType, Filter, FilterAdapter, Sink, SinkAdapter, Source, SourceAdapter,
};
