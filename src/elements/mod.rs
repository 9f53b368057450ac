//! Built-in pipeline elements.
//!
//! Each element kind takes a typed configuration struct, validated at
//! construction; there is no string-keyed property access.
//!
//! ## Sources
//! - [`TestSource`]: Generates a bounded stream of counter buffers
//!
//! ## Filters
//! - [`PassThrough`]: Passes buffers unchanged
//! - [`CapsFilter`]: Pass-through with fixed declared caps (link testing)
//! - [`AsyncProbe`]: Reports an async preroll transition, completed later
//!
//! ## Sinks
//! - [`NullSink`]: Discards all buffers
//! - [`CollectSink`]: Records received sequence numbers for inspection

mod collect;
mod null;
mod passthrough;
mod probe;
mod testsrc;

pub use collect::{CollectSink, CollectedBuffers};
pub use null::NullSink;
pub use passthrough::{CapsFilter, PassThrough};
pub use probe::{AsyncProbe, AsyncProbeHandle};
pub use testsrc::{TestSource, TestSourceConfig};
