//! Core element traits.

use crate::buffer::Buffer;
use crate::error::Result;
use crate::format::Caps;
use crate::pipeline::{StateChangeResult, Transition};

// ============================================================================
// Source trait
// ============================================================================

/// A source element that produces buffers.
///
/// Sources are the entry points of a pipeline.
///
/// # Lifecycle
///
/// - `produce()` is called by the engine while PLAYING
/// - Return `Ok(Some(buffer))` to emit a buffer
/// - Return `Ok(None)` to signal end-of-stream (EOS)
/// - Return `Err(...)` to signal an error
pub trait Source: Send {
    /// Produce the next buffer.
    ///
    /// Returns `Ok(None)` when the source is exhausted (end of stream).
    fn produce(&mut self) -> Result<Option<Buffer>>;

    /// Get the name of this source (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get the output caps (what formats this source produces).
    fn output_caps(&self) -> Caps {
        Caps::any()
    }

    /// Whether this is a live source (cannot preroll; reports
    /// `NoPreroll` when reaching PAUSED).
    fn is_live(&self) -> bool {
        false
    }

    /// Total number of buffers this source will produce, if known.
    ///
    /// Live and unbounded sources return `None`.
    fn duration(&self) -> Option<u64> {
        None
    }

    /// Reposition the stream to `position`, in buffers.
    ///
    /// Returns whether the request was handled; sources that cannot
    /// seek keep the default and return `false`.
    fn seek(&mut self, position: u64) -> bool {
        let _ = position;
        false
    }

    /// React to a pipeline state transition.
    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        let _ = transition;
        StateChangeResult::Success
    }
}

// ============================================================================
// Filter trait
// ============================================================================

/// A filter element that transforms buffers.
///
/// Filters sit in the middle of a pipeline, receiving buffers from
/// upstream and sending transformed buffers downstream.
///
/// # Return Values
///
/// - `Ok(Some(buffer))`: emit a buffer downstream
/// - `Ok(None)`: drop this buffer
/// - `Err(...)`: signal an error
pub trait Filter: Send {
    /// Process an input buffer and optionally produce an output buffer.
    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>>;

    /// Get the name of this filter (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get the input caps (what formats this filter accepts).
    fn input_caps(&self) -> Caps {
        Caps::any()
    }

    /// Get the output caps (what formats this filter produces).
    fn output_caps(&self) -> Caps {
        Caps::any()
    }

    /// React to a pipeline state transition.
    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        let _ = transition;
        StateChangeResult::Success
    }
}

// ============================================================================
// Sink trait
// ============================================================================

/// A sink element that consumes buffers.
///
/// Sinks are the exit points of a pipeline.
pub trait Sink: Send {
    /// Consume a buffer.
    fn consume(&mut self, buffer: Buffer) -> Result<()>;

    /// Get the name of this sink (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get the input caps (what formats this sink accepts).
    fn input_caps(&self) -> Caps {
        Caps::any()
    }

    /// React to a pipeline state transition.
    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        let _ = transition;
        StateChangeResult::Success
    }
}

// ============================================================================
// Dynamic element (type-erased)
// ============================================================================

/// The role of an element in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// A source element (produces buffers).
    Source,
    /// A filter element (transforms buffers).
    Filter,
    /// A sink element (consumes buffers).
    Sink,
}

/// Dynamic (type-erased) element trait.
///
/// Used internally by the pipeline to handle elements uniformly.
/// Most users should implement [`Source`], [`Filter`], or [`Sink`] instead.
pub trait ElementDyn: Send {
    /// Get the element's name.
    fn name(&self) -> &str;

    /// Get the element's role (source, filter, or sink).
    fn element_type(&self) -> ElementType;

    /// Process or produce a buffer.
    ///
    /// - For sources: `input` is `None`, returns the produced buffer
    /// - For sinks: `input` is `Some`, returns `None`
    /// - For filters: `input` is `Some`, returns the transformed buffer
    fn process(&mut self, input: Option<Buffer>) -> Result<Option<Buffer>>;

    /// Get the input caps (for link validation).
    fn input_caps(&self) -> Caps {
        Caps::any()
    }

    /// Get the output caps (for link validation).
    fn output_caps(&self) -> Caps {
        Caps::any()
    }

    /// Whether this element is live (cannot preroll).
    fn is_live(&self) -> bool {
        false
    }

    /// Stream length in buffers, for sources that know it.
    fn duration(&self) -> Option<u64> {
        None
    }

    /// Reposition a source; non-sources and unseekable sources refuse.
    fn seek(&mut self, position: u64) -> bool {
        let _ = position;
        false
    }

    /// Drive a state transition through the element.
    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        let _ = transition;
        StateChangeResult::Success
    }
}

// ============================================================================
// Adapters
// ============================================================================

/// Wrapper to adapt a [`Source`] to [`ElementDyn`].
pub struct SourceAdapter<S: Source> {
    inner: S,
}

impl<S: Source> SourceAdapter<S> {
    /// Create a new source adapter.
    pub fn new(source: S) -> Self {
        Self { inner: source }
    }
}

impl<S: Source + 'static> ElementDyn for SourceAdapter<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        ElementType::Source
    }

    fn process(&mut self, _input: Option<Buffer>) -> Result<Option<Buffer>> {
        self.inner.produce()
    }

    fn output_caps(&self) -> Caps {
        self.inner.output_caps()
    }

    fn is_live(&self) -> bool {
        self.inner.is_live()
    }

    fn duration(&self) -> Option<u64> {
        self.inner.duration()
    }

    fn seek(&mut self, position: u64) -> bool {
        self.inner.seek(position)
    }

    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        self.inner.change_state(transition)
    }
}

/// Wrapper to adapt a [`Filter`] to [`ElementDyn`].
pub struct FilterAdapter<F: Filter> {
    inner: F,
}

impl<F: Filter> FilterAdapter<F> {
    /// Create a new filter adapter.
    pub fn new(filter: F) -> Self {
        Self { inner: filter }
    }
}

impl<F: Filter + 'static> ElementDyn for FilterAdapter<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        ElementType::Filter
    }

    fn process(&mut self, input: Option<Buffer>) -> Result<Option<Buffer>> {
        match input {
            Some(buffer) => self.inner.process(buffer),
            None => Ok(None),
        }
    }

    fn input_caps(&self) -> Caps {
        self.inner.input_caps()
    }

    fn output_caps(&self) -> Caps {
        self.inner.output_caps()
    }

    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        self.inner.change_state(transition)
    }
}

/// Wrapper to adapt a [`Sink`] to [`ElementDyn`].
pub struct SinkAdapter<S: Sink> {
    inner: S,
}

impl<S: Sink> SinkAdapter<S> {
    /// Create a new sink adapter.
    pub fn new(sink: S) -> Self {
        Self { inner: sink }
    }
}

impl<S: Sink + 'static> ElementDyn for SinkAdapter<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        ElementType::Sink
    }

    fn process(&mut self, input: Option<Buffer>) -> Result<Option<Buffer>> {
        if let Some(buffer) = input {
            self.inner.consume(buffer)?;
        }
        Ok(None)
    }

    fn input_caps(&self) -> Caps {
        self.inner.input_caps()
    }

    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        self.inner.change_state(transition)
    }
}
