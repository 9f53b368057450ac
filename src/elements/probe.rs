//! AsyncProbe element for exercising asynchronous state changes.

use crate::buffer::Buffer;
use crate::element::Filter;
use crate::error::Result;
use crate::pipeline::{StateChangeResult, Transition};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle used by the engine side to complete an [`AsyncProbe`]'s preroll.
#[derive(Clone)]
pub struct AsyncProbeHandle {
    ready: Arc<AtomicBool>,
}

impl AsyncProbeHandle {
    /// Mark the probe as prerolled; the pending transition can now commit.
    pub fn complete(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the probe has been completed.
    pub fn is_complete(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// A pass-through filter whose READY → PAUSED transition reports
/// [`StateChangeResult::Async`] until its handle is completed.
///
/// Stands in for engine elements that preroll asynchronously; the pipeline
/// records the pending target and resumes once the engine confirms.
pub struct AsyncProbe {
    name: String,
    ready: Arc<AtomicBool>,
}

impl AsyncProbe {
    /// Create an async probe and the handle that completes it.
    pub fn new() -> (Self, AsyncProbeHandle) {
        let ready = Arc::new(AtomicBool::new(false));
        let probe = Self {
            name: "asyncprobe".to_string(),
            ready: ready.clone(),
        };
        (probe, AsyncProbeHandle { ready })
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Filter for AsyncProbe {
    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>> {
        Ok(Some(buffer))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn change_state(&mut self, transition: Transition) -> StateChangeResult {
        match transition {
            Transition::ReadyToPaused if !self.ready.load(Ordering::Acquire) => {
                StateChangeResult::Async
            }
            _ => StateChangeResult::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_until_completed() {
        let (mut probe, handle) = AsyncProbe::new();
        assert_eq!(
            probe.change_state(Transition::ReadyToPaused),
            StateChangeResult::Async
        );
        handle.complete();
        assert_eq!(
            probe.change_state(Transition::ReadyToPaused),
            StateChangeResult::Success
        );
    }

    #[test]
    fn test_other_transitions_succeed() {
        let (mut probe, _handle) = AsyncProbe::new();
        assert_eq!(
            probe.change_state(Transition::NullToReady),
            StateChangeResult::Success
        );
        assert_eq!(
            probe.change_state(Transition::PausedToReady),
            StateChangeResult::Success
        );
    }
}
