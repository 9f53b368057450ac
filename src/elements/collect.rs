//! CollectSink element for observing pipeline output in tests.

use crate::buffer::Buffer;
use crate::element::Sink;
use crate::error::Result;
use crate::format::Caps;
use std::sync::{Arc, Mutex};

/// Shared handle to the buffers a [`CollectSink`] has received.
#[derive(Clone, Default)]
pub struct CollectedBuffers {
    inner: Arc<Mutex<Vec<Buffer>>>,
}

impl CollectedBuffers {
    /// Get the sequence numbers received so far, in arrival order.
    pub fn sequences(&self) -> Vec<u64> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|b| b.sequence())
            .collect()
    }

    /// Get the number of buffers received.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check if nothing has been received yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, buffer: Buffer) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(buffer);
    }
}

/// A sink that stores every received buffer behind a shared handle.
pub struct CollectSink {
    name: String,
    collected: CollectedBuffers,
    caps: Caps,
}

impl CollectSink {
    /// Create a collect sink and the handle observing it.
    pub fn new() -> (Self, CollectedBuffers) {
        let collected = CollectedBuffers::default();
        let sink = Self {
            name: "collectsink".to_string(),
            collected: collected.clone(),
            caps: Caps::any(),
        };
        (sink, collected)
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Constrain the declared input caps.
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }
}

impl Sink for CollectSink {
    fn consume(&mut self, buffer: Buffer) -> Result<()> {
        self.collected.push(buffer);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_caps(&self) -> Caps {
        self.caps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let (mut sink, collected) = CollectSink::new();
        for seq in [3u64, 1, 2] {
            sink.consume(Buffer::empty(seq)).unwrap();
        }
        assert_eq!(collected.sequences(), vec![3, 1, 2]);
        assert_eq!(collected.len(), 3);
    }
}
