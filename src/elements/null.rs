//! NullSink element.

use crate::buffer::Buffer;
use crate::element::Sink;
use crate::error::Result;

/// A sink that discards all buffers.
#[derive(Default)]
pub struct NullSink {
    name: String,
    buffers_discarded: u64,
}

impl NullSink {
    /// Create a new null sink.
    pub fn new() -> Self {
        Self {
            name: "nullsink".to_string(),
            buffers_discarded: 0,
        }
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the number of buffers discarded.
    pub fn buffers_discarded(&self) -> u64 {
        self.buffers_discarded
    }
}

impl Sink for NullSink {
    fn consume(&mut self, _buffer: Buffer) -> Result<()> {
        self.buffers_discarded += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discards() {
        let mut sink = NullSink::new();
        sink.consume(Buffer::from_bytes(vec![1u8, 2], 0)).unwrap();
        sink.consume(Buffer::empty(1)).unwrap();
        assert_eq!(sink.buffers_discarded(), 2);
    }
}
