//! TestSource element for generating bounded test streams.

use crate::buffer::Buffer;
use crate::element::Source;
use crate::error::{Error, Result};
use crate::format::{Caps, MediaFormat};

/// Configuration for [`TestSource`], validated at construction.
#[derive(Debug, Clone)]
pub struct TestSourceConfig {
    /// Number of buffers to produce before end-of-stream.
    pub num_buffers: u64,
    /// Payload size per buffer in bytes.
    pub buffer_size: usize,
    /// Whether the source is live (cannot preroll).
    pub live: bool,
    /// Format declared on the output caps.
    pub format: MediaFormat,
}

impl Default for TestSourceConfig {
    fn default() -> Self {
        Self {
            num_buffers: 10,
            buffer_size: 64,
            live: false,
            format: MediaFormat::Bytes,
        }
    }
}

/// A source that produces a bounded stream of counter-filled buffers,
/// then signals end-of-stream.
pub struct TestSource {
    name: String,
    config: TestSourceConfig,
    sequence: u64,
}

impl TestSource {
    /// Create a new test source.
    ///
    /// Fails if the configuration is invalid (zero-sized payloads).
    pub fn new(config: TestSourceConfig) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(Error::InvalidConfig {
                element: "testsrc",
                reason: "buffer_size must be non-zero".into(),
            });
        }
        Ok(Self {
            name: "testsrc".to_string(),
            config,
            sequence: 0,
        })
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the number of buffers produced so far.
    pub fn buffers_produced(&self) -> u64 {
        self.sequence
    }
}

impl Source for TestSource {
    fn produce(&mut self) -> Result<Option<Buffer>> {
        if self.sequence >= self.config.num_buffers {
            return Ok(None);
        }
        let mut data = vec![0u8; self.config.buffer_size];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (self.sequence as usize + i) as u8;
        }
        let buffer = Buffer::from_bytes(data, self.sequence);
        self.sequence += 1;
        Ok(Some(buffer))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn output_caps(&self) -> Caps {
        Caps::fixed(self.config.format)
    }

    fn is_live(&self) -> bool {
        self.config.live
    }

    fn duration(&self) -> Option<u64> {
        (!self.config.live).then_some(self.config.num_buffers)
    }

    fn seek(&mut self, position: u64) -> bool {
        self.sequence = position.min(self.config.num_buffers);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_production() {
        let mut src = TestSource::new(TestSourceConfig {
            num_buffers: 3,
            buffer_size: 8,
            ..TestSourceConfig::default()
        })
        .unwrap();

        for seq in 0..3 {
            let buf = src.produce().unwrap().unwrap();
            assert_eq!(buf.sequence(), seq);
            assert_eq!(buf.len(), 8);
        }
        assert!(src.produce().unwrap().is_none());
        assert_eq!(src.buffers_produced(), 3);
    }

    #[test]
    fn test_zero_size_rejected() {
        let result = TestSource::new(TestSourceConfig {
            buffer_size: 0,
            ..TestSourceConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_seek_repositions_the_counter() {
        let mut src = TestSource::new(TestSourceConfig {
            num_buffers: 5,
            ..TestSourceConfig::default()
        })
        .unwrap();
        src.produce().unwrap();
        src.produce().unwrap();

        assert!(src.seek(1));
        assert_eq!(src.produce().unwrap().unwrap().sequence(), 1);

        // Past the end clamps straight to end-of-stream.
        assert!(src.seek(100));
        assert!(src.produce().unwrap().is_none());
    }

    #[test]
    fn test_duration_is_unknown_when_live() {
        let bounded = TestSource::new(TestSourceConfig {
            num_buffers: 7,
            ..TestSourceConfig::default()
        })
        .unwrap();
        assert_eq!(bounded.duration(), Some(7));

        let live = TestSource::new(TestSourceConfig {
            live: true,
            ..TestSourceConfig::default()
        })
        .unwrap();
        assert_eq!(live.duration(), None);
    }

    #[test]
    fn test_live_flag() {
        let src = TestSource::new(TestSourceConfig {
            live: true,
            ..TestSourceConfig::default()
        })
        .unwrap();
        assert!(src.is_live());
    }
}
