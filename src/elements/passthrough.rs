//! Pass-through elements.

use crate::buffer::Buffer;
use crate::element::Filter;
use crate::error::Result;
use crate::format::Caps;

/// A filter that passes buffers through unchanged.
#[derive(Default)]
pub struct PassThrough {
    name: String,
    buffers_seen: u64,
}

impl PassThrough {
    /// Create a new pass-through filter.
    pub fn new() -> Self {
        Self {
            name: "passthrough".to_string(),
            buffers_seen: 0,
        }
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the number of buffers that have passed through.
    pub fn buffers_seen(&self) -> u64 {
        self.buffers_seen
    }
}

impl Filter for PassThrough {
    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>> {
        self.buffers_seen += 1;
        Ok(Some(buffer))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A pass-through filter with fixed declared caps on both pads.
///
/// Used to constrain a link to a specific format, mirroring the engine's
/// caps-filter element. Linking fails if the neighbours cannot agree on
/// one of the declared formats.
pub struct CapsFilter {
    name: String,
    caps: Caps,
}

impl CapsFilter {
    /// Create a caps filter constraining both pads to `caps`.
    pub fn new(caps: Caps) -> Self {
        Self {
            name: "capsfilter".to_string(),
            caps,
        }
    }

    /// Set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the declared caps.
    pub fn caps(&self) -> &Caps {
        &self.caps
    }
}

impl Filter for CapsFilter {
    fn process(&mut self, buffer: Buffer) -> Result<Option<Buffer>> {
        Ok(Some(buffer))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn input_caps(&self) -> Caps {
        self.caps.clone()
    }

    fn output_caps(&self) -> Caps {
        self.caps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MediaFormat;

    #[test]
    fn test_passthrough_counts() {
        let mut filter = PassThrough::new();
        let out = filter.process(Buffer::from_bytes(vec![1u8], 0)).unwrap();
        assert!(out.is_some());
        assert_eq!(filter.buffers_seen(), 1);
    }

    #[test]
    fn test_capsfilter_declares_caps() {
        let filter = CapsFilter::new(Caps::fixed(MediaFormat::RawVideo));
        assert!(filter.input_caps().accepts(&MediaFormat::RawVideo));
        assert!(!filter.output_caps().accepts(&MediaFormat::RawAudio));
    }
}
