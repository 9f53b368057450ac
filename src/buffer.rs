//! Data buffers flowing between elements.
//!
//! A [`Buffer`] is an owned byte payload with a sequence number. The heavy
//! lifting (shared memory, zero-copy pools) belongs to the media engine;
//! the coordination layer only needs a value that moves through the graph.

/// An owned chunk of media data with ordering metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer {
    data: Box<[u8]>,
    sequence: u64,
}

impl Buffer {
    /// Create a buffer from bytes and a sequence number.
    pub fn from_bytes(data: impl Into<Box<[u8]>>, sequence: u64) -> Self {
        Self {
            data: data.into(),
            sequence,
        }
    }

    /// Create an empty buffer with a sequence number.
    pub fn empty(sequence: u64) -> Self {
        Self {
            data: Box::default(),
            sequence,
        }
    }

    /// Get the payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_roundtrip() {
        let buf = Buffer::from_bytes(vec![1u8, 2, 3], 7);
        assert_eq!(buf.as_bytes(), &[1, 2, 3]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.sequence(), 7);
        assert!(!buf.is_empty());
        assert!(Buffer::empty(0).is_empty());
    }
}
