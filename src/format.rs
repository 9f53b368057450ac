//! Media formats and capability sets for link negotiation.
//!
//! Elements declare what they produce and accept as a [`Caps`] value: an
//! ordered set of acceptable [`MediaFormat`]s. Linking two elements succeeds
//! only when their caps intersect. The full constraint-solving negotiation
//! (ranges, fixation, converter insertion) lives in the media engine and is
//! out of scope here; this module only answers "can these two ends agree on
//! a format at all".

use smallvec::SmallVec;

// ============================================================================
// Media formats
// ============================================================================

/// Media format - describes what flows across a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    /// Raw (uncompressed) video frames.
    RawVideo,
    /// Raw (uncompressed) audio samples.
    RawAudio,
    /// Encoded video.
    Video(VideoCodec),
    /// Encoded audio.
    Audio(AudioCodec),
    /// RTP packets with a given payload type.
    Rtp {
        /// RTP payload type (0-127).
        payload_type: u8,
    },
    /// Raw bytes (no format constraints, compatible with anything).
    Bytes,
}

impl MediaFormat {
    /// Check compatibility (can data flow between these formats?).
    ///
    /// Two formats are compatible if either is `Bytes` or they are equal.
    pub fn compatible(&self, other: &MediaFormat) -> bool {
        matches!((self, other), (Self::Bytes, _) | (_, Self::Bytes)) || self == other
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RawVideo => write!(f, "video/raw"),
            Self::RawAudio => write!(f, "audio/raw"),
            Self::Video(c) => write!(f, "video/{c:?}"),
            Self::Audio(c) => write!(f, "audio/{c:?}"),
            Self::Rtp { payload_type } => write!(f, "application/rtp(pt={payload_type})"),
            Self::Bytes => write!(f, "bytes"),
        }
    }
}

/// Video codecs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// VP8.
    Vp8,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
}

/// Audio codecs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AudioCodec {
    /// Opus.
    Opus,
    /// AAC.
    Aac,
    /// G.711 μ-law.
    Pcmu,
    /// G.711 A-law.
    Pcma,
}

// ============================================================================
// Caps (capability sets)
// ============================================================================

/// An element's capability set: the formats it can produce or accept.
///
/// The list is ordered by preference (first is best). An empty list means
/// "any format" - the element places no constraint on the link.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Caps {
    formats: SmallVec<[MediaFormat; 2]>,
}

impl Caps {
    /// Create caps that accept any format.
    pub fn any() -> Self {
        Self::default()
    }

    /// Create caps from a list of acceptable formats (preference order).
    pub fn new(formats: impl IntoIterator<Item = MediaFormat>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
        }
    }

    /// Create caps fixed to a single format.
    pub fn fixed(format: MediaFormat) -> Self {
        Self {
            formats: smallvec::smallvec![format],
        }
    }

    /// Check if this accepts any format (no constraints).
    pub fn is_any(&self) -> bool {
        self.formats.is_empty()
    }

    /// Check if this is fixed to exactly one format.
    pub fn is_fixed(&self) -> bool {
        self.formats.len() == 1
    }

    /// Get the acceptable formats (empty means any).
    pub fn formats(&self) -> &[MediaFormat] {
        &self.formats
    }

    /// Get the preferred (first) format, if constrained.
    pub fn preferred(&self) -> Option<&MediaFormat> {
        self.formats.first()
    }

    /// Check whether a concrete format is accepted.
    pub fn accepts(&self, format: &MediaFormat) -> bool {
        self.is_any() || self.formats.iter().any(|f| f.compatible(format))
    }

    /// Intersect two caps, keeping the preference order of `self`.
    ///
    /// Returns `None` if there is no common format.
    pub fn intersect(&self, other: &Self) -> Option<Caps> {
        if self.is_any() {
            return Some(other.clone());
        }
        if other.is_any() {
            return Some(self.clone());
        }
        let common: SmallVec<[MediaFormat; 2]> = self
            .formats
            .iter()
            .filter(|f| other.formats.iter().any(|g| f.compatible(g)))
            .copied()
            .collect();
        if common.is_empty() {
            None
        } else {
            Some(Caps { formats: common })
        }
    }

    /// Check if there is any common format between two caps.
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }
}

impl std::fmt::Display for Caps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_any() {
            return write!(f, "ANY");
        }
        for (i, format) in self.formats.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{format}")?;
        }
        Ok(())
    }
}

impl From<MediaFormat> for Caps {
    fn from(format: MediaFormat) -> Self {
        Self::fixed(format)
    }
}

impl FromIterator<MediaFormat> for Caps {
    fn from_iter<I: IntoIterator<Item = MediaFormat>>(iter: I) -> Self {
        Self::new(iter)
    }
}
