//! Minimal SDP descriptions and candidates.
//!
//! Just enough SDP to carry an offer/answer exchange between two
//! sessions: typed media specs rendered to text on the way out, media
//! sections recovered from text on the way in. Nothing here validates
//! full RFC 4566 grammar.

use super::error::NegotiationError;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Which half of the offer/answer exchange a description is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdpType {
    /// The initiating description.
    Offer,
    /// The responding description.
    Answer,
}

impl std::fmt::Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        })
    }
}

/// A typed SDP session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    kind: SdpType,
    sdp: String,
}

impl SessionDescription {
    /// Wrap existing SDP text.
    pub fn new(kind: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
        }
    }

    /// Render a fresh description for the given media.
    pub fn render(kind: SdpType, media: &[MediaSpec]) -> Self {
        let session_id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let setup = match kind {
            SdpType::Offer => "actpass",
            SdpType::Answer => "active",
        };
        let mut sdp = format!("v=0\r\no=- {session_id} 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n");
        for spec in media {
            sdp.push_str(&format!(
                "m={} 9 UDP/TLS/RTP/SAVPF {}\r\n",
                spec.kind, spec.payload_type
            ));
            sdp.push_str(&format!(
                "a=rtpmap:{} {}/{}\r\n",
                spec.payload_type, spec.encoding_name, spec.clock_rate
            ));
            sdp.push_str(&format!("a=setup:{setup}\r\n"));
        }
        Self { kind, sdp }
    }

    /// The description's type.
    pub fn kind(&self) -> SdpType {
        self.kind
    }

    /// The SDP text.
    pub fn sdp(&self) -> &str {
        &self.sdp
    }

    /// Recover the typed media sections from the SDP text.
    pub fn media_specs(&self) -> Result<Vec<MediaSpec>, NegotiationError> {
        parse_media_specs(&self.sdp)
    }
}

/// An ICE candidate as exchanged over signaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    /// Index of the media section this candidate belongs to.
    pub sdp_mline_index: u32,
    /// The candidate line.
    pub candidate: String,
}

impl IceCandidate {
    /// Create a candidate.
    pub fn new(sdp_mline_index: u32, candidate: impl Into<String>) -> Self {
        Self {
            sdp_mline_index,
            candidate: candidate.into(),
        }
    }
}

/// The media kind of an SDP section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// An audio section.
    Audio,
    /// A video section.
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Audio => "audio",
            Self::Video => "video",
        })
    }
}

/// One media section of a description, in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSpec {
    /// Audio or video.
    pub kind: MediaKind,
    /// RTP payload type number.
    pub payload_type: u8,
    /// Encoding name as it appears in `a=rtpmap`.
    pub encoding_name: String,
    /// RTP clock rate.
    pub clock_rate: u32,
}

impl MediaSpec {
    /// Opus audio at the conventional dynamic payload type.
    pub fn opus() -> Self {
        Self {
            kind: MediaKind::Audio,
            payload_type: 111,
            encoding_name: "opus".to_string(),
            clock_rate: 48_000,
        }
    }

    /// VP8 video at the conventional dynamic payload type.
    pub fn vp8() -> Self {
        Self {
            kind: MediaKind::Video,
            payload_type: 96,
            encoding_name: "VP8".to_string(),
            clock_rate: 90_000,
        }
    }
}

fn parse_media_specs(sdp: &str) -> Result<Vec<MediaSpec>, NegotiationError> {
    if !sdp.starts_with("v=0") {
        return Err(NegotiationError::InvalidSdp(
            "missing v=0 version line".to_string(),
        ));
    }

    let mut specs: Vec<MediaSpec> = Vec::new();
    for line in sdp.lines() {
        if let Some(rest) = line.strip_prefix("m=") {
            let mut parts = rest.split_whitespace();
            let kind = match parts.next() {
                Some("audio") => MediaKind::Audio,
                Some("video") => MediaKind::Video,
                other => {
                    return Err(NegotiationError::InvalidSdp(format!(
                        "unsupported media kind {other:?}"
                    )))
                }
            };
            let payload_type = parts
                .last()
                .and_then(|p| p.parse::<u8>().ok())
                .ok_or_else(|| {
                    NegotiationError::InvalidSdp(format!("no payload type in m= line {rest:?}"))
                })?;
            specs.push(MediaSpec {
                kind,
                payload_type,
                encoding_name: String::new(),
                clock_rate: 0,
            });
        } else if let Some(rest) = line.strip_prefix("a=rtpmap:") {
            let Some(current) = specs.last_mut() else {
                return Err(NegotiationError::InvalidSdp(
                    "rtpmap before any m= line".to_string(),
                ));
            };
            // "a=rtpmap:<pt> <encoding>/<clock>"
            let (_, mapping) = rest.split_once(' ').ok_or_else(|| {
                NegotiationError::InvalidSdp(format!("malformed rtpmap {rest:?}"))
            })?;
            let (encoding, clock) = mapping.split_once('/').ok_or_else(|| {
                NegotiationError::InvalidSdp(format!("malformed rtpmap {rest:?}"))
            })?;
            current.encoding_name = encoding.to_string();
            current.clock_rate = clock.trim().parse().map_err(|_| {
                NegotiationError::InvalidSdp(format!("bad clock rate in {rest:?}"))
            })?;
        }
    }

    if specs.is_empty() {
        return Err(NegotiationError::InvalidSdp(
            "no media sections".to_string(),
        ));
    }
    Ok(specs)
}
