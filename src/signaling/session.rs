//! Offer/answer signaling session.

use super::error::NegotiationError;
use super::sdp::{IceCandidate, MediaSpec, SdpType, SessionDescription};

type NegotiationResult<T> = Result<T, NegotiationError>;

/// Lifecycle of a signaling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No description set yet.
    #[default]
    Created,
    /// An offer has been set (locally or remotely); waiting for the
    /// answer.
    OfferSet,
    /// Both descriptions are in place.
    AnswerSet,
    /// The transport confirmed connectivity.
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::OfferSet => "offer-set",
            Self::AnswerSet => "answer-set",
            Self::Connected => "connected",
        })
    }
}

/// Which side of the exchange this session is.
///
/// Fixed by the first description activity and never changed after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This session initiates with an offer.
    Offerer,
    /// This session responds with an answer.
    Answerer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Offerer => "offerer",
            Self::Answerer => "answerer",
        })
    }
}

/// Handle to a registered session callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type NegotiationNeededCallback = Box<dyn FnMut() + Send>;
type IceCandidateCallback = Box<dyn FnMut(&IceCandidate) + Send>;

/// One peer's side of an SDP offer/answer negotiation.
///
/// The session tracks local and remote descriptions, fixes its role on
/// the first description activity, and buffers ICE candidates that
/// arrive before the remote description so none are lost.
pub struct SignalingSession {
    name: String,
    media: Vec<MediaSpec>,
    state: SessionState,
    role: Option<Role>,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    buffered: Vec<IceCandidate>,
    applied: Vec<IceCandidate>,
    next_callback_id: u64,
    on_negotiation_needed: Vec<(CallbackId, NegotiationNeededCallback)>,
    on_ice_candidate: Vec<(CallbackId, IceCandidateCallback)>,
}

impl SignalingSession {
    /// Create a session offering Opus audio and VP8 video.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media: vec![MediaSpec::opus(), MediaSpec::vp8()],
            state: SessionState::Created,
            role: None,
            local: None,
            remote: None,
            buffered: Vec::new(),
            applied: Vec::new(),
            next_callback_id: 0,
            on_negotiation_needed: Vec::new(),
            on_ice_candidate: Vec::new(),
        }
    }

    /// Replace the media this session will offer.
    pub fn with_media(mut self, media: Vec<MediaSpec>) -> Self {
        self.media = media;
        self
    }

    /// Get the session's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The committed role, once fixed.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// The local description, if set.
    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    /// The remote description, if set.
    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote.as_ref()
    }

    /// Whether both descriptions are in place.
    pub fn descriptions_set(&self) -> bool {
        self.local.is_some() && self.remote.is_some()
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    fn next_id(&mut self) -> CallbackId {
        let id = CallbackId(self.next_callback_id);
        self.next_callback_id += 1;
        id
    }

    /// Register a callback fired when negotiation should start.
    pub fn on_negotiation_needed(&mut self, callback: impl FnMut() + Send + 'static) -> CallbackId {
        let id = self.next_id();
        self.on_negotiation_needed.push((id, Box::new(callback)));
        id
    }

    /// Register a callback fired for every locally gathered candidate.
    pub fn on_ice_candidate(
        &mut self,
        callback: impl FnMut(&IceCandidate) + Send + 'static,
    ) -> CallbackId {
        let id = self.next_id();
        self.on_ice_candidate.push((id, Box::new(callback)));
        id
    }

    /// Unregister a callback. Returns whether it was registered.
    pub fn disconnect(&mut self, id: CallbackId) -> bool {
        let before = self.on_negotiation_needed.len() + self.on_ice_candidate.len();
        self.on_negotiation_needed.retain(|(cb_id, _)| *cb_id != id);
        self.on_ice_candidate.retain(|(cb_id, _)| *cb_id != id);
        before != self.on_negotiation_needed.len() + self.on_ice_candidate.len()
    }

    /// Announce that negotiation should start, firing the registered
    /// negotiation-needed callbacks.
    ///
    /// Stands in for the transport signaling that its pads are ready.
    pub fn request_negotiation(&mut self) {
        tracing::debug!(session = %self.name, "negotiation needed");
        for (_, callback) in &mut self.on_negotiation_needed {
            callback();
        }
    }

    /// Announce a locally gathered candidate, firing the registered
    /// candidate callbacks.
    pub fn emit_local_candidate(&mut self, candidate: IceCandidate) {
        tracing::trace!(
            session = %self.name,
            mline = candidate.sdp_mline_index,
            "local candidate"
        );
        for (_, callback) in &mut self.on_ice_candidate {
            callback(&candidate);
        }
    }

    // ------------------------------------------------------------------
    // Descriptions
    // ------------------------------------------------------------------

    /// Create this session's offer.
    ///
    /// Only valid before any description is set; fixes the role to
    /// offerer. The returned description still has to be installed via
    /// [`SignalingSession::set_local_description`].
    pub fn create_offer(&mut self) -> NegotiationResult<SessionDescription> {
        if self.state != SessionState::Created {
            return Err(NegotiationError::InvalidState {
                operation: "create an offer",
                state: self.state,
            });
        }
        self.role = Some(Role::Offerer);
        let offer = SessionDescription::render(SdpType::Offer, &self.media);
        tracing::debug!(session = %self.name, "offer created");
        Ok(offer)
    }

    /// Create the answer to the remote offer.
    ///
    /// Requires the remote offer to be set; the answer mirrors the
    /// offer's media sections.
    pub fn create_answer(&mut self) -> NegotiationResult<SessionDescription> {
        let remote = match &self.remote {
            Some(desc) if desc.kind() == SdpType::Offer => desc,
            _ => {
                return Err(NegotiationError::InvalidState {
                    operation: "create an answer without a remote offer",
                    state: self.state,
                })
            }
        };
        let media = remote.media_specs()?;
        let answer = SessionDescription::render(SdpType::Answer, &media);
        tracing::debug!(session = %self.name, "answer created");
        Ok(answer)
    }

    /// Install the local description.
    ///
    /// Re-setting the identical description is accepted; replacing a
    /// different one fails with
    /// [`NegotiationError::DescriptionConflict`].
    pub fn set_local_description(
        &mut self,
        description: SessionDescription,
    ) -> NegotiationResult<()> {
        if let Some(existing) = &self.local {
            return if *existing == description {
                Ok(())
            } else {
                Err(NegotiationError::DescriptionConflict { side: "local" })
            };
        }

        let implied = match description.kind() {
            SdpType::Offer => Role::Offerer,
            SdpType::Answer => Role::Answerer,
        };
        self.check_role("local", description.kind(), implied)?;
        if description.kind() == SdpType::Answer && self.remote.is_none() {
            return Err(NegotiationError::InvalidState {
                operation: "set a local answer without a remote offer",
                state: self.state,
            });
        }

        self.role = Some(implied);
        tracing::info!(
            session = %self.name,
            kind = %description.kind(),
            "local description set"
        );
        self.local = Some(description);
        self.advance_state();
        Ok(())
    }

    /// Install the remote description.
    ///
    /// Setting it releases every buffered candidate, in arrival order.
    /// Idempotency matches [`SignalingSession::set_local_description`].
    pub fn set_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> NegotiationResult<()> {
        if let Some(existing) = &self.remote {
            return if *existing == description {
                Ok(())
            } else {
                Err(NegotiationError::DescriptionConflict { side: "remote" })
            };
        }

        let implied = match description.kind() {
            SdpType::Offer => Role::Answerer,
            SdpType::Answer => Role::Offerer,
        };
        self.check_role("remote", description.kind(), implied)?;
        if description.kind() == SdpType::Answer && self.local.is_none() {
            return Err(NegotiationError::InvalidState {
                operation: "set a remote answer without a local offer",
                state: self.state,
            });
        }

        self.role = Some(implied);
        tracing::info!(
            session = %self.name,
            kind = %description.kind(),
            "remote description set"
        );
        self.remote = Some(description);
        self.advance_state();

        if !self.buffered.is_empty() {
            tracing::debug!(
                session = %self.name,
                count = self.buffered.len(),
                "applying buffered candidates"
            );
            self.applied.append(&mut self.buffered);
        }
        Ok(())
    }

    fn check_role(
        &self,
        side: &'static str,
        got: SdpType,
        implied: Role,
    ) -> NegotiationResult<()> {
        match self.role {
            Some(role) if role != implied => {
                Err(NegotiationError::RoleMismatch { side, got, role })
            }
            _ => Ok(()),
        }
    }

    fn advance_state(&mut self) {
        if self.state == SessionState::Connected {
            return;
        }
        self.state = if self.descriptions_set() {
            SessionState::AnswerSet
        } else if self.local.is_some() || self.remote.is_some() {
            SessionState::OfferSet
        } else {
            SessionState::Created
        };
    }

    // ------------------------------------------------------------------
    // Candidates
    // ------------------------------------------------------------------

    /// Take in a candidate from the remote peer.
    ///
    /// Candidates arriving before the remote description are buffered
    /// and applied, still in arrival order, once it is set. None are
    /// dropped.
    pub fn add_ice_candidate(&mut self, candidate: IceCandidate) {
        if self.remote.is_some() {
            self.applied.push(candidate);
        } else {
            tracing::trace!(
                session = %self.name,
                mline = candidate.sdp_mline_index,
                "buffering candidate until remote description"
            );
            self.buffered.push(candidate);
        }
    }

    /// Candidates handed to the transport so far, in application order.
    pub fn applied_candidates(&self) -> &[IceCandidate] {
        &self.applied
    }

    /// Number of candidates still waiting for the remote description.
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Record that the transport reached connectivity.
    ///
    /// Only valid once both descriptions are set.
    pub fn mark_connected(&mut self) -> NegotiationResult<()> {
        if !self.descriptions_set() {
            return Err(NegotiationError::InvalidState {
                operation: "mark the session connected",
                state: self.state,
            });
        }
        tracing::info!(session = %self.name, "connected");
        self.state = SessionState::Connected;
        Ok(())
    }
}

impl std::fmt::Debug for SignalingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingSession")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("role", &self.role)
            .field("buffered", &self.buffered.len())
            .field("applied", &self.applied.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiated_pair() -> (SignalingSession, SignalingSession) {
        let mut caller = SignalingSession::new("caller");
        let mut callee = SignalingSession::new("callee");

        let offer = caller.create_offer().unwrap();
        caller.set_local_description(offer.clone()).unwrap();
        callee.set_remote_description(offer).unwrap();

        let answer = callee.create_answer().unwrap();
        callee.set_local_description(answer.clone()).unwrap();
        caller.set_remote_description(answer).unwrap();

        (caller, callee)
    }

    #[test]
    fn test_offer_answer_round_trip() {
        let (caller, callee) = negotiated_pair();

        assert!(caller.descriptions_set());
        assert!(callee.descriptions_set());
        assert_eq!(caller.role(), Some(Role::Offerer));
        assert_eq!(callee.role(), Some(Role::Answerer));
        assert_eq!(caller.state(), SessionState::AnswerSet);

        // Each side holds the other's description.
        assert_eq!(
            caller.local_description().unwrap(),
            callee.remote_description().unwrap()
        );
        assert_eq!(
            caller.remote_description().unwrap(),
            callee.local_description().unwrap()
        );
    }

    #[test]
    fn test_early_candidates_applied_in_arrival_order() {
        let mut caller = SignalingSession::new("caller");
        let mut callee = SignalingSession::new("callee");

        for i in 0..3 {
            callee.add_ice_candidate(IceCandidate::new(i, format!("candidate:{i}")));
        }
        assert_eq!(callee.buffered_len(), 3);
        assert!(callee.applied_candidates().is_empty());

        let offer = caller.create_offer().unwrap();
        caller.set_local_description(offer.clone()).unwrap();
        callee.set_remote_description(offer).unwrap();

        assert_eq!(callee.buffered_len(), 0);
        let applied: Vec<u32> = callee
            .applied_candidates()
            .iter()
            .map(|c| c.sdp_mline_index)
            .collect();
        assert_eq!(applied, vec![0, 1, 2]);

        // Late candidates go straight through, after the buffered ones.
        callee.add_ice_candidate(IceCandidate::new(9, "candidate:late"));
        assert_eq!(callee.applied_candidates().len(), 4);
        assert_eq!(callee.applied_candidates()[3].sdp_mline_index, 9);
    }

    #[test]
    fn test_create_offer_only_once() {
        let mut session = SignalingSession::new("caller");
        let offer = session.create_offer().unwrap();
        session.set_local_description(offer).unwrap();
        assert!(matches!(
            session.create_offer(),
            Err(NegotiationError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_answer_requires_remote_offer() {
        let mut session = SignalingSession::new("callee");
        assert!(matches!(
            session.create_answer(),
            Err(NegotiationError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_role_is_fixed_by_first_activity() {
        let mut caller = SignalingSession::new("caller");
        let offer = caller.create_offer().unwrap();
        caller.set_local_description(offer).unwrap();

        // An offerer cannot also receive an offer.
        let foreign = SessionDescription::render(SdpType::Offer, &[MediaSpec::opus()]);
        assert!(matches!(
            caller.set_remote_description(foreign),
            Err(NegotiationError::RoleMismatch { .. })
        ));
    }

    #[test]
    fn test_identical_reset_is_idempotent() {
        let (mut caller, _callee) = negotiated_pair();
        let local = caller.local_description().unwrap().clone();
        caller.set_local_description(local).unwrap();
    }

    #[test]
    fn test_different_description_conflicts() {
        let (mut caller, _callee) = negotiated_pair();
        let other = SessionDescription::render(SdpType::Offer, &[MediaSpec::opus()]);
        assert!(matches!(
            caller.set_local_description(other),
            Err(NegotiationError::DescriptionConflict { side: "local" })
        ));
    }

    #[test]
    fn test_connect_requires_descriptions() {
        let mut session = SignalingSession::new("caller");
        assert!(matches!(
            session.mark_connected(),
            Err(NegotiationError::InvalidState { .. })
        ));

        let (mut caller, _callee) = negotiated_pair();
        caller.mark_connected().unwrap();
        assert_eq!(caller.state(), SessionState::Connected);
    }

    #[test]
    fn test_candidate_callback_fires_and_disconnects() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut session = SignalingSession::new("caller");
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = session.on_ice_candidate(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.emit_local_candidate(IceCandidate::new(0, "candidate:a"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(session.disconnect(id));
        session.emit_local_candidate(IceCandidate::new(0, "candidate:b"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_negotiation_needed_fires() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let mut session = SignalingSession::new("caller");
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        session.on_negotiation_needed(move || flag.store(true, Ordering::SeqCst));
        session.request_negotiation();
        assert!(fired.load(Ordering::SeqCst));
    }
}
