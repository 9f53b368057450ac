//! Structured offer/answer exchange between two sessions.
//!
//! Each negotiation step goes through a [`Reply`] so callers await plain
//! futures instead of stacking completion callbacks. The steps compose
//! into [`negotiate`], the whole round trip between two local sessions.

use super::error::NegotiationError;
use super::reply::{reply_pair, Reply};
use super::sdp::{IceCandidate, SessionDescription};
use super::session::{CallbackId, SignalingSession};
use std::sync::{Arc, Mutex, MutexGuard};

/// A session shared between the exchange helpers and its owner.
pub type SharedSession = Arc<Mutex<SignalingSession>>;

/// Wrap a session for sharing.
pub fn shared(session: SignalingSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}

fn lock(session: &SharedSession) -> MutexGuard<'_, SignalingSession> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

/// Ask a session for its offer.
pub fn request_offer(session: &SharedSession) -> Reply<SessionDescription> {
    let (slot, reply) = reply_pair();
    slot.complete(lock(session).create_offer());
    reply
}

/// Ask a session for its answer to the remote offer.
pub fn request_answer(session: &SharedSession) -> Reply<SessionDescription> {
    let (slot, reply) = reply_pair();
    slot.complete(lock(session).create_answer());
    reply
}

/// Install a local description through a reply.
pub fn apply_local(session: &SharedSession, description: SessionDescription) -> Reply<()> {
    let (slot, reply) = reply_pair();
    slot.complete(lock(session).set_local_description(description));
    reply
}

/// Install a remote description through a reply.
pub fn apply_remote(session: &SharedSession, description: SessionDescription) -> Reply<()> {
    let (slot, reply) = reply_pair();
    slot.complete(lock(session).set_remote_description(description));
    reply
}

/// Run the full offer/answer round trip between two sessions.
///
/// Offer created and installed on the offerer, delivered to the
/// answerer; answer created and installed on the answerer, delivered
/// back. A failing step stops the sequence for these two peers and is
/// logged; sessions elsewhere are unaffected.
pub async fn negotiate(
    offerer: &SharedSession,
    answerer: &SharedSession,
) -> Result<(), NegotiationError> {
    let result = run_round_trip(offerer, answerer).await;
    if let Err(error) = &result {
        tracing::warn!(%error, "negotiation aborted");
    }
    result
}

async fn run_round_trip(
    offerer: &SharedSession,
    answerer: &SharedSession,
) -> Result<(), NegotiationError> {
    let offer = request_offer(offerer).await?;
    apply_local(offerer, offer.clone()).await?;
    apply_remote(answerer, offer).await?;
    tracing::debug!("offer delivered");

    let answer = request_answer(answerer).await?;
    apply_local(answerer, answer.clone()).await?;
    apply_remote(offerer, answer).await?;
    tracing::info!("offer/answer exchange complete");
    Ok(())
}

/// Forward each side's local candidates into the other session.
///
/// Returns the two callback registrations, offerer side first, so the
/// caller can disconnect the wiring.
pub fn wire_candidates(a: &SharedSession, b: &SharedSession) -> (CallbackId, CallbackId) {
    let to_b = b.clone();
    let id_a = lock(a).on_ice_candidate(move |candidate: &IceCandidate| {
        lock(&to_b).add_ice_candidate(candidate.clone());
    });
    let to_a = a.clone();
    let id_b = lock(b).on_ice_candidate(move |candidate: &IceCandidate| {
        lock(&to_a).add_ice_candidate(candidate.clone());
    });
    (id_a, id_b)
}
