//! Integration tests for the offer/answer signaling exchange.
//!
//! Two local sessions negotiate through the structured exchange helpers,
//! with ICE candidates crossing in both directions and in both timing
//! regimes (before and after the remote description lands).

use conflux::signaling::exchange::{negotiate, shared, wire_candidates};
use conflux::signaling::{
    IceCandidate, NegotiationError, SessionState, SignalingSession,
};

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn lock(
    session: &conflux::signaling::exchange::SharedSession,
) -> std::sync::MutexGuard<'_, SignalingSession> {
    session.lock().unwrap()
}

/// Test the full call setup: negotiate, exchange candidates, connect.
#[tokio::test]
async fn test_call_setup_end_to_end() {
    init_tracing();
    let caller = shared(SignalingSession::new("caller"));
    let callee = shared(SignalingSession::new("callee"));
    wire_candidates(&caller, &callee);

    // Candidates gathered before the exchange must survive it.
    lock(&caller).emit_local_candidate(IceCandidate::new(0, "candidate:caller-0"));
    lock(&callee).emit_local_candidate(IceCandidate::new(0, "candidate:callee-0"));

    negotiate(&caller, &callee).await.unwrap();

    lock(&caller).emit_local_candidate(IceCandidate::new(1, "candidate:caller-1"));

    {
        let callee = lock(&callee);
        assert!(callee.descriptions_set());
        let applied: Vec<&str> = callee
            .applied_candidates()
            .iter()
            .map(|c| c.candidate.as_str())
            .collect();
        assert_eq!(applied, vec!["candidate:caller-0", "candidate:caller-1"]);
    }

    lock(&caller).mark_connected().unwrap();
    lock(&callee).mark_connected().unwrap();
    assert_eq!(lock(&caller).state(), SessionState::Connected);
    assert_eq!(lock(&callee).state(), SessionState::Connected);
}

/// Test that one peer's bad step leaves the other peer usable.
#[tokio::test]
async fn test_failed_step_is_isolated() {
    init_tracing();
    let caller = shared(SignalingSession::new("caller"));
    let callee = shared(SignalingSession::new("callee"));
    negotiate(&caller, &callee).await.unwrap();

    // The callee already answered; asking it to offer now must fail.
    assert!(matches!(
        lock(&callee).create_offer(),
        Err(NegotiationError::InvalidState { .. })
    ));

    // Neither session lost its negotiated state.
    assert!(lock(&caller).descriptions_set());
    assert!(lock(&callee).descriptions_set());
    lock(&caller).mark_connected().unwrap();
}
