//! One-shot async reply objects for negotiation steps.

use super::error::NegotiationError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Create a linked reply pair.
///
/// The [`ReplySlot`] goes to whoever performs the work; the [`Reply`] is
/// awaited by the requester. Each side is single-use.
pub fn reply_pair<T>() -> (ReplySlot<T>, Reply<T>) {
    let (tx, rx) = oneshot::channel();
    (ReplySlot { sender: tx }, Reply { receiver: rx })
}

/// The fulfilling half of a reply pair.
///
/// Fulfilling after the [`Reply`] was dropped is a silent no-op: a stale
/// completion must never fail the worker.
pub struct ReplySlot<T> {
    sender: oneshot::Sender<Result<T, NegotiationError>>,
}

impl<T> ReplySlot<T> {
    /// Complete the reply with a value.
    pub fn fulfill(self, value: T) {
        let _ = self.sender.send(Ok(value));
    }

    /// Complete the reply with an error.
    pub fn fail(self, error: NegotiationError) {
        let _ = self.sender.send(Err(error));
    }

    /// Complete the reply from a result.
    pub fn complete(self, result: Result<T, NegotiationError>) {
        let _ = self.sender.send(result);
    }
}

/// The awaiting half of a reply pair.
///
/// Resolves to the fulfilled value, the worker's error, or
/// [`NegotiationError::ReplyDropped`] when the slot was dropped without
/// completing.
pub struct Reply<T> {
    receiver: oneshot::Receiver<Result<T, NegotiationError>>,
}

impl<T> Future for Reply<T> {
    type Output = Result<T, NegotiationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(NegotiationError::ReplyDropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fulfilled_reply_resolves() {
        let (slot, reply) = reply_pair();
        slot.fulfill(7u32);
        assert_eq!(reply.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_failed_reply_carries_error() {
        let (slot, reply) = reply_pair::<u32>();
        slot.fail(NegotiationError::InvalidSdp("nope".to_string()));
        assert!(matches!(
            reply.await,
            Err(NegotiationError::InvalidSdp(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_slot_reports_reply_dropped() {
        let (slot, reply) = reply_pair::<u32>();
        drop(slot);
        assert_eq!(reply.await, Err(NegotiationError::ReplyDropped));
    }

    #[tokio::test]
    async fn test_stale_fulfillment_is_silent() {
        let (slot, reply) = reply_pair();
        drop(reply);
        // Must not panic or error.
        slot.fulfill(1u32);
    }
}
