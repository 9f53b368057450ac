//! Async stream adapter over a bus watch.

use super::{Bus, Message, WatchGuard};
use crate::error::BusError;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// An async stream of bus messages.
///
/// Internally registers a watch that forwards every message into a
/// channel, so creating a stream claims the bus's watch delivery path.
/// Dropping the stream unregisters the watch.
pub struct BusStream {
    receiver: mpsc::UnboundedReceiver<Message>,
    _guard: WatchGuard,
}

impl Bus {
    /// Create an async stream of this bus's messages.
    ///
    /// Fails like [`Bus::add_watch`] if the delivery path is taken.
    pub fn stream(self: &Arc<Self>) -> Result<BusStream, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let guard = self.add_watch(0, move |msg| tx.send(msg).is_ok())?;
        Ok(BusStream {
            receiver: rx,
            _guard: guard,
        })
    }
}

impl futures::Stream for BusStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
