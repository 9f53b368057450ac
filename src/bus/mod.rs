//! Message bus: ordered delivery of asynchronous pipeline notifications.
//!
//! A [`Bus`] belongs to exactly one pipeline and carries [`Message`]s in
//! FIFO order to a single consumer. Two delivery paths exist, and each bus
//! instance commits to exactly one per run:
//!
//! - **polling**: [`Bus::timed_pop_filtered`] blocks a dedicated waiting
//!   thread with a kind mask and an explicit timeout, returning `None` on
//!   expiry (a sentinel, never an error)
//! - **watch**: [`Bus::add_watch`] registers a callback invoked for every
//!   posted message by the posting thread (standing in for the external
//!   run loop); returning `false` unregisters it
//!
//! Attempting the second path after the first is in use fails with
//! [`BusError::DeliveryModeConflict`].

mod stream;

pub use stream::BusStream;

use crate::error::BusError;
use crate::pipeline::State;
use bitflags::bitflags;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

// ============================================================================
// Messages
// ============================================================================

bitflags! {
    /// Bitmask of interesting message kinds for filtered pops.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MessageMask: u32 {
        /// `StateChanged` messages.
        const STATE_CHANGED = 1 << 0;
        /// `Error` messages.
        const ERROR = 1 << 1;
        /// `Eos` messages.
        const EOS = 1 << 2;
        /// `Application` messages.
        const APPLICATION = 1 << 3;
    }
}

impl MessageMask {
    /// Mask matching every message kind.
    pub const ANY: MessageMask = MessageMask::all();
}

/// Payload of a bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// A pipeline (or element) completed a state transition.
    StateChanged {
        /// Previous state.
        old: State,
        /// New current state.
        new: State,
        /// Target still being walked toward, if the request has not
        /// finished yet.
        pending: Option<State>,
    },
    /// A terminal error for the current pipeline run.
    Error {
        /// Engine error code.
        code: i32,
        /// Human-readable description.
        description: String,
    },
    /// End of stream: all sources are exhausted.
    Eos,
    /// Application-defined payload, posted by the caller.
    Application {
        /// Opaque payload bytes.
        payload: Vec<u8>,
    },
}

impl MessageKind {
    /// The mask bit this kind matches.
    pub fn mask(&self) -> MessageMask {
        match self {
            Self::StateChanged { .. } => MessageMask::STATE_CHANGED,
            Self::Error { .. } => MessageMask::ERROR,
            Self::Eos => MessageMask::EOS,
            Self::Application { .. } => MessageMask::APPLICATION,
        }
    }
}

/// A message on the bus.
///
/// Immutable once posted; ownership transfers to the consumer on pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    src: String,
    seq: u64,
    kind: MessageKind,
}

impl Message {
    /// Name of the element (or pipeline) that posted this message.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Monotonic per-bus sequence number, assigned at post time.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The message payload.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Consume the message, returning its payload.
    pub fn into_kind(self) -> MessageKind {
        self.kind
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MessageKind::StateChanged { old, new, pending } => {
                write!(f, "StateChanged from {}: {old} -> {new}", self.src)?;
                if let Some(p) = pending {
                    write!(f, " (pending {p})")?;
                }
                Ok(())
            }
            MessageKind::Error { code, description } => {
                write!(f, "Error from {}: {description} (code {code})", self.src)
            }
            MessageKind::Eos => write!(f, "EOS from {}", self.src),
            MessageKind::Application { payload } => {
                write!(f, "Application from {} ({} bytes)", self.src, payload.len())
            }
        }
    }
}

// ============================================================================
// Bus
// ============================================================================

/// Which delivery path the bus has committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DeliveryMode {
    #[default]
    Unset,
    Polling,
    Watching,
}

type WatchCallback = Box<dyn FnMut(Message) -> bool + Send>;

struct Watch {
    id: u64,
    callback: WatchCallback,
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<Message>,
    mode: DeliveryMode,
    watch: Option<Watch>,
}

/// The message bus of a pipeline.
pub struct Bus {
    inner: Mutex<Inner>,
    cond: Condvar,
    next_seq: AtomicU64,
    next_watch_id: AtomicU64,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            cond: Condvar::new(),
            next_seq: AtomicU64::new(0),
            next_watch_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Posting
    // ------------------------------------------------------------------

    /// Post a message to the bus.
    ///
    /// With a watch registered, the callback runs immediately on the
    /// posting thread; otherwise the message is queued for a poller.
    pub fn post(&self, src: impl Into<String>, kind: MessageKind) {
        let msg = Message {
            src: src.into(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            kind,
        };
        tracing::trace!(message = %msg, "bus post");

        let mut inner = self.lock();
        match inner.watch.take() {
            Some(watch) => {
                // Dispatch outside the lock so the callback may use the bus.
                drop(inner);
                self.dispatch(watch, msg);
            }
            None if inner.mode == DeliveryMode::Watching => {
                // The watch is mid-dispatch on another thread; it drains
                // the queue before re-registering.
                inner.queue.push_back(msg);
            }
            None => {
                inner.queue.push_back(msg);
                drop(inner);
                self.cond.notify_all();
            }
        }
    }

    /// Run the watch over `msg` and everything that queued up behind it
    /// while the callback was in flight, then re-register it.
    ///
    /// The watch stays out of `inner` for the whole dispatch, so posts
    /// from other threads land in the queue and are drained here; none
    /// are lost and FIFO order holds.
    fn dispatch(&self, mut watch: Watch, msg: Message) {
        let mut keep = (watch.callback)(msg);
        loop {
            let mut inner = self.lock();
            if !keep {
                inner.mode = DeliveryMode::Unset;
                return;
            }
            if inner.mode != DeliveryMode::Watching || inner.watch.is_some() {
                // The guard removed this watch while the callback ran.
                return;
            }
            match inner.queue.pop_front() {
                Some(next) => {
                    drop(inner);
                    keep = (watch.callback)(next);
                }
                None => {
                    inner.watch = Some(watch);
                    return;
                }
            }
        }
    }

    /// Post a state-changed message.
    pub fn post_state_changed(
        &self,
        src: impl Into<String>,
        old: State,
        new: State,
        pending: Option<State>,
    ) {
        self.post(src, MessageKind::StateChanged { old, new, pending });
    }

    /// Post an error message.
    pub fn post_error(&self, src: impl Into<String>, code: i32, description: impl Into<String>) {
        self.post(
            src,
            MessageKind::Error {
                code,
                description: description.into(),
            },
        );
    }

    /// Post an end-of-stream message.
    pub fn post_eos(&self, src: impl Into<String>) {
        self.post(src, MessageKind::Eos);
    }

    /// Post an application-defined message.
    pub fn post_application(&self, src: impl Into<String>, payload: Vec<u8>) {
        self.post(src, MessageKind::Application { payload });
    }

    // ------------------------------------------------------------------
    // Polling delivery
    // ------------------------------------------------------------------

    /// Pop the next message whose kind matches `mask`, waiting up to
    /// `timeout`.
    ///
    /// - `Some(Duration::ZERO)`: one check of the queue, no waiting
    /// - `Some(d)`: block up to `d`, then return `Ok(None)` (sentinel)
    /// - `None`: block until a matching message arrives
    ///
    /// Queued messages whose kind is outside `mask` are discarded as they
    /// are passed over, matching the engine contract.
    ///
    /// Fails with [`BusError::DeliveryModeConflict`] if a watch owns this
    /// bus's delivery.
    pub fn timed_pop_filtered(
        &self,
        mask: MessageMask,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>, BusError> {
        let mut inner = self.lock();
        match inner.mode {
            DeliveryMode::Watching => {
                return Err(BusError::DeliveryModeConflict {
                    active: "watch",
                    requested: "polling",
                })
            }
            DeliveryMode::Unset => inner.mode = DeliveryMode::Polling,
            DeliveryMode::Polling => {}
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            while let Some(msg) = inner.queue.pop_front() {
                if mask.contains(msg.kind.mask()) {
                    return Ok(Some(msg));
                }
                tracing::trace!(message = %msg, "discarding unfiltered message");
            }

            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    let (guard, _timed_out) = self
                        .cond
                        .wait_timeout(inner, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    inner = guard;
                }
                None => {
                    inner = self.cond.wait(inner).unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Pop the next message of any kind, waiting up to `timeout`.
    pub fn timed_pop(&self, timeout: Option<Duration>) -> Result<Option<Message>, BusError> {
        self.timed_pop_filtered(MessageMask::ANY, timeout)
    }

    // ------------------------------------------------------------------
    // Watch delivery
    // ------------------------------------------------------------------

    /// Register a watch callback, claiming this bus's delivery path.
    ///
    /// The callback is invoked for every posted message until it returns
    /// `false` or the returned [`WatchGuard`] is dropped. The `priority`
    /// is the run-loop dispatch hint of the engine contract; with one
    /// watch per bus it is recorded in the log only.
    ///
    /// Fails with [`BusError::DeliveryModeConflict`] if the bus is already
    /// polled, or [`BusError::WatchExists`] if a watch is registered.
    pub fn add_watch(
        self: &Arc<Self>,
        priority: i32,
        callback: impl FnMut(Message) -> bool + Send + 'static,
    ) -> Result<WatchGuard, BusError> {
        let mut inner = self.lock();
        match inner.mode {
            DeliveryMode::Polling => {
                return Err(BusError::DeliveryModeConflict {
                    active: "polling",
                    requested: "watch",
                })
            }
            DeliveryMode::Watching => return Err(BusError::WatchExists),
            DeliveryMode::Unset => {}
        }
        let id = self.next_watch_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id, priority, "watch registered");
        inner.mode = DeliveryMode::Watching;
        inner.watch = Some(Watch {
            id,
            callback: Box::new(callback),
        });
        Ok(WatchGuard {
            bus: Arc::downgrade(self),
            id,
        })
    }

    fn remove_watch(&self, id: u64) {
        let mut inner = self.lock();
        if inner.watch.as_ref().is_some_and(|w| w.id == id) {
            inner.watch = None;
        }
        // Release the delivery path whether the callback already
        // unregistered itself or the guard did.
        if inner.mode == DeliveryMode::Watching && inner.watch.is_none() {
            inner.mode = DeliveryMode::Unset;
        }
    }

    /// Number of messages currently queued (polling mode only).
    pub fn queued_len(&self) -> usize {
        self.lock().queue.len()
    }
}

/// Unregisters a bus watch when dropped, tying the watch's lifetime to
/// its owner.
pub struct WatchGuard {
    bus: Weak<Bus>,
    id: u64,
}

impl WatchGuard {
    /// Unregister the watch explicitly.
    pub fn remove(self) {
        // Drop does the work.
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_watch(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fifo_order() {
        let bus = Bus::new();
        bus.post_eos("a");
        bus.post_eos("b");
        let first = bus.timed_pop(Some(Duration::ZERO)).unwrap().unwrap();
        let second = bus.timed_pop(Some(Duration::ZERO)).unwrap().unwrap();
        assert_eq!(first.src(), "a");
        assert_eq!(second.src(), "b");
        assert!(first.seq() < second.seq());
    }

    #[test]
    fn test_filtered_pop_never_yields_outside_mask() {
        let bus = Bus::new();
        bus.post_state_changed("p", State::Null, State::Ready, None);
        bus.post_application("app", vec![1]);
        bus.post_eos("p");

        let msg = bus
            .timed_pop_filtered(MessageMask::EOS | MessageMask::ERROR, Some(Duration::ZERO))
            .unwrap()
            .unwrap();
        assert!(matches!(msg.kind(), MessageKind::Eos));
    }

    #[test]
    fn test_zero_timeout_returns_none_without_waiting() {
        let bus = Bus::new();
        let start = Instant::now();
        let msg = bus
            .timed_pop_filtered(MessageMask::ANY, Some(Duration::ZERO))
            .unwrap();
        assert!(msg.is_none());
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_timeout_expiry_is_sentinel() {
        let bus = Bus::new();
        let msg = bus
            .timed_pop_filtered(MessageMask::EOS, Some(Duration::from_millis(20)))
            .unwrap();
        assert!(msg.is_none());
    }

    #[test]
    fn test_blocking_pop_wakes_on_post() {
        let bus = Arc::new(Bus::new());
        let poster = bus.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            poster.post_eos("pipeline");
        });
        let msg = bus.timed_pop_filtered(MessageMask::EOS, None).unwrap();
        assert!(msg.is_some());
        handle.join().unwrap();
    }

    #[test]
    fn test_watch_receives_every_message() {
        let bus = Arc::new(Bus::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _guard = bus
            .add_watch(0, move |_msg| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .unwrap();

        bus.post_eos("a");
        bus.post_error("b", 1, "boom");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        // Watch mode leaves nothing queued.
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn test_watch_self_unregisters_on_false() {
        let bus = Arc::new(Bus::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _guard = bus
            .add_watch(0, move |_msg| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            })
            .unwrap();

        bus.post_eos("a");
        bus.post_eos("b");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_post_during_callback_is_drained_to_watch() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Barrier;

        let bus = Arc::new(Bus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let in_callback = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let log = seen.clone();
        let entered = in_callback.clone();
        let resume = release.clone();
        let first = AtomicBool::new(true);
        let _guard = bus
            .add_watch(0, move |msg| {
                log.lock().unwrap_or_else(|e| e.into_inner()).push(msg.seq());
                if first.swap(false, Ordering::SeqCst) {
                    entered.wait();
                    resume.wait();
                }
                true
            })
            .unwrap();

        let poster = bus.clone();
        let handle = std::thread::spawn(move || poster.post_eos("first"));

        // The callback is now in flight; this post must not get stuck
        // behind the re-registered watch.
        in_callback.wait();
        bus.post_eos("second");
        release.wait();
        handle.join().unwrap();

        let seen = seen.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(seen.as_slice(), &[0, 1]);
        assert_eq!(bus.queued_len(), 0);
    }

    #[test]
    fn test_delivery_paths_are_exclusive() {
        let bus = Arc::new(Bus::new());
        // Polling first: watch must be refused.
        let _ = bus.timed_pop(Some(Duration::ZERO)).unwrap();
        assert!(matches!(
            bus.add_watch(0, |_| true),
            Err(BusError::DeliveryModeConflict { .. })
        ));

        // Watch first: polling must be refused.
        let bus = Arc::new(Bus::new());
        let _guard = bus.add_watch(0, |_| true).unwrap();
        assert!(matches!(
            bus.timed_pop(Some(Duration::ZERO)),
            Err(BusError::DeliveryModeConflict { .. })
        ));
    }

    #[test]
    fn test_watch_guard_drop_releases_bus() {
        let bus = Arc::new(Bus::new());
        let guard = bus.add_watch(0, |_| true).unwrap();
        drop(guard);
        // Delivery path is free again.
        assert!(bus.timed_pop(Some(Duration::ZERO)).unwrap().is_none());
    }

    #[test]
    fn test_second_watch_rejected() {
        let bus = Arc::new(Bus::new());
        let _guard = bus.add_watch(0, |_| true).unwrap();
        assert!(matches!(
            bus.add_watch(0, |_| true),
            Err(BusError::WatchExists)
        ));
    }
}
