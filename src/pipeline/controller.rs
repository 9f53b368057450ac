//! Pipeline controller: owns the graph, drives state, posts to the bus.

use super::graph::{ElementId, PipelineGraph};
use super::state::{State, StateChangeResult, Transition};
use crate::buffer::Buffer;
use crate::bus::{Bus, MessageKind};
use crate::element::{ElementDyn, Filter, FilterAdapter, Sink, SinkAdapter, Source, SourceAdapter};
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard};

// Engine error codes reported on the bus.
const ERR_NOT_RUNNABLE: i32 = 1;
const ERR_ELEMENT_FAILED: i32 = 2;
const ERR_STREAM: i32 = 3;

/// Messages produced while holding the pipeline lock, posted after it is
/// released so watch callbacks may call back into the pipeline.
type Posts = Vec<(String, MessageKind)>;

struct Inner {
    graph: PipelineGraph,
    state: State,
    pending: Option<State>,
    position: u64,
}

/// A media pipeline: an element graph plus the state machine driving it.
///
/// State requests walk one adjacent step at a time, asking every element
/// to follow each step before committing it, and post a `StateChanged`
/// message on the [`Bus`] per committed step. A request that an element
/// answers with [`StateChangeResult::Async`] stops the walk; the target
/// stays pending until [`Pipeline::commit_async`] resumes it.
pub struct Pipeline {
    name: String,
    inner: Mutex<Inner>,
    bus: Arc<Bus>,
}

impl Pipeline {
    /// Create an empty pipeline in the NULL state, with its own bus.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                graph: PipelineGraph::new(),
                state: State::Null,
                pending: None,
                position: 0,
            }),
            bus: Arc::new(Bus::new()),
        }
    }

    /// Get the pipeline's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pipeline's bus.
    pub fn bus(&self) -> Arc<Bus> {
        self.bus.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Graph assembly
    // ------------------------------------------------------------------

    /// Add a type-erased element, taking exclusive ownership.
    pub fn add(&self, name: impl Into<String>, element: Box<dyn ElementDyn>) -> ElementId {
        self.lock().graph.add(name, element)
    }

    /// Add a source element.
    pub fn add_source(&self, name: impl Into<String>, source: impl Source + 'static) -> ElementId {
        self.add(name, Box::new(SourceAdapter::new(source)))
    }

    /// Add a filter element.
    pub fn add_filter(&self, name: impl Into<String>, filter: impl Filter + 'static) -> ElementId {
        self.add(name, Box::new(FilterAdapter::new(filter)))
    }

    /// Add a sink element.
    pub fn add_sink(&self, name: impl Into<String>, sink: impl Sink + 'static) -> ElementId {
        self.add(name, Box::new(SinkAdapter::new(sink)))
    }

    /// Link two elements, upstream to downstream.
    ///
    /// Validation (existence, pad directions, caps, acyclicity) completes
    /// before any mutation, so a failed link changes nothing.
    pub fn link(&self, src: ElementId, sink: ElementId) -> Result<()> {
        self.lock().graph.link(src, sink)?;
        Ok(())
    }

    /// Look up an element id by name.
    pub fn by_name(&self, name: &str) -> Option<ElementId> {
        self.lock().graph.by_name(name)
    }

    /// Number of elements in the pipeline.
    pub fn element_count(&self) -> usize {
        self.lock().graph.element_count()
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    /// Current committed state.
    pub fn state(&self) -> State {
        self.lock().state
    }

    /// Target of an unfinished state request, if any.
    pub fn pending(&self) -> Option<State> {
        self.lock().pending
    }

    /// Request a state change toward `target`.
    ///
    /// Walks adjacent steps, posting one `StateChanged` per committed
    /// step. Returns:
    ///
    /// - [`StateChangeResult::Success`] when `target` is reached
    /// - [`StateChangeResult::NoPreroll`] when reached but a live source
    ///   cannot preroll
    /// - [`StateChangeResult::Async`] when an element defers; the walk
    ///   resumes via [`Pipeline::commit_async`]
    /// - [`StateChangeResult::Failure`] when an element refuses or the
    ///   graph cannot run; the committed state stays where the walk
    ///   stopped and an `Error` message is posted
    ///
    /// A new request supersedes any pending one.
    pub fn set_state(&self, target: State) -> StateChangeResult {
        let mut posts = Posts::new();
        let result = {
            let mut inner = self.lock();
            inner.pending = Some(target);
            self.walk(&mut inner, &mut posts)
        };
        self.flush(posts);
        result
    }

    /// Resume a walk stopped by an [`StateChangeResult::Async`] answer.
    ///
    /// Call after the deferring element has finished its work. Returns
    /// [`StateChangeResult::Success`] immediately when nothing is pending.
    pub fn commit_async(&self) -> StateChangeResult {
        let mut posts = Posts::new();
        let result = {
            let mut inner = self.lock();
            if inner.pending.is_none() {
                return StateChangeResult::Success;
            }
            self.walk(&mut inner, &mut posts)
        };
        self.flush(posts);
        result
    }

    /// Post everything a locked section produced. Must be called with the
    /// pipeline lock released: watch callbacks run on the posting thread
    /// and may use the pipeline.
    fn flush(&self, posts: Posts) {
        for (src, kind) in posts {
            self.bus.post(src, kind);
        }
    }

    fn walk(&self, inner: &mut Inner, posts: &mut Posts) -> StateChangeResult {
        let Some(target) = inner.pending else {
            return StateChangeResult::Success;
        };
        let mut no_preroll = false;

        while inner.state != target {
            let next = inner.state.step_toward(target);
            let Some(transition) = Transition::new(inner.state, next) else {
                // step_toward only yields adjacent states; unreachable in
                // practice but a failure beats a hung walk.
                inner.pending = None;
                return StateChangeResult::Failure;
            };

            if transition == Transition::ReadyToPaused && !inner.graph.is_runnable() {
                let description = format!(
                    "pipeline {} cannot leave READY: needs at least one source and one sink",
                    self.name
                );
                tracing::error!(pipeline = %self.name, "{description}");
                inner.pending = None;
                posts.push((
                    self.name.clone(),
                    MessageKind::Error {
                        code: ERR_NOT_RUNNABLE,
                        description,
                    },
                ));
                return StateChangeResult::Failure;
            }

            match self.drive_elements(inner, transition, posts) {
                StateChangeResult::Failure => {
                    inner.pending = None;
                    return StateChangeResult::Failure;
                }
                StateChangeResult::Async => {
                    // Leave the target pending; the committed state has not
                    // moved, so no StateChanged is posted for this step.
                    tracing::debug!(
                        pipeline = %self.name,
                        from = %transition.from(),
                        to = %transition.to(),
                        "state change deferred"
                    );
                    return StateChangeResult::Async;
                }
                StateChangeResult::NoPreroll => no_preroll = true,
                StateChangeResult::Success => {}
            }

            let old = inner.state;
            inner.state = next;
            if old == State::Paused && next == State::Ready {
                // Leaving the prerolled range resets the stream.
                inner.position = 0;
            }
            let still_pending = (next != target).then_some(target);
            tracing::info!(
                pipeline = %self.name,
                "state changed {} -> {}",
                old,
                next
            );
            posts.push((
                self.name.clone(),
                MessageKind::StateChanged {
                    old,
                    new: next,
                    pending: still_pending,
                },
            ));
        }

        inner.pending = None;
        if no_preroll {
            StateChangeResult::NoPreroll
        } else {
            StateChangeResult::Success
        }
    }

    /// Ask every element to follow one transition.
    ///
    /// Aggregation: any Failure wins, then Async, then NoPreroll. A live
    /// source reaching PAUSED upward counts as NoPreroll even when its
    /// own handler reports plain success.
    fn drive_elements(
        &self,
        inner: &mut Inner,
        transition: Transition,
        posts: &mut Posts,
    ) -> StateChangeResult {
        let mut aggregate = StateChangeResult::Success;
        for id in inner.graph.node_ids() {
            let Some(node) = inner.graph.get_mut(id) else {
                continue;
            };
            let live = node.element().is_live();
            let mut result = node.element_mut().change_state(transition);
            if result == StateChangeResult::Success
                && live
                && transition == Transition::ReadyToPaused
            {
                result = StateChangeResult::NoPreroll;
            }
            match result {
                StateChangeResult::Failure => {
                    let description = format!(
                        "element {} failed transition {} -> {}",
                        node.name(),
                        transition.from(),
                        transition.to()
                    );
                    tracing::error!(pipeline = %self.name, "{description}");
                    posts.push((
                        node.name().to_string(),
                        MessageKind::Error {
                            code: ERR_ELEMENT_FAILED,
                            description,
                        },
                    ));
                    return StateChangeResult::Failure;
                }
                StateChangeResult::Async => aggregate = StateChangeResult::Async,
                StateChangeResult::NoPreroll => {
                    if aggregate == StateChangeResult::Success {
                        aggregate = StateChangeResult::NoPreroll;
                    }
                }
                StateChangeResult::Success => {}
            }
        }
        aggregate
    }

    // ------------------------------------------------------------------
    // Dataflow
    // ------------------------------------------------------------------

    /// Run one scheduling pass: every source produces at most one
    /// buffer, each pushed through its downstream elements to the sinks.
    ///
    /// Returns whether any source still produced data; `Ok(false)` means
    /// every source is exhausted. Only valid while PLAYING. An element
    /// error aborts the pass, is posted on the bus, and is returned.
    pub fn pump(&self) -> Result<bool> {
        let mut posts = Posts::new();
        let result = {
            let mut inner = self.lock();
            self.pump_locked(&mut inner, &mut posts)
        };
        self.flush(posts);
        result
    }

    fn pump_locked(&self, inner: &mut Inner, posts: &mut Posts) -> Result<bool> {
        if inner.state != State::Playing {
            return Err(Error::StateChange {
                from: inner.state,
                to: State::Playing,
                reason: "pipeline must be PLAYING to process data".to_string(),
            });
        }

        let mut produced = false;
        for id in inner.graph.source_ids() {
            let Some(node) = inner.graph.get_mut(id) else {
                continue;
            };
            let name = node.name().to_string();
            match node.element_mut().process(None) {
                Ok(Some(buffer)) => {
                    produced = true;
                    Self::deliver(&mut inner.graph, id, buffer, posts)?;
                }
                Ok(None) => {}
                Err(error) => {
                    posts.push((
                        name,
                        MessageKind::Error {
                            code: ERR_STREAM,
                            description: error.to_string(),
                        },
                    ));
                    return Err(error);
                }
            }
        }
        if produced {
            inner.position += 1;
        }
        Ok(produced)
    }

    fn deliver(
        graph: &mut PipelineGraph,
        from: ElementId,
        buffer: Buffer,
        posts: &mut Posts,
    ) -> Result<()> {
        for next in graph.downstream(from) {
            let Some(node) = graph.get_mut(next) else {
                continue;
            };
            let name = node.name().to_string();
            match node.element_mut().process(Some(buffer.clone())) {
                Ok(Some(output)) => Self::deliver(graph, next, output, posts)?,
                Ok(None) => {}
                Err(error) => {
                    posts.push((
                        name,
                        MessageKind::Error {
                            code: ERR_STREAM,
                            description: error.to_string(),
                        },
                    ));
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Pump until every source is exhausted, then post `Eos` on the bus.
    ///
    /// Stands in for the engine's streaming threads; the caller still
    /// consumes the bus the usual way.
    pub fn run_to_eos(&self) -> Result<()> {
        while self.pump()? {}
        tracing::info!(pipeline = %self.name, "end of stream");
        self.bus.post_eos(&self.name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries and seeking
    // ------------------------------------------------------------------

    /// Current stream position in buffers, counted from the start of the
    /// stream.
    ///
    /// Returns `None` below PAUSED: the pipeline has no stream until it
    /// is prerolled, matching the engine answering position queries only
    /// once playback is set up.
    pub fn position(&self) -> Option<u64> {
        let inner = self.lock();
        (inner.state >= State::Paused).then_some(inner.position)
    }

    /// Total stream length in buffers, when every source knows it.
    ///
    /// Returns `None` when the pipeline has no sources or any source
    /// cannot report a length (a live source, typically).
    pub fn duration(&self) -> Option<u64> {
        let inner = self.lock();
        let mut total = None;
        for id in inner.graph.source_ids() {
            let node = inner.graph.get(id)?;
            let length = node.element().duration()?;
            total = Some(total.map_or(length, |t: u64| t.max(length)));
        }
        total
    }

    /// Jump the stream to `position`, in buffers.
    ///
    /// Every source is asked to reposition; returns `Ok(true)` when all
    /// of them handled the request, `Ok(false)` when any refused (the
    /// others may still have moved, as in a partial flushing seek).
    /// Seeking needs a prerolled pipeline, so states below PAUSED error.
    pub fn seek(&self, position: u64) -> Result<bool> {
        let mut inner = self.lock();
        if inner.state < State::Paused {
            return Err(Error::StateChange {
                from: inner.state,
                to: State::Paused,
                reason: "seeking requires a prerolled pipeline".to_string(),
            });
        }
        let mut handled = true;
        for id in inner.graph.source_ids() {
            let Some(node) = inner.graph.get_mut(id) else {
                continue;
            };
            if !node.element_mut().seek(position) {
                tracing::warn!(
                    pipeline = %self.name,
                    element = node.name(),
                    position,
                    "seek refused"
                );
                handled = false;
            }
        }
        if handled {
            inner.position = position;
            tracing::debug!(pipeline = %self.name, position, "seeked");
        }
        Ok(handled)
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Walk the pipeline down to NULL and drop every element.
    ///
    /// Safe to call from any state; each downward step runs through every
    /// element so resources are released in order.
    pub fn shutdown(&self) -> Result<()> {
        if self.set_state(State::Null) == StateChangeResult::Failure {
            let state = self.state();
            return Err(Error::StateChange {
                from: state,
                to: State::Null,
                reason: "teardown walk failed".to_string(),
            });
        }
        self.lock().graph.clear();
        Ok(())
    }

    /// Post an application message on this pipeline's bus.
    pub fn post_application(&self, payload: Vec<u8>) {
        self.bus.post_application(&self.name, payload);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // Best effort: elements still get their downward transitions even
        // when the owner forgot an explicit shutdown.
        let state = self.lock().state;
        if state != State::Null {
            let _ = self.set_state(State::Null);
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("pending", &inner.pending)
            .field("elements", &inner.graph.element_count())
            .finish()
    }
}
