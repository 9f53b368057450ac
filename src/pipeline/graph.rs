//! Pipeline graph structure using daggy.

use crate::element::{ElementDyn, ElementType};
use crate::error::LinkError;
use daggy::{Dag, NodeIndex};
use std::collections::HashMap;

/// Unique identifier for an element within its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) NodeIndex);

impl ElementId {
    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

/// A node in the pipeline graph: one element plus its wiring metadata.
pub struct Node {
    name: String,
    element: Box<dyn ElementDyn>,
    element_type: ElementType,
}

impl Node {
    fn new(name: impl Into<String>, element: Box<dyn ElementDyn>) -> Self {
        let element_type = element.element_type();
        Self {
            name: name.into(),
            element,
            element_type,
        }
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the element's role.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Get a reference to the element.
    pub fn element(&self) -> &dyn ElementDyn {
        self.element.as_ref()
    }

    /// Get a mutable reference to the element.
    pub fn element_mut(&mut self) -> &mut dyn ElementDyn {
        self.element.as_mut()
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("element_type", &self.element_type)
            .finish()
    }
}

/// The element graph owned by a pipeline.
///
/// Holds elements exclusively while they are linked in; an element value
/// moves in on add and is dropped on [`PipelineGraph::clear`].
#[derive(Default)]
pub struct PipelineGraph {
    graph: Dag<Node, ()>,
    by_name: HashMap<String, ElementId>,
}

impl PipelineGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, taking exclusive ownership.
    pub fn add(&mut self, name: impl Into<String>, element: Box<dyn ElementDyn>) -> ElementId {
        let name = name.into();
        let node = Node::new(name.clone(), element);
        let id = ElementId(self.graph.add_node(node));
        self.by_name.insert(name, id);
        id
    }

    /// Get a node by id.
    pub fn get(&self, id: ElementId) -> Option<&Node> {
        self.graph.node_weight(id.0)
    }

    /// Get a mutable node by id.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.graph.node_weight_mut(id.0)
    }

    /// Look up an element id by name.
    pub fn by_name(&self, name: &str) -> Option<ElementId> {
        self.by_name.get(name).copied()
    }

    /// Link two elements after validating pads and caps compatibility.
    ///
    /// All checks run before the graph is touched, so a failed link leaves
    /// the pipeline exactly as it was (no partial linking).
    pub fn link(&mut self, src: ElementId, sink: ElementId) -> Result<(), LinkError> {
        let src_node = self
            .graph
            .node_weight(src.0)
            .ok_or_else(|| LinkError::ElementNotFound {
                name: format!("element #{}", src.index()),
            })?;
        let sink_node = self
            .graph
            .node_weight(sink.0)
            .ok_or_else(|| LinkError::ElementNotFound {
                name: format!("element #{}", sink.index()),
            })?;

        if src_node.element_type() == ElementType::Sink {
            return Err(LinkError::NoSuchPad {
                element: src_node.name().to_string(),
                direction: "output",
            });
        }
        if sink_node.element_type() == ElementType::Source {
            return Err(LinkError::NoSuchPad {
                element: sink_node.name().to_string(),
                direction: "input",
            });
        }

        let out_caps = src_node.element().output_caps();
        let in_caps = sink_node.element().input_caps();
        if !out_caps.intersects(&in_caps) {
            return Err(LinkError::incompatible(
                src_node.name(),
                sink_node.name(),
                &out_caps.to_string(),
                &in_caps.to_string(),
            ));
        }

        let (src_name, sink_name) = (src_node.name().to_string(), sink_node.name().to_string());

        // daggy rejects the edge atomically if it would close a cycle.
        self.graph
            .add_edge(src.0, sink.0, ())
            .map_err(|_| LinkError::WouldCycle {
                upstream: src_name,
                downstream: sink_name,
            })?;

        Ok(())
    }

    /// Whether the graph contains at least one source and one sink
    /// (the minimum required to leave READY upward).
    pub fn is_runnable(&self) -> bool {
        let mut has_source = false;
        let mut has_sink = false;
        for idx in self.graph.graph().node_indices() {
            if let Some(node) = self.graph.node_weight(idx) {
                match node.element_type() {
                    ElementType::Source => has_source = true,
                    ElementType::Sink => has_sink = true,
                    ElementType::Filter => {}
                }
            }
        }
        has_source && has_sink
    }

    /// Whether any element in the graph is live.
    pub fn has_live_element(&self) -> bool {
        self.graph
            .graph()
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .any(|node| node.element().is_live())
    }

    /// Ids of every element, in insertion order.
    pub fn node_ids(&self) -> Vec<ElementId> {
        self.graph.graph().node_indices().map(ElementId).collect()
    }

    /// Ids of the source elements, in insertion order.
    pub fn source_ids(&self) -> Vec<ElementId> {
        self.graph
            .graph()
            .node_indices()
            .filter(|idx| {
                self.graph
                    .node_weight(*idx)
                    .is_some_and(|n| n.element_type() == ElementType::Source)
            })
            .map(ElementId)
            .collect()
    }

    /// Ids of the elements directly downstream of `id`.
    pub fn downstream(&self, id: ElementId) -> Vec<ElementId> {
        use daggy::Walker;
        self.graph
            .children(id.0)
            .iter(&self.graph)
            .map(|(_, node)| ElementId(node))
            .collect()
    }

    /// Get the number of elements.
    pub fn element_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of links.
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Drop every element and link, releasing all owned resources.
    pub fn clear(&mut self) {
        self.graph = Dag::new();
        self.by_name.clear();
    }
}

impl std::fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineGraph")
            .field("elements", &self.element_count())
            .field("links", &self.link_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{FilterAdapter, SinkAdapter, SourceAdapter};
    use crate::elements::{CapsFilter, NullSink, PassThrough, TestSource, TestSourceConfig};
    use crate::format::{Caps, MediaFormat};

    fn testsrc() -> Box<dyn ElementDyn> {
        Box::new(SourceAdapter::new(
            TestSource::new(TestSourceConfig::default()).unwrap(),
        ))
    }

    fn nullsink() -> Box<dyn ElementDyn> {
        Box::new(SinkAdapter::new(NullSink::new()))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut graph = PipelineGraph::new();
        let src = graph.add("src", testsrc());
        assert_eq!(graph.by_name("src"), Some(src));
        assert_eq!(graph.element_count(), 1);
    }

    #[test]
    fn test_link_valid() {
        let mut graph = PipelineGraph::new();
        let src = graph.add("src", testsrc());
        let sink = graph.add("sink", nullsink());
        graph.link(src, sink).unwrap();
        assert_eq!(graph.link_count(), 1);
        assert!(graph.is_runnable());
    }

    #[test]
    fn test_link_incompatible_caps_rolls_back() {
        let mut graph = PipelineGraph::new();
        let video = graph.add(
            "video",
            Box::new(FilterAdapter::new(CapsFilter::new(Caps::fixed(
                MediaFormat::RawVideo,
            )))),
        );
        let audio = graph.add(
            "audio",
            Box::new(FilterAdapter::new(CapsFilter::new(Caps::fixed(
                MediaFormat::RawAudio,
            )))),
        );

        let err = graph.link(video, audio).unwrap_err();
        assert!(matches!(err, LinkError::Incompatible { .. }));
        // The graph is unmodified: no partial link.
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_link_out_of_sink_rejected() {
        let mut graph = PipelineGraph::new();
        let sink = graph.add("sink", nullsink());
        let filter = graph.add("f", Box::new(FilterAdapter::new(PassThrough::new())));
        let err = graph.link(sink, filter).unwrap_err();
        assert!(matches!(err, LinkError::NoSuchPad { direction: "output", .. }));
    }

    #[test]
    fn test_link_into_source_rejected() {
        let mut graph = PipelineGraph::new();
        let filter = graph.add("f", Box::new(FilterAdapter::new(PassThrough::new())));
        let src = graph.add("src", testsrc());
        let err = graph.link(filter, src).unwrap_err();
        assert!(matches!(err, LinkError::NoSuchPad { direction: "input", .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = PipelineGraph::new();
        let a = graph.add("a", Box::new(FilterAdapter::new(PassThrough::new())));
        let b = graph.add("b", Box::new(FilterAdapter::new(PassThrough::new())));
        graph.link(a, b).unwrap();
        let err = graph.link(b, a).unwrap_err();
        assert!(matches!(err, LinkError::WouldCycle { .. }));
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_not_runnable_without_sink() {
        let mut graph = PipelineGraph::new();
        graph.add("src", testsrc());
        assert!(!graph.is_runnable());
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut graph = PipelineGraph::new();
        let src = graph.add("src", testsrc());
        let sink = graph.add("sink", nullsink());
        graph.link(src, sink).unwrap();
        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.by_name("src"), None);
    }
}
