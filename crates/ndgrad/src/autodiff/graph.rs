//! Computation graph for reverse-mode automatic differentiation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::dtype::DType;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Unique identifier for a node in the computation graph.
///
/// Ids are never reused within a thread, so a leaf keeps its id across
/// [`clear_graph`] calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the internal index.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Create a NodeId for testing purposes.
    #[cfg(test)]
    pub(crate) fn new_for_test(index: usize) -> Self {
        Self(index)
    }
}

/// Gradient accumulator owned by a leaf tensor and shared with the graph.
pub(crate) type GradCell = Rc<RefCell<Option<Tensor>>>;

/// Backward function trait.
///
/// Computes gradients with respect to inputs given gradient of output.
/// Each tracked operation implements this trait.
pub trait GradFn: Debug {
    /// Compute VJP: given grad_output, return gradients for each input.
    ///
    /// Returns (NodeId, gradient) pairs for inputs that require grad.
    fn backward(&self, grad_output: &Tensor) -> Result<Vec<(NodeId, Tensor)>, TensorError>;

    /// Get input node IDs (for topological sort).
    fn inputs(&self) -> Vec<NodeId>;

    /// Display name, e.g. `"MulBackward"`.
    fn name(&self) -> &'static str;
}

/// An operation node in the computation graph.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    grad_fn: Box<dyn GradFn>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn grad_fn(&self) -> &dyn GradFn {
        self.grad_fn.as_ref()
    }
}

/// Registry entry for a leaf tensor.
#[derive(Debug)]
pub(crate) struct LeafEntry {
    grad: Weak<RefCell<Option<Tensor>>>,
    dtype: DType,
}

impl LeafEntry {
    pub(crate) fn grad_cell(&self) -> Option<GradCell> {
        self.grad.upgrade()
    }

    pub(crate) fn dtype(&self) -> DType {
        self.dtype
    }
}

/// Thread-local computation graph.
///
/// Holds operation nodes (released by backward unless the graph is
/// retained) and a registry of leaves whose gradient accumulators outlive
/// any single forward pass.
pub struct ComputationGraph {
    nodes: HashMap<NodeId, Node>,
    leaves: HashMap<NodeId, LeafEntry>,
    next_id: usize,
}

impl ComputationGraph {
    /// Create a new empty computation graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            leaves: HashMap::new(),
            next_id: 0,
        }
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a leaf and its gradient accumulator.
    pub(crate) fn create_leaf(&mut self, grad: &GradCell, dtype: DType) -> NodeId {
        let id = self.allocate_id();
        self.leaves.insert(
            id,
            LeafEntry {
                grad: Rc::downgrade(grad),
                dtype,
            },
        );
        tracing::trace!(node = id.index(), "registered leaf");
        id
    }

    /// Create an operation node with its backward function.
    pub fn create_node(&mut self, grad_fn: Box<dyn GradFn>) -> NodeId {
        let id = self.allocate_id();
        tracing::trace!(node = id.index(), op = grad_fn.name(), "recorded op");
        self.nodes.insert(id, Node { id, grad_fn });
        id
    }

    /// Get an operation node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_leaf(&self, id: NodeId) -> Option<&LeafEntry> {
        self.leaves.get(&id)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.leaves.contains_key(&id)
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    /// Drop every operation node and forget leaves that no longer exist.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.leaves.retain(|_, leaf| leaf.grad.strong_count() > 0);
    }

    /// Number of operation nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph holds no operation nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of registered leaves (live or not yet pruned).
    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }
}

impl Default for ComputationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for ComputationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputationGraph")
            .field("num_nodes", &self.nodes.len())
            .field("num_leaves", &self.leaves.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

thread_local! {
    static GRAPH: RefCell<ComputationGraph> = RefCell::new(ComputationGraph::new());
}

/// Access the thread-local computation graph.
///
/// Must not be re-entered from inside `f`.
pub fn with_graph<R>(f: impl FnOnce(&mut ComputationGraph) -> R) -> R {
    GRAPH.with(|g| f(&mut g.borrow_mut()))
}

/// Clear the thread-local computation graph (operation nodes only).
pub fn clear_graph() {
    with_graph(|g| g.clear());
}

/// Number of operation nodes currently held by this thread's graph.
pub fn graph_len() -> usize {
    with_graph(|g| g.len())
}
