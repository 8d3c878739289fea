//! Tracked tensor operations with automatic differentiation.
//!
//! Each operation computes its result with the plain [`Tensor`] kernels and,
//! when recording is enabled and some input requires gradient, adds a node
//! whose [`GradFn`] holds what the vector-Jacobian product needs.

mod arith;
mod matmul;
mod reduce;
mod shape;
mod unary;

use super::grad_mode::is_grad_enabled;
use super::graph::{GradFn, NodeId, with_graph};
use super::tensor::TrackedTensor;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Input of a recorded operation: the node to send gradient to, if any,
/// and the shape the gradient must be reduced back to.
#[derive(Debug, Clone)]
pub(crate) struct Operand {
    id: Option<NodeId>,
    shape: Vec<usize>,
}

impl Operand {
    pub(crate) fn of(input: &TrackedTensor) -> Self {
        Self {
            id: if input.requires_grad() {
                input.node_id()
            } else {
                None
            },
            shape: input.shape().to_vec(),
        }
    }
}

pub(crate) fn input_ids(operands: &[&Operand]) -> Vec<NodeId> {
    operands.iter().filter_map(|op| op.id).collect()
}

/// Wrap `result`, recording a node built by `grad_fn` when any input
/// requires gradient and recording is enabled.
pub(crate) fn track<F>(inputs: &[&TrackedTensor], result: Tensor, grad_fn: F) -> TrackedTensor
where
    F: FnOnce() -> Box<dyn GradFn>,
{
    if !is_grad_enabled() || !inputs.iter().any(|t| t.requires_grad()) {
        return TrackedTensor::new(result);
    }
    let grad_fn = grad_fn();
    let id = with_graph(|g| g.create_node(grad_fn));
    TrackedTensor::from_op(result, id)
}

pub(crate) type Grads = Result<Vec<(NodeId, Tensor)>, TensorError>;

/// Reduce the gradient produced by `grad` to the operand's shape and route
/// it to the operand's node. Operands that do not require gradient are
/// skipped without evaluating `grad`.
pub(crate) fn route(
    grads: &mut Vec<(NodeId, Tensor)>,
    operand: &Operand,
    grad: impl FnOnce() -> Result<Tensor, TensorError>,
) -> Result<(), TensorError> {
    if let Some(id) = operand.id {
        grads.push((id, grad()?.sum_to_shape(&operand.shape)?));
    }
    Ok(())
}
