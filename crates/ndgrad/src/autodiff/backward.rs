//! Backward pass execution for reverse-mode automatic differentiation.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::gradients::Gradients;
use super::graph::{ComputationGraph, NodeId, with_graph};
use super::tensor::TrackedTensor;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Options for [`backward_with`].
#[derive(Debug, Clone, Default)]
pub struct BackwardOptions {
    /// Keep the traversed nodes so backward can run through them again.
    pub retain_graph: bool,
    /// Seed gradient. Required when the output is not a single element.
    pub grad_output: Option<Tensor>,
}

/// Execute backward pass from a scalar loss.
///
/// Adds the gradient of `loss` into every reachable leaf's `grad()` and
/// returns the leaf gradients of this pass keyed by node id. The traversed
/// operation nodes are released afterwards.
///
/// # Errors
/// Returns error if:
/// - Loss has more than one element
/// - Loss does not require grad
/// - Part of the graph was already released by an earlier backward
///
/// # Example
///
/// ```
/// use ndgrad::autodiff::{TrackedTensor, backward};
/// use ndgrad::Tensor;
///
/// let w = TrackedTensor::leaf(Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap()).unwrap();
/// let loss = w.square().sum();
/// backward(&loss).unwrap();
/// assert_eq!(w.grad().unwrap().to_vec(), vec![2.0, 4.0]);
/// ```
pub fn backward(loss: &TrackedTensor) -> Result<Gradients, TensorError> {
    backward_with(loss, BackwardOptions::default())
}

/// Execute backward pass with explicit options.
pub fn backward_with(
    output: &TrackedTensor,
    options: BackwardOptions,
) -> Result<Gradients, TensorError> {
    let seed = match options.grad_output {
        Some(grad) => {
            if grad.shape() != output.shape() {
                return Err(TensorError::IncompatibleShapes {
                    lhs: grad.shape().to_vec(),
                    rhs: output.shape().to_vec(),
                    op: "backward".to_string(),
                });
            }
            grad
        }
        None => {
            if output.numel() != 1 {
                return Err(TensorError::InvalidOperation(format!(
                    "grad can be implicitly created only for scalar outputs, got {} elements",
                    output.numel()
                )));
            }
            Tensor::ones_like(output.tensor())
        }
    };

    if !output.requires_grad() {
        return Err(TensorError::NoGradFn);
    }
    let root = output.node_id().ok_or(TensorError::NoGradFn)?;

    with_graph(|graph| -> Result<Gradients, TensorError> {
        if graph.get_node(root).is_none() && !graph.is_leaf(root) {
            return Err(TensorError::GraphReleased);
        }
        let order = topological_order(graph, root)?;
        tracing::debug!(root = root.index(), nodes = order.len(), "running backward");

        let mut pending = Gradients::new();
        pending.accumulate(root, seed)?;
        let mut leaf_grads = Gradients::new();

        for &id in &order {
            let Some(grad_output) = pending.remove(id) else {
                continue;
            };
            if let Some(node) = graph.get_node(id) {
                for (input, grad) in node.grad_fn().backward(&grad_output)? {
                    pending.accumulate(input, grad)?;
                }
            } else if let Some(leaf) = graph.get_leaf(id) {
                leaf_grads.accumulate(id, grad_output.to_dtype(leaf.dtype()))?;
            } else {
                return Err(TensorError::GraphReleased);
            }
        }

        for (&id, grad) in leaf_grads.iter() {
            let Some(cell) = graph.get_leaf(id).and_then(|leaf| leaf.grad_cell()) else {
                continue;
            };
            let mut slot = cell.borrow_mut();
            let updated = match slot.as_ref() {
                Some(existing) => existing.add(grad)?,
                None => grad.deep_clone(),
            };
            *slot = Some(updated);
        }

        if !options.retain_graph {
            for &id in &order {
                graph.remove_node(id);
            }
        }
        Ok(leaf_grads)
    })
}

/// Order the nodes reachable from `root` so that every node comes before
/// its inputs.
fn topological_order(graph: &ComputationGraph, root: NodeId) -> Result<Vec<NodeId>, TensorError> {
    let mut dag: DiGraph<NodeId, ()> = DiGraph::new();
    let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
    index.insert(root, dag.add_node(root));
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let Some(node) = graph.get_node(id) else {
            continue;
        };
        let from = index[&id];
        for input in node.grad_fn().inputs() {
            let to = *index.entry(input).or_insert_with(|| {
                stack.push(input);
                dag.add_node(input)
            });
            dag.add_edge(from, to, ());
        }
    }

    let sorted = toposort(&dag, None).map_err(|cycle| {
        TensorError::InvalidOperation(format!(
            "computation graph has a cycle through node {}",
            dag[cycle.node_id()].index()
        ))
    })?;
    Ok(sorted.into_iter().map(|ix| dag[ix]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_backward_rejects_non_scalar() {
        let x = TrackedTensor::leaf(Tensor::ones(&[3])).unwrap();
        let y = x.mul_scalar(2.0);
        assert!(matches!(
            backward(&y),
            Err(TensorError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_backward_with_grad_output() {
        let x = TrackedTensor::leaf(Tensor::ones(&[3])).unwrap();
        let y = x.mul_scalar(2.0);
        let seed = Tensor::from_vec(vec![1.0, 0.5, 0.0], &[3]).unwrap();
        backward_with(
            &y,
            BackwardOptions {
                grad_output: Some(seed),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(x.grad().unwrap().to_vec(), vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_backward_without_grad_fn() {
        let c = TrackedTensor::new(Tensor::scalar(1.0));
        assert!(matches!(backward(&c), Err(TensorError::NoGradFn)));
    }

    #[test]
    fn test_second_backward_needs_retained_graph() {
        let x = TrackedTensor::leaf(Tensor::scalar(3.0)).unwrap();
        let y = x.square();

        backward(&y).unwrap();
        assert!(matches!(backward(&y), Err(TensorError::GraphReleased)));
    }

    #[test]
    fn test_retain_graph_accumulates() {
        let x = TrackedTensor::leaf(Tensor::scalar(3.0)).unwrap();
        let y = x.square();
        let retain = BackwardOptions {
            retain_graph: true,
            ..Default::default()
        };

        backward_with(&y, retain.clone()).unwrap();
        backward_with(&y, retain).unwrap();
        assert_relative_eq!(x.grad().unwrap().item().unwrap(), 12.0);
    }

    #[test]
    fn test_shared_subexpression() {
        // y = x * x + x, dy/dx = 2x + 1
        let x = TrackedTensor::leaf(Tensor::scalar(2.0)).unwrap();
        let y = x.mul(&x).unwrap().add(&x).unwrap();
        let grads = backward(&y).unwrap();

        let expected = 5.0;
        assert_relative_eq!(
            grads.get(x.node_id().unwrap()).unwrap().item().unwrap(),
            expected
        );
        assert_relative_eq!(x.grad().unwrap().item().unwrap(), expected);
    }

    #[test]
    fn test_backward_on_leaf() {
        let x = TrackedTensor::leaf(Tensor::scalar(2.0)).unwrap();
        backward(&x).unwrap();
        assert_eq!(x.grad().unwrap().item().unwrap(), 1.0);
    }

    #[test]
    fn test_modified_saved_tensor_fails() {
        let x = TrackedTensor::leaf(Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap()).unwrap();
        let y = x.exp();
        let loss = y.sum();
        y.tensor().fill_(0.0);
        assert!(matches!(
            backward(&loss),
            Err(TensorError::ModifiedInPlace { .. })
        ));
    }

    #[test]
    fn test_grad_cast_to_leaf_dtype() {
        let x = TrackedTensor::leaf(Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap()).unwrap();
        let scale = TrackedTensor::new(Tensor::from_vec_with(
            vec![3.0, 3.0],
            &[2],
            crate::dtype::DType::F64,
            crate::device::Device::Cpu,
        )
        .unwrap());
        let loss = x.mul(&scale).unwrap().sum();
        assert_eq!(loss.dtype(), crate::dtype::DType::F64);

        backward(&loss).unwrap();
        let grad = x.grad().unwrap();
        assert_eq!(grad.dtype(), crate::dtype::DType::F32);
        assert_eq!(grad.to_vec(), vec![3.0, 3.0]);
    }
}
