//! TrackedTensor - Tensor with gradient tracking for automatic differentiation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::grad_mode::is_grad_enabled;
use super::graph::{GradCell, NodeId, with_graph};
use crate::device::Device;
use crate::dtype::DType;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// A tensor that tracks gradients for automatic differentiation.
///
/// This is the main user-facing type for AD operations. It wraps a
/// [`Tensor`] and optionally tracks it in the computation graph. Leaves
/// created with [`TrackedTensor::leaf`] own a gradient accumulator that
/// [`backward`](super::backward) adds into.
///
/// Each recorded operation adds a node to the thread's graph. Nodes are
/// released by `backward` (unless the graph is retained) or by
/// [`clear_graph`](super::clear_graph). Dropping a result does not release
/// its node, so results that never reach `backward` stay in the graph until
/// it is cleared. Use [`no_grad`](super::no_grad) for evaluation-only work.
///
/// # Example
///
/// ```
/// use ndgrad::autodiff::TrackedTensor;
/// use ndgrad::Tensor;
///
/// // Create a leaf tensor that requires gradient
/// let a = TrackedTensor::leaf(Tensor::ones(&[2, 3])).unwrap();
/// assert!(a.requires_grad());
///
/// // Create a tensor that doesn't require gradient
/// let b = TrackedTensor::new(Tensor::ones(&[3, 4]));
/// assert!(!b.requires_grad());
/// ```
#[derive(Debug, Clone)]
pub struct TrackedTensor {
    /// The underlying tensor data.
    tensor: Tensor,
    /// Node in computation graph (None if not tracking).
    node: Option<NodeId>,
    /// Gradient accumulator, present on leaves that require gradient.
    grad: Option<GradCell>,
    requires_grad: bool,
}

impl TrackedTensor {
    /// Create a tracked tensor that does not require gradient.
    pub fn new(tensor: Tensor) -> Self {
        Self {
            tensor,
            node: None,
            grad: None,
            requires_grad: false,
        }
    }

    /// Create a leaf tensor that requires gradient.
    ///
    /// Registers in the thread-local computation graph. Only floating-point
    /// tensors can require gradients.
    pub fn leaf(tensor: Tensor) -> Result<Self, TensorError> {
        if !tensor.dtype().is_float() {
            return Err(TensorError::NonFloatGrad {
                dtype: tensor.dtype(),
            });
        }
        let grad: GradCell = Rc::new(RefCell::new(None));
        let node = with_graph(|g| g.create_leaf(&grad, tensor.dtype()));
        Ok(Self {
            tensor,
            node: Some(node),
            grad: Some(grad),
            requires_grad: true,
        })
    }

    /// Create with explicit requires_grad flag.
    pub fn with_requires_grad(tensor: Tensor, requires_grad: bool) -> Result<Self, TensorError> {
        if requires_grad {
            Self::leaf(tensor)
        } else {
            Ok(Self::new(tensor))
        }
    }

    /// Wrap the result of a recorded operation.
    pub(crate) fn from_op(tensor: Tensor, node: NodeId) -> Self {
        Self {
            tensor,
            node: Some(node),
            grad: None,
            requires_grad: true,
        }
    }

    /// Get the underlying tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Consume and return the underlying tensor.
    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }

    /// Get node ID if tracked.
    pub fn node_id(&self) -> Option<NodeId> {
        self.node
    }

    /// Check if this tensor requires gradient.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Leaves are tensors created by the user rather than by a recorded
    /// operation. Tensors that do not require gradient are leaves too.
    pub fn is_leaf(&self) -> bool {
        self.grad.is_some() || !self.requires_grad
    }

    /// Name of the backward function that produced this tensor, if any.
    ///
    /// Returns `None` for leaves and for results whose graph node has
    /// already been released by a backward pass.
    pub fn grad_fn_name(&self) -> Option<&'static str> {
        if self.grad.is_some() {
            return None;
        }
        let id = self.node?;
        with_graph(|g| g.get_node(id).map(|node| node.grad_fn().name()))
    }

    /// Accumulated gradient of a leaf, or `None` before any backward pass.
    pub fn grad(&self) -> Option<Tensor> {
        self.grad.as_ref().and_then(|cell| cell.borrow().clone())
    }

    /// Zero the accumulated gradient in place, keeping its storage.
    pub fn zero_grad(&self) {
        if let Some(grad) = self.grad() {
            grad.zero_();
        }
    }

    /// Drop the accumulated gradient.
    pub fn set_grad_none(&self) {
        if let Some(cell) = &self.grad {
            cell.replace(None);
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.tensor.shape()
    }

    pub fn ndim(&self) -> usize {
        self.tensor.ndim()
    }

    pub fn numel(&self) -> usize {
        self.tensor.numel()
    }

    pub fn dtype(&self) -> DType {
        self.tensor.dtype()
    }

    pub fn device(&self) -> Device {
        self.tensor.device()
    }

    /// Value of a single-element tensor.
    pub fn item(&self) -> Result<f64, TensorError> {
        self.tensor.item()
    }

    /// Copy out the elements. Tensors attached to the graph must be
    /// detached first.
    pub fn to_vec(&self) -> Result<Vec<f64>, TensorError> {
        if self.requires_grad {
            return Err(TensorError::RequiresGrad);
        }
        Ok(self.tensor.to_vec())
    }

    /// Detach from computation graph.
    ///
    /// Returns a new tensor that shares data but doesn't require grad.
    pub fn detach(&self) -> Self {
        Self::new(self.tensor.clone())
    }

    /// Subtract `update` from the data in place, e.g. a parameter step.
    ///
    /// Tensors that require gradient may only be updated while gradient
    /// recording is disabled.
    pub fn sub_(&self, update: &Tensor) -> Result<(), TensorError> {
        self.check_in_place()?;
        self.tensor.sub_(update)
    }

    /// Overwrite the data in place. Same restriction as [`Self::sub_`].
    pub fn copy_(&self, src: &Tensor) -> Result<(), TensorError> {
        self.check_in_place()?;
        self.tensor.copy_(src)
    }

    /// In-place writes are not recorded, so nothing that requires grad may
    /// be written while recording is on.
    fn check_in_place(&self) -> Result<(), TensorError> {
        if !self.requires_grad || !is_grad_enabled() {
            return Ok(());
        }
        let what = if self.is_leaf() {
            "a leaf tensor that requires grad"
        } else {
            "a tensor produced by a recorded operation"
        };
        Err(TensorError::InvalidOperation(format!(
            "{what} is being used in an in-place operation"
        )))
    }
}

impl fmt::Display for TrackedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.tensor.to_string();
        let suffix = match self.grad_fn_name() {
            Some(name) => format!(", grad_fn=<{name}>"),
            None if self.requires_grad => ", requires_grad=True".to_string(),
            None => return f.write_str(&body),
        };
        let open = body.strip_suffix(')').unwrap_or(&body);
        write!(f, "{open}{suffix})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodiff::no_grad;

    #[test]
    fn test_tracked_tensor_new() {
        let tracked = TrackedTensor::new(Tensor::ones(&[2, 3]));

        assert!(!tracked.requires_grad());
        assert!(tracked.node_id().is_none());
        assert!(tracked.is_leaf());
        assert_eq!(tracked.shape(), &[2, 3]);
        assert_eq!(tracked.numel(), 6);
    }

    #[test]
    fn test_tracked_tensor_leaf() {
        let tracked = TrackedTensor::leaf(Tensor::ones(&[2, 3])).unwrap();

        assert!(tracked.requires_grad());
        assert!(tracked.node_id().is_some());
        assert!(tracked.is_leaf());
        assert!(tracked.grad().is_none());
        assert!(tracked.grad_fn_name().is_none());
    }

    #[test]
    fn test_leaf_rejects_integer_dtype() {
        let t = Tensor::full_with(&[2], 1.0, DType::I64, Device::Cpu);
        assert!(matches!(
            TrackedTensor::leaf(t),
            Err(TensorError::NonFloatGrad { dtype: DType::I64 })
        ));
    }

    #[test]
    fn test_to_vec_requires_detach() {
        let tracked = TrackedTensor::leaf(Tensor::ones(&[2])).unwrap();
        assert!(matches!(tracked.to_vec(), Err(TensorError::RequiresGrad)));
        assert_eq!(tracked.detach().to_vec().unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_detach_shares_storage() {
        let tracked = TrackedTensor::leaf(Tensor::ones(&[2, 3])).unwrap();
        let detached = tracked.detach();

        assert!(!detached.requires_grad());
        assert!(detached.node_id().is_none());
        assert!(detached.tensor().shares_storage_with(tracked.tensor()));
    }

    #[test]
    fn test_in_place_update_needs_no_grad() {
        let w = TrackedTensor::leaf(Tensor::ones(&[2])).unwrap();
        let step = Tensor::full(&[2], 0.5);
        assert!(w.sub_(&step).is_err());

        no_grad(|| w.sub_(&step)).unwrap();
        assert_eq!(w.tensor().to_vec(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_in_place_write_on_recorded_result_fails() {
        let w = TrackedTensor::leaf(Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap()).unwrap();
        let y = w.mul_scalar(2.0);
        let err = y.copy_(&Tensor::full(&[2], 7.0)).unwrap_err();
        assert!(matches!(err, TensorError::InvalidOperation(_)));
        assert!(y.sub_(&Tensor::ones(&[2])).is_err());
        assert_eq!(y.tensor().to_vec(), vec![2.0, 4.0]);

        crate::autodiff::backward(&y.sum()).unwrap();
        assert_eq!(w.grad().unwrap().to_vec(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_into_tensor_keeps_storage() {
        let w = TrackedTensor::leaf(Tensor::ones(&[2])).unwrap();
        let y = w.mul_scalar(3.0);
        let view = y.tensor().clone();
        let raw = y.into_tensor();
        assert!(raw.shares_storage_with(&view));
        assert_eq!(raw.to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_in_place_write_without_grad_is_allowed() {
        let c = TrackedTensor::new(Tensor::ones(&[2]));
        c.copy_(&Tensor::full(&[2], 3.0)).unwrap();
        assert_eq!(c.to_vec().unwrap(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_display_marks_requires_grad() {
        let w = TrackedTensor::leaf(Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap()).unwrap();
        assert_eq!(
            w.to_string(),
            "tensor([1.0000, 2.0000], requires_grad=True)"
        );
        let c = TrackedTensor::new(Tensor::from_vec(vec![1.0], &[1]).unwrap());
        assert_eq!(c.to_string(), "tensor([1.0000])");
    }
}
