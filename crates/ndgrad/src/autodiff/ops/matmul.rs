//! Tracked matrix multiplication.

use super::{Grads, Operand, input_ids, route, track};
use crate::autodiff::graph::{GradFn, NodeId};
use crate::autodiff::saved_tensor::SavedTensor;
use crate::autodiff::tensor::TrackedTensor;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Backward function for matmul.
///
/// For C = A @ B:
/// - grad_A = grad_C @ B^T
/// - grad_B = A^T @ grad_C
///
/// Vector operands are lifted to a row (lhs) or column (rhs) matrix first.
#[derive(Debug)]
struct MatmulBackward {
    lhs: Operand,
    rhs: Operand,
    saved_lhs: SavedTensor,
    saved_rhs: SavedTensor,
}

impl GradFn for MatmulBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let a = self.saved_lhs.materialize()?;
        let b = self.saved_rhs.materialize()?;
        let a2 = if a.ndim() == 1 { a.unsqueeze(0)? } else { a };
        let b2 = if b.ndim() == 1 { b.unsqueeze(1)? } else { b };
        let g2 = grad_output.reshape(&[a2.shape()[0], b2.shape()[1]])?;

        let mut grads = Vec::new();
        route(&mut grads, &self.lhs, || {
            g2.matmul(&b2.t()?)?.reshape(&self.lhs.shape)
        })?;
        route(&mut grads, &self.rhs, || {
            a2.t()?.matmul(&g2)?.reshape(&self.rhs.shape)
        })?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.lhs, &self.rhs])
    }

    fn name(&self) -> &'static str {
        "MmBackward"
    }
}

impl TrackedTensor {
    pub fn matmul(&self, other: &TrackedTensor) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().matmul(other.tensor())?;
        Ok(track(&[self, other], result, || {
            Box::new(MatmulBackward {
                lhs: Operand::of(self),
                rhs: Operand::of(other),
                saved_lhs: SavedTensor::new(self.tensor()),
                saved_rhs: SavedTensor::new(other.tensor()),
            })
        }))
    }
}
