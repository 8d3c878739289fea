//! Reductions.

use super::{Grads, Operand, input_ids, route, track};
use crate::autodiff::graph::{GradFn, NodeId};
use crate::autodiff::tensor::TrackedTensor;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Gradient of a sum or mean: the upstream gradient spread back over the
/// reduced elements, scaled by `scale`.
#[derive(Debug)]
struct ReduceBackward {
    input: Operand,
    /// Dimension reduced without keepdim, restored before expanding.
    squeezed: Option<usize>,
    scale: f64,
    name: &'static str,
}

impl GradFn for ReduceBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let mut grads = Vec::new();
        route(&mut grads, &self.input, || {
            let grad = match self.squeezed {
                Some(dim) => grad_output.unsqueeze(dim)?,
                None => grad_output.clone(),
            };
            let spread = grad.expand(&self.input.shape)?;
            Ok(if self.scale == 1.0 {
                spread.contiguous()
            } else {
                spread.mul_scalar(self.scale)
            })
        })?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.input])
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl TrackedTensor {
    pub fn sum(&self) -> TrackedTensor {
        track(&[self], self.tensor().sum(), || {
            Box::new(ReduceBackward {
                input: Operand::of(self),
                squeezed: None,
                scale: 1.0,
                name: "SumBackward",
            })
        })
    }

    pub fn mean(&self) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().mean()?;
        let scale = 1.0 / self.numel() as f64;
        Ok(track(&[self], result, || {
            Box::new(ReduceBackward {
                input: Operand::of(self),
                squeezed: None,
                scale,
                name: "MeanBackward",
            })
        }))
    }

    pub fn sum_dim(&self, dim: usize, keepdim: bool) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().sum_dim(dim, keepdim)?;
        Ok(track(&[self], result, || {
            Box::new(ReduceBackward {
                input: Operand::of(self),
                squeezed: (!keepdim).then_some(dim),
                scale: 1.0,
                name: "SumBackward",
            })
        }))
    }
}
