//! Shape operations. Gradients flow back through the inverse reshaping.

use super::{Grads, Operand, input_ids, route, track};
use crate::autodiff::graph::{GradFn, NodeId};
use crate::autodiff::tensor::TrackedTensor;
use crate::error::TensorError;
use crate::tensor::Tensor;

#[derive(Debug)]
enum Reshaping {
    Reshape,
    Transpose(usize, usize),
    Unsqueeze(usize),
}

#[derive(Debug)]
struct ShapeBackward {
    input: Operand,
    reshaping: Reshaping,
}

impl GradFn for ShapeBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let mut grads = Vec::new();
        route(&mut grads, &self.input, || match self.reshaping {
            Reshaping::Reshape => grad_output.reshape(&self.input.shape),
            Reshaping::Transpose(dim0, dim1) => {
                Ok(grad_output.transpose(dim0, dim1)?.contiguous())
            }
            Reshaping::Unsqueeze(dim) => grad_output.squeeze(dim),
        })?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.input])
    }

    fn name(&self) -> &'static str {
        match self.reshaping {
            Reshaping::Reshape => "ViewBackward",
            Reshaping::Transpose(..) => "TransposeBackward",
            Reshaping::Unsqueeze(_) => "UnsqueezeBackward",
        }
    }
}

impl TrackedTensor {
    fn reshaped(&self, result: Tensor, reshaping: Reshaping) -> TrackedTensor {
        track(&[self], result, || {
            Box::new(ShapeBackward {
                input: Operand::of(self),
                reshaping,
            })
        })
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().reshape(shape)?;
        Ok(self.reshaped(result, Reshaping::Reshape))
    }

    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().transpose(dim0, dim1)?;
        Ok(self.reshaped(result, Reshaping::Transpose(dim0, dim1)))
    }

    /// Matrix transpose; see [`Tensor::t`].
    pub fn t(&self) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().t()?;
        if self.ndim() < 2 {
            return Ok(self.reshaped(result, Reshaping::Reshape));
        }
        Ok(self.reshaped(result, Reshaping::Transpose(0, 1)))
    }

    pub fn unsqueeze(&self, dim: usize) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().unsqueeze(dim)?;
        Ok(self.reshaped(result, Reshaping::Unsqueeze(dim)))
    }
}
