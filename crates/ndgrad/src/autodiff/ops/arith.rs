//! Broadcasting arithmetic.

use super::{Grads, Operand, input_ids, route, track};
use crate::autodiff::graph::{GradFn, NodeId};
use crate::autodiff::saved_tensor::SavedTensor;
use crate::autodiff::tensor::TrackedTensor;
use crate::error::TensorError;
use crate::tensor::Tensor;

#[derive(Debug)]
struct AddBackward {
    lhs: Operand,
    rhs: Operand,
}

impl GradFn for AddBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let mut grads = Vec::new();
        route(&mut grads, &self.lhs, || Ok(grad_output.clone()))?;
        route(&mut grads, &self.rhs, || Ok(grad_output.clone()))?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.lhs, &self.rhs])
    }

    fn name(&self) -> &'static str {
        "AddBackward"
    }
}

#[derive(Debug)]
struct SubBackward {
    lhs: Operand,
    rhs: Operand,
}

impl GradFn for SubBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let mut grads = Vec::new();
        route(&mut grads, &self.lhs, || Ok(grad_output.clone()))?;
        route(&mut grads, &self.rhs, || Ok(grad_output.neg()))?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.lhs, &self.rhs])
    }

    fn name(&self) -> &'static str {
        "SubBackward"
    }
}

#[derive(Debug)]
struct MulBackward {
    lhs: Operand,
    rhs: Operand,
    saved_lhs: SavedTensor,
    saved_rhs: SavedTensor,
}

impl GradFn for MulBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let lhs = self.saved_lhs.materialize()?;
        let rhs = self.saved_rhs.materialize()?;
        let mut grads = Vec::new();
        route(&mut grads, &self.lhs, || grad_output.mul(&rhs))?;
        route(&mut grads, &self.rhs, || grad_output.mul(&lhs))?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.lhs, &self.rhs])
    }

    fn name(&self) -> &'static str {
        "MulBackward"
    }
}

#[derive(Debug)]
struct DivBackward {
    lhs: Operand,
    rhs: Operand,
    saved_lhs: SavedTensor,
    saved_rhs: SavedTensor,
}

impl GradFn for DivBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let lhs = self.saved_lhs.materialize()?;
        let rhs = self.saved_rhs.materialize()?;
        let mut grads = Vec::new();
        route(&mut grads, &self.lhs, || grad_output.div(&rhs))?;
        // d(a/b)/db = -a / b^2
        route(&mut grads, &self.rhs, || {
            grad_output.mul(&lhs)?.div(&rhs.square()).map(|g| g.neg())
        })?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.lhs, &self.rhs])
    }

    fn name(&self) -> &'static str {
        "DivBackward"
    }
}

#[derive(Debug)]
struct NegBackward {
    input: Operand,
}

impl GradFn for NegBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let mut grads = Vec::new();
        route(&mut grads, &self.input, || Ok(grad_output.neg()))?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.input])
    }

    fn name(&self) -> &'static str {
        "NegBackward"
    }
}

/// Gradient scaled by a constant: `add_scalar` (factor 1) and `mul_scalar`.
#[derive(Debug)]
struct ScaleBackward {
    input: Operand,
    factor: f64,
    name: &'static str,
}

impl GradFn for ScaleBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let mut grads = Vec::new();
        route(&mut grads, &self.input, || {
            Ok(if self.factor == 1.0 {
                grad_output.clone()
            } else {
                grad_output.mul_scalar(self.factor)
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

#[derive(Debug)]
struct PowBackward {
    input: Operand,
    saved_input: SavedTensor,
    exponent: f64,
}

impl GradFn for PowBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let x = self.saved_input.materialize()?;
        let mut grads = Vec::new();
        route(&mut grads, &self.input, || {
            let local = x.pow_scalar(self.exponent - 1.0).mul_scalar(self.exponent);
            grad_output.mul(&local)
        })?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.input])
    }

    fn name(&self) -> &'static str {
        "PowBackward"
    }
}

impl TrackedTensor {
    pub fn add(&self, other: &TrackedTensor) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().add(other.tensor())?;
        Ok(track(&[self, other], result, || {
            Box::new(AddBackward {
                lhs: Operand::of(self),
                rhs: Operand::of(other),
            })
        }))
    }

    pub fn sub(&self, other: &TrackedTensor) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().sub(other.tensor())?;
        Ok(track(&[self, other], result, || {
            Box::new(SubBackward {
                lhs: Operand::of(self),
                rhs: Operand::of(other),
            })
        }))
    }

    pub fn mul(&self, other: &TrackedTensor) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().mul(other.tensor())?;
        Ok(track(&[self, other], result, || {
            Box::new(MulBackward {
                lhs: Operand::of(self),
                rhs: Operand::of(other),
                saved_lhs: SavedTensor::new(self.tensor()),
                saved_rhs: SavedTensor::new(other.tensor()),
            })
        }))
    }

    pub fn div(&self, other: &TrackedTensor) -> Result<TrackedTensor, TensorError> {
        let result = self.tensor().div(other.tensor())?;
        Ok(track(&[self, other], result, || {
            Box::new(DivBackward {
                lhs: Operand::of(self),
                rhs: Operand::of(other),
                saved_lhs: SavedTensor::new(self.tensor()),
                saved_rhs: SavedTensor::new(other.tensor()),
            })
        }))
    }

    pub fn neg(&self) -> TrackedTensor {
        track(&[self], self.tensor().neg(), || {
            Box::new(NegBackward {
                input: Operand::of(self),
            })
        })
    }

    pub fn add_scalar(&self, scalar: f64) -> TrackedTensor {
        track(&[self], self.tensor().add_scalar(scalar), || {
            Box::new(ScaleBackward {
                input: Operand::of(self),
                factor: 1.0,
                name: "AddBackward",
            })
        })
    }

    pub fn mul_scalar(&self, scalar: f64) -> TrackedTensor {
        track(&[self], self.tensor().mul_scalar(scalar), || {
            Box::new(ScaleBackward {
                input: Operand::of(self),
                factor: scalar,
                name: "MulBackward",
            })
        })
    }

    pub fn pow_scalar(&self, exponent: f64) -> TrackedTensor {
        track(&[self], self.tensor().pow_scalar(exponent), || {
            Box::new(PowBackward {
                input: Operand::of(self),
                saved_input: SavedTensor::new(self.tensor()),
                exponent,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::autodiff::{TrackedTensor, backward, no_grad};
    use crate::tensor::Tensor;
    use approx::assert_relative_eq;

    fn leaf(data: Vec<f64>, shape: &[usize]) -> TrackedTensor {
        TrackedTensor::leaf(Tensor::from_vec(data, shape).unwrap()).unwrap()
    }

    #[test]
    fn test_mul_grad_fn_name() {
        let a = leaf(vec![2.0], &[1]);
        let b = leaf(vec![3.0], &[1]);
        let c = a.mul(&b).unwrap();
        assert_eq!(c.grad_fn_name(), Some("MulBackward"));
        assert!(!c.is_leaf());
        assert_eq!(c.to_string(), "tensor([6.0000], grad_fn=<MulBackward>)");
    }

    #[test]
    fn test_mul_gradients() {
        let a = leaf(vec![1.0, 2.0, 3.0], &[3]);
        let b = leaf(vec![4.0, 5.0, 6.0], &[3]);
        let loss = a.mul(&b).unwrap().sum();
        backward(&loss).unwrap();

        assert_eq!(a.grad().unwrap().to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(b.grad().unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_broadcast_gradient_is_reduced() {
        // y = w * x + b with scalar w and b over a batch of 4
        let w = leaf(vec![2.0], &[]);
        let b = leaf(vec![0.5], &[]);
        let x = TrackedTensor::new(Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4]).unwrap());

        let y = w.mul(&x).unwrap().add(&b).unwrap();
        assert_eq!(y.shape(), &[4]);
        backward(&y.sum()).unwrap();

        assert_eq!(w.grad().unwrap().shape(), &[] as &[usize]);
        assert_relative_eq!(w.grad().unwrap().item().unwrap(), 10.0);
        assert_relative_eq!(b.grad().unwrap().item().unwrap(), 4.0);
    }

    #[test]
    fn test_sub_and_div_gradients() {
        let a = leaf(vec![6.0], &[]);
        let b = leaf(vec![2.0], &[]);
        backward(&a.sub(&b).unwrap()).unwrap();
        assert_relative_eq!(a.grad().unwrap().item().unwrap(), 1.0);
        assert_relative_eq!(b.grad().unwrap().item().unwrap(), -1.0);

        a.set_grad_none();
        b.set_grad_none();
        backward(&a.div(&b).unwrap()).unwrap();
        assert_relative_eq!(a.grad().unwrap().item().unwrap(), 0.5);
        assert_relative_eq!(b.grad().unwrap().item().unwrap(), -1.5);
    }

    #[test]
    fn test_scalar_ops() {
        let x = leaf(vec![3.0], &[]);
        let y = x.pow_scalar(3.0).mul_scalar(2.0).add_scalar(1.0).neg();
        assert_relative_eq!(y.item().unwrap(), -55.0);
        backward(&y).unwrap();
        // d/dx -(2x^3 + 1) = -6x^2
        assert_relative_eq!(x.grad().unwrap().item().unwrap(), -54.0);
    }

    #[test]
    fn test_constant_inputs_are_not_tracked() {
        let a = TrackedTensor::new(Tensor::ones(&[2]));
        let b = TrackedTensor::new(Tensor::ones(&[2]));
        let c = a.add(&b).unwrap();
        assert!(!c.requires_grad());
        assert!(c.grad_fn_name().is_none());
    }

    #[test]
    fn test_no_grad_skips_recording() {
        let a = leaf(vec![1.0, 2.0], &[2]);
        let c = no_grad(|| a.mul_scalar(2.0));
        assert!(!c.requires_grad());
        assert_eq!(c.to_vec().unwrap(), vec![2.0, 4.0]);
    }
}
