//! Elementwise functions.

use super::{Grads, Operand, input_ids, route, track};
use crate::autodiff::graph::{GradFn, NodeId};
use crate::autodiff::saved_tensor::SavedTensor;
use crate::autodiff::tensor::TrackedTensor;
use crate::operations::apply_unary;
use crate::tensor::Tensor;

/// Which local derivative to apply, and whether it is expressed through the
/// saved input or the saved output.
#[derive(Debug, Clone, Copy)]
enum Function {
    Exp,
    Log,
    Tanh,
    Sigmoid,
    Relu,
    Square,
}

impl Function {
    fn name(self) -> &'static str {
        match self {
            Function::Exp => "ExpBackward",
            Function::Log => "LogBackward",
            Function::Tanh => "TanhBackward",
            Function::Sigmoid => "SigmoidBackward",
            Function::Relu => "ReluBackward",
            Function::Square => "PowBackward",
        }
    }

    fn saves_output(self) -> bool {
        matches!(self, Function::Exp | Function::Tanh | Function::Sigmoid)
    }
}

#[derive(Debug)]
struct UnaryBackward {
    input: Operand,
    function: Function,
    saved: SavedTensor,
}

impl GradFn for UnaryBackward {
    fn backward(&self, grad_output: &Tensor) -> Grads {
        let saved = self.saved.materialize()?;
        let mut grads = Vec::new();
        route(&mut grads, &self.input, || match self.function {
            // exp' = exp
            Function::Exp => grad_output.mul(&saved),
            Function::Log => grad_output.div(&saved),
            // tanh' = 1 - tanh^2
            Function::Tanh => grad_output.mul(&saved.square().neg().add_scalar(1.0)),
            // sigmoid' = s * (1 - s)
            Function::Sigmoid => grad_output.mul(&saved.mul(&saved.neg().add_scalar(1.0))?),
            Function::Relu => {
                let mask = apply_unary(&saved, |x| if x > 0.0 { 1.0 } else { 0.0 });
                grad_output.mul(&mask)
            }
            Function::Square => grad_output.mul(&saved.mul_scalar(2.0)),
        })?;
        Ok(grads)
    }

    fn inputs(&self) -> Vec<NodeId> {
        input_ids(&[&self.input])
    }

    fn name(&self) -> &'static str {
        self.function.name()
    }
}

impl TrackedTensor {
    fn unary(&self, function: Function, result: Tensor) -> TrackedTensor {
        let saved = if function.saves_output() {
            &result
        } else {
            self.tensor()
        };
        let saved = SavedTensor::new(saved);
        track(&[self], result, || {
            Box::new(UnaryBackward {
                input: Operand::of(self),
                function,
                saved,
            })
        })
    }

    pub fn exp(&self) -> TrackedTensor {
        self.unary(Function::Exp, self.tensor().exp())
    }

    pub fn log(&self) -> TrackedTensor {
        self.unary(Function::Log, self.tensor().log())
    }

    pub fn tanh(&self) -> TrackedTensor {
        self.unary(Function::Tanh, self.tensor().tanh())
    }

    pub fn sigmoid(&self) -> TrackedTensor {
        self.unary(Function::Sigmoid, self.tensor().sigmoid())
    }

    pub fn relu(&self) -> TrackedTensor {
        self.unary(Function::Relu, self.tensor().relu())
    }

    pub fn square(&self) -> TrackedTensor {
        self.unary(Function::Square, self.tensor().square())
    }
}
