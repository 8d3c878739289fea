use super::{Optimizer, check_params};
use crate::autodiff::{TrackedTensor, no_grad};
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Stochastic gradient descent with optional momentum.
#[derive(Debug, Clone)]
pub struct Sgd {
    params: Vec<TrackedTensor>,
    lr: f64,
    momentum: f64,
    velocity: Vec<Option<Tensor>>,
}

impl Sgd {
    pub fn new(params: Vec<TrackedTensor>, lr: f64) -> Result<Self, TensorError> {
        Self::with_momentum(params, lr, 0.0)
    }

    pub fn with_momentum(
        params: Vec<TrackedTensor>,
        lr: f64,
        momentum: f64,
    ) -> Result<Self, TensorError> {
        check_params(&params)?;
        let velocity = vec![None; params.len()];
        Ok(Self {
            params,
            lr,
            momentum,
            velocity,
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

impl Optimizer for Sgd {
    fn step(&mut self) -> Result<(), TensorError> {
        no_grad(|| -> Result<(), TensorError> {
            for (param, velocity) in self.params.iter().zip(self.velocity.iter_mut()) {
                let Some(grad) = param.grad() else {
                    continue;
                };
                let direction = if self.momentum == 0.0 {
                    grad
                } else {
                    let next = match velocity.take() {
                        Some(v) => v.mul_scalar(self.momentum).add(&grad)?,
                        None => grad.deep_clone(),
                    };
                    *velocity = Some(next.clone());
                    next
                };
                param.sub_(&direction.mul_scalar(self.lr))?;
            }
            tracing::trace!(lr = self.lr, params = self.params.len(), "sgd step");
            Ok(())
        })
    }

    fn params(&self) -> &[TrackedTensor] {
        &self.params
    }
}
