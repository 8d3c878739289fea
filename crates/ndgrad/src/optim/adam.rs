use super::{Optimizer, check_params};
use crate::autodiff::{TrackedTensor, no_grad};
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Adam with bias-corrected moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    params: Vec<TrackedTensor>,
    lr: f64,
    betas: (f64, f64),
    eps: f64,
    t: i32,
    m: Vec<Tensor>,
    v: Vec<Tensor>,
}

impl Adam {
    /// Adam with the usual defaults: betas (0.9, 0.999), eps 1e-8.
    pub fn new(params: Vec<TrackedTensor>, lr: f64) -> Result<Self, TensorError> {
        Self::with_options(params, lr, (0.9, 0.999), 1e-8)
    }

    pub fn with_options(
        params: Vec<TrackedTensor>,
        lr: f64,
        betas: (f64, f64),
        eps: f64,
    ) -> Result<Self, TensorError> {
        check_params(&params)?;
        let m = params.iter().map(|p| Tensor::zeros_like(p.tensor())).collect();
        let v = params.iter().map(|p| Tensor::zeros_like(p.tensor())).collect();
        Ok(Self {
            params,
            lr,
            betas,
            eps,
            t: 0,
            m,
            v,
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

impl Optimizer for Adam {
    fn step(&mut self) -> Result<(), TensorError> {
        self.t += 1;
        let (beta1, beta2) = self.betas;
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        no_grad(|| -> Result<(), TensorError> {
            for ((param, m), v) in self.params.iter().zip(&mut self.m).zip(&mut self.v) {
                let Some(grad) = param.grad() else {
                    continue;
                };
                // Update biased first moment estimate
                *m = m.mul_scalar(beta1).add(&grad.mul_scalar(1.0 - beta1))?;
                // Update biased second raw moment estimate
                *v = v.mul_scalar(beta2).add(&grad.square().mul_scalar(1.0 - beta2))?;

                let m_hat = m.mul_scalar(1.0 / bias1);
                let v_hat = v.mul_scalar(1.0 / bias2);
                let step = m_hat.div(&v_hat.sqrt().add_scalar(self.eps))?;
                param.sub_(&step.mul_scalar(self.lr))?;
            }
            tracing::trace!(lr = self.lr, t = self.t, "adam step");
            Ok(())
        })
    }

    fn params(&self) -> &[TrackedTensor] {
        &self.params
    }
}
