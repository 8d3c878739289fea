//! Gradient-descent optimizers over leaf parameters.
//!
//! An optimizer owns handles to its parameters. `step` reads each leaf's
//! accumulated gradient and updates the parameter storage in place with
//! recording disabled, so every view of a parameter sees the new values.

mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use crate::autodiff::TrackedTensor;
use crate::error::TensorError;

pub trait Optimizer {
    /// Apply one update using the gradients currently accumulated on the
    /// parameters. Parameters without a gradient are skipped.
    fn step(&mut self) -> Result<(), TensorError>;

    /// Zero every parameter's gradient in place.
    fn zero_grad(&mut self) {
        for param in self.params() {
            param.zero_grad();
        }
    }

    fn params(&self) -> &[TrackedTensor];
}

/// Parameters must be leaves that require gradient.
fn check_params(params: &[TrackedTensor]) -> Result<(), TensorError> {
    for param in params {
        if !param.requires_grad() || !param.is_leaf() {
            return Err(TensorError::InvalidOperation(
                "optimizer parameters must be leaf tensors that require grad".to_string(),
            ));
        }
    }
    Ok(())
}
