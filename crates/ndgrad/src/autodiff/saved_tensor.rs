//! Saved tensor for backward pass.

use crate::error::TensorError;
use crate::tensor::Tensor;

/// A tensor captured during the forward pass for use in backward.
///
/// Holds a view (not a copy) plus the storage version at save time. If the
/// storage is written before backward runs, [`materialize`](Self::materialize)
/// refuses to hand out the stale value.
#[derive(Debug, Clone)]
pub struct SavedTensor {
    tensor: Tensor,
    version: u64,
}

impl SavedTensor {
    pub fn new(tensor: &Tensor) -> Self {
        Self {
            tensor: tensor.clone(),
            version: tensor.storage().version(),
        }
    }

    /// Get the saved tensor, checking it was not modified in place.
    pub fn materialize(&self) -> Result<Tensor, TensorError> {
        let current = self.tensor.storage().version();
        if current != self.version {
            return Err(TensorError::ModifiedInPlace {
                saved: self.version,
                current,
            });
        }
        Ok(self.tensor.clone())
    }

    /// Storage version recorded at save time.
    pub fn version(&self) -> u64 {
        self.version
    }
}
