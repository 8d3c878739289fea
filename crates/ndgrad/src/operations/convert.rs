//! Conversions: dtype, device, layout compaction and plain-Rust exports.

use crate::device::Device;
use crate::dtype::DType;
use crate::error::TensorError;
use crate::strides::numel;
use crate::tensor::Tensor;

impl Tensor {
    /// Convert to `dtype`, casting every value.
    ///
    /// Returns a view of `self` when the dtype already matches; otherwise the
    /// result owns new storage.
    ///
    /// ```
    /// use ndgrad::{DType, Tensor};
    ///
    /// let t = Tensor::from_vec(vec![1.7, -2.2], &[2]).unwrap();
    /// let short = t.to_dtype(DType::I16);
    /// assert_eq!(short.to_vec(), vec![1.0, -2.0]);
    /// assert!(!short.shares_storage_with(&t));
    /// ```
    pub fn to_dtype(&self, dtype: DType) -> Tensor {
        if dtype == self.dtype() {
            return self.clone();
        }
        Tensor::from_values(self.to_vec(), self.shape(), dtype, self.device())
    }

    /// Move to `device`.
    ///
    /// Returns a view of `self` when already on `device`; otherwise the data
    /// is copied into a new storage tagged with the target device.
    pub fn to_device(&self, device: Device) -> Tensor {
        if device == self.device() {
            return self.clone();
        }
        tracing::debug!(from = %self.device(), to = %device, numel = self.numel(), "device transfer");
        Tensor::from_values(self.to_vec(), self.shape(), self.dtype(), device)
    }

    /// A contiguous tensor with the same values: `self` if already
    /// contiguous, otherwise a compacted copy.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }
        self.deep_clone()
    }

    /// Copy into a fresh, compact storage.
    pub fn deep_clone(&self) -> Tensor {
        Tensor::from_values(self.to_vec(), self.shape(), self.dtype(), self.device())
    }

    /// Reshape: a view when the layout allows it, a copy otherwise.
    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor, TensorError> {
        if numel(shape) != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.numel(),
                actual: numel(shape),
            });
        }
        self.contiguous().view(shape)
    }

    /// Convert a 2D tensor to nested rows.
    ///
    /// # Errors
    ///
    /// Returns error if the tensor is not 2D.
    pub fn to_nested_vec_2d(&self) -> Result<Vec<Vec<f64>>, TensorError> {
        if self.ndim() != 2 {
            return Err(TensorError::RankMismatch {
                expected: 2,
                actual: self.ndim(),
            });
        }
        let ncols = self.shape()[1];
        if ncols == 0 {
            return Ok(vec![Vec::new(); self.shape()[0]]);
        }
        Ok(self.to_vec().chunks(ncols).map(<[f64]>::to_vec).collect())
    }
}

/// Element-wise comparison `|a - b| <= atol + rtol * |b|`, after broadcasting.
pub fn allclose(a: &Tensor, b: &Tensor, rtol: f64, atol: f64) -> Result<bool, TensorError> {
    let diff = a.sub(b)?;
    let tol = b.abs().mul_scalar(rtol).add_scalar(atol);
    let within = diff
        .abs()
        .to_vec()
        .into_iter()
        .zip(tol.expand(diff.shape())?.to_vec())
        .all(|(d, t)| d <= t);
    Ok(within)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_dtype_same_is_view() {
        let t = Tensor::ones(&[2]);
        assert!(t.to_dtype(DType::F32).shares_storage_with(&t));
    }

    #[test]
    fn test_to_dtype_double_keeps_f32_values() {
        let t = Tensor::from_vec(vec![0.1], &[1]).unwrap();
        let d = t.to_dtype(DType::F64);
        assert_eq!(d.dtype(), DType::F64);
        assert_eq!(d.to_vec(), vec![0.1f32 as f64]);
    }

    #[test]
    fn test_to_device_copies() {
        let t = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let moved = t.to_device(Device::Accel(0));
        assert_eq!(moved.device(), Device::Accel(0));
        assert!(!moved.shares_storage_with(&t));
        assert_eq!(moved.to_vec(), t.to_vec());

        let back = moved.to_device(Device::Cpu);
        assert_eq!(back.device(), Device::Cpu);
        assert!(t.to_device(Device::Cpu).shares_storage_with(&t));
    }

    #[test]
    fn test_contiguous_compacts_transpose() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
        let tt = t.t().unwrap();
        assert!(!tt.is_contiguous());
        let c = tt.contiguous();
        assert!(c.is_contiguous());
        assert_eq!(c.strides(), &[3, 1]);
        assert!(!c.shares_storage_with(&t));
        assert_eq!(c.to_vec(), tt.to_vec());
        assert!(c.view(&[6]).is_ok());
    }

    #[test]
    fn test_reshape_view_or_copy() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        assert!(t.reshape(&[3, 2]).unwrap().shares_storage_with(&t));
        let tt = t.t().unwrap();
        let r = tt.reshape(&[6]).unwrap();
        assert!(!r.shares_storage_with(&t));
        assert_eq!(r.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn test_to_nested_vec_2d() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let nested = t.to_nested_vec_2d().unwrap();
        assert_eq!(nested, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert!(Tensor::ones(&[3]).to_nested_vec_2d().is_err());
    }

    #[test]
    fn test_allclose() {
        let a = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let b = Tensor::from_vec(vec![1.0, 2.000001], &[2]).unwrap();
        assert!(allclose(&a, &b, 1e-5, 1e-8).unwrap());
        let c = Tensor::from_vec(vec![1.0, 2.1], &[2]).unwrap();
        assert!(!allclose(&a, &c, 1e-5, 1e-8).unwrap());
    }
}
