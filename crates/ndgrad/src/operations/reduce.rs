//! Reductions.

use crate::dtype::DType;
use crate::error::TensorError;
use crate::strides::{broadcast_shape, compute_strides, linear_to_cartesian, numel};
use crate::tensor::Tensor;

/// Accumulator dtype for sums: integers and bools widen to `I64`.
fn sum_dtype(dtype: DType) -> DType {
    if dtype.is_float() { dtype } else { DType::I64 }
}

fn require_float(tensor: &Tensor, op: &str) -> Result<(), TensorError> {
    if !tensor.dtype().is_float() {
        return Err(TensorError::InvalidOperation(format!(
            "{op}() could not infer output dtype: input dtype should be floating point, got {}",
            tensor.dtype()
        )));
    }
    Ok(())
}

impl Tensor {
    /// Sum of all elements as a rank-0 tensor.
    pub fn sum(&self) -> Tensor {
        let total: f64 = self.to_vec().iter().sum();
        Tensor::from_values(vec![total], &[], sum_dtype(self.dtype()), self.device())
    }

    /// Mean of all elements. Only defined for floating-point tensors.
    pub fn mean(&self) -> Result<Tensor, TensorError> {
        require_float(self, "mean")?;
        let n = self.numel() as f64;
        let total: f64 = self.to_vec().iter().sum();
        Ok(Tensor::from_values(vec![total / n], &[], self.dtype(), self.device()))
    }

    /// Largest element, or an error for an empty tensor. NaN propagates.
    pub fn max(&self) -> Result<Tensor, TensorError> {
        let max = self
            .to_vec()
            .into_iter()
            .reduce(|acc, x| if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.max(x) })
            .ok_or_else(|| TensorError::InvalidOperation("max() of an empty tensor".to_string()))?;
        Ok(Tensor::from_values(vec![max], &[], self.dtype(), self.device()))
    }

    /// Sum along `dim`. With `keepdim` the reduced dimension stays with size 1.
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.sum_dim(0, false).unwrap().to_vec(), vec![5.0, 7.0, 9.0]);
    /// assert_eq!(t.sum_dim(1, true).unwrap().shape(), &[2, 1]);
    /// ```
    pub fn sum_dim(&self, dim: usize, keepdim: bool) -> Result<Tensor, TensorError> {
        if dim >= self.ndim() {
            return Err(TensorError::InvalidDimension {
                dim,
                ndim: self.ndim(),
            });
        }
        let mut kept_shape = self.shape().to_vec();
        kept_shape[dim] = 1;
        let out = self.reduce_into(&kept_shape);
        let out = Tensor::from_values(out, &kept_shape, sum_dtype(self.dtype()), self.device());
        if keepdim { Ok(out) } else { out.squeeze(dim) }
    }

    /// Mean along `dim`. Only defined for floating-point tensors.
    pub fn mean_dim(&self, dim: usize, keepdim: bool) -> Result<Tensor, TensorError> {
        require_float(self, "mean")?;
        let n = self.shape().get(dim).copied().unwrap_or(1) as f64;
        Ok(self.sum_dim(dim, keepdim)?.mul_scalar(1.0 / n))
    }

    /// Sum a broadcast result back down to `shape`.
    ///
    /// `shape` must be broadcastable to `self.shape()`. Leading dimensions
    /// are summed away and dimensions of size 1 in `shape` are summed with
    /// keepdim.
    pub fn sum_to_shape(&self, shape: &[usize]) -> Result<Tensor, TensorError> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        if broadcast_shape(shape, self.shape())? != self.shape() {
            return Err(TensorError::IncompatibleShapes {
                lhs: self.shape().to_vec(),
                rhs: shape.to_vec(),
                op: "sum_to_shape".to_string(),
            });
        }
        let out = self.reduce_into(shape);
        Ok(Tensor::from_values(out, shape, sum_dtype(self.dtype()), self.device()))
    }

    /// Accumulate every element into `target`, aligned from the right;
    /// target dimensions of size 1 (or missing) collapse.
    fn reduce_into(&self, target: &[usize]) -> Vec<f64> {
        let rank_diff = self.ndim() - target.len();
        let target_strides = compute_strides(target);
        let mut out = vec![0.0; numel(target)];

        for (linear, value) in self.to_vec().into_iter().enumerate() {
            let index = linear_to_cartesian(linear, self.shape());
            let dst: usize = target
                .iter()
                .zip(target_strides.iter())
                .enumerate()
                .map(|(j, (&size, &stride))| {
                    if size == 1 { 0 } else { index[j + rank_diff] * stride }
                })
                .sum();
            out[dst] += value;
        }
        out
    }
}
