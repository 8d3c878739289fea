//! Element-wise tensor operations with broadcasting.

use crate::dtype::DType;
use crate::error::TensorError;
use crate::strides::broadcast_shape;
use crate::tensor::Tensor;

/// Dtype of an operation that always produces floating-point values.
fn float_result(dtype: DType) -> DType {
    if dtype.is_float() { dtype } else { DType::F32 }
}

/// Apply `f` pairwise after broadcasting `a` and `b` to a common shape.
///
/// The result is a fresh contiguous tensor with the promoted dtype.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::apply_binary;
///
/// let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3, 1]).unwrap();
/// let b = Tensor::from_vec(vec![10.0, 20.0], &[2]).unwrap();
/// let c = apply_binary(&a, &b, |x, y| x + y).unwrap();
/// assert_eq!(c.shape(), &[3, 2]);
/// assert_eq!(c.to_vec(), vec![11.0, 21.0, 12.0, 22.0, 13.0, 23.0]);
/// ```
pub fn apply_binary(
    a: &Tensor,
    b: &Tensor,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Tensor, TensorError> {
    let dtype = DType::promote(a.dtype(), b.dtype());
    binary_with_dtype(a, b, dtype, f)
}

fn binary_with_dtype(
    a: &Tensor,
    b: &Tensor,
    dtype: DType,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Tensor, TensorError> {
    if a.device() != b.device() {
        return Err(TensorError::DeviceMismatch {
            lhs: a.device(),
            rhs: b.device(),
        });
    }
    let shape = broadcast_shape(a.shape(), b.shape())?;
    let lhs = a.expand(&shape)?.to_vec();
    let rhs = b.expand(&shape)?.to_vec();
    let data: Vec<f64> = lhs.into_iter().zip(rhs).map(|(x, y)| f(x, y)).collect();
    Ok(Tensor::from_values(data, &shape, dtype, a.device()))
}

/// Apply `f` to every element, keeping the dtype.
pub fn apply_unary(tensor: &Tensor, f: impl Fn(f64) -> f64) -> Tensor {
    map_with_dtype(tensor, tensor.dtype(), f)
}

fn map_with_dtype(tensor: &Tensor, dtype: DType, f: impl Fn(f64) -> f64) -> Tensor {
    let data: Vec<f64> = tensor.to_vec().into_iter().map(f).collect();
    Tensor::from_values(data, tensor.shape(), dtype, tensor.device())
}

impl Tensor {
    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        apply_binary(self, other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        apply_binary(self, other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        apply_binary(self, other, |a, b| a * b)
    }

    /// True division; integer operands produce an `f32` result.
    pub fn div(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        let dtype = float_result(DType::promote(self.dtype(), other.dtype()));
        binary_with_dtype(self, other, dtype, |a, b| a / b)
    }

    pub fn maximum(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        apply_binary(self, other, f64::max)
    }

    pub fn add_scalar(&self, scalar: f64) -> Tensor {
        apply_unary(self, |x| x + scalar)
    }

    pub fn mul_scalar(&self, scalar: f64) -> Tensor {
        apply_unary(self, |x| x * scalar)
    }

    pub fn pow_scalar(&self, exponent: f64) -> Tensor {
        apply_unary(self, |x| x.powf(exponent))
    }

    pub fn neg(&self) -> Tensor {
        apply_unary(self, |x| -x)
    }

    pub fn abs(&self) -> Tensor {
        apply_unary(self, f64::abs)
    }

    pub fn square(&self) -> Tensor {
        apply_unary(self, |x| x * x)
    }

    pub fn relu(&self) -> Tensor {
        apply_unary(self, |x| x.max(0.0))
    }

    pub fn exp(&self) -> Tensor {
        map_with_dtype(self, float_result(self.dtype()), f64::exp)
    }

    pub fn log(&self) -> Tensor {
        map_with_dtype(self, float_result(self.dtype()), f64::ln)
    }

    pub fn sqrt(&self) -> Tensor {
        map_with_dtype(self, float_result(self.dtype()), f64::sqrt)
    }

    pub fn tanh(&self) -> Tensor {
        map_with_dtype(self, float_result(self.dtype()), f64::tanh)
    }

    pub fn sigmoid(&self) -> Tensor {
        map_with_dtype(self, float_result(self.dtype()), |x| 1.0 / (1.0 + (-x).exp()))
    }
}
