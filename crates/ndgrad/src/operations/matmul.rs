//! Matrix multiplication using faer.
//!
//! Tensors are row-major while faer matrices built from slices are
//! column-major. A row-major `m x k` buffer is exactly the column-major
//! buffer of its `k x m` transpose, so `C = A B` is computed as
//! `C^T = B^T A^T` directly on the row-major buffers.

use faer::linalg::matmul::matmul as faer_matmul;
use faer::{Accum, MatMut, MatRef, Par};

use crate::dtype::DType;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Multiply row-major `a` (`m x k`) by row-major `b` (`k x n`).
fn gemm_row_major(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    let a_t = MatRef::from_column_major_slice(a, k, m);
    let b_t = MatRef::from_column_major_slice(b, n, k);
    let mut c_t = MatMut::from_column_major_slice_mut(&mut c, n, m);

    // C^T = 1 * B^T A^T
    faer_matmul(c_t.as_mut(), Accum::Replace, b_t, a_t, 1.0, Par::Seq);
    c
}

/// Matrix product of two tensors of rank 1 or 2.
///
/// A rank-1 left operand is treated as a row vector and a rank-1 right
/// operand as a column vector; the added dimension is removed from the
/// result.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::matmul;
///
/// let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let b = Tensor::ones(&[3, 2]);
/// let c = matmul(&a, &b).unwrap();
/// assert_eq!(c.shape(), &[2, 2]);
/// assert_eq!(c.to_vec(), vec![6.0, 6.0, 15.0, 15.0]);
/// ```
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    if a.device() != b.device() {
        return Err(TensorError::DeviceMismatch {
            lhs: a.device(),
            rhs: b.device(),
        });
    }
    for t in [a, b] {
        if t.ndim() == 0 || t.ndim() > 2 {
            return Err(TensorError::RankMismatch {
                expected: 2,
                actual: t.ndim(),
            });
        }
    }

    let a_vec = a.ndim() == 1;
    let b_vec = b.ndim() == 1;
    let (m, k) = if a_vec { (1, a.shape()[0]) } else { (a.shape()[0], a.shape()[1]) };
    let (k2, n) = if b_vec { (b.shape()[0], 1) } else { (b.shape()[0], b.shape()[1]) };
    if k != k2 {
        return Err(TensorError::IncompatibleShapes {
            lhs: a.shape().to_vec(),
            rhs: b.shape().to_vec(),
            op: "matmul".to_string(),
        });
    }

    let c = gemm_row_major(&a.to_vec(), &b.to_vec(), m, k, n);

    let mut shape = Vec::with_capacity(2);
    if !a_vec {
        shape.push(m);
    }
    if !b_vec {
        shape.push(n);
    }
    let dtype = DType::promote(a.dtype(), b.dtype());
    Ok(Tensor::from_values(c, &shape, dtype, a.device()))
}

impl Tensor {
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        matmul(self, other)
    }
}
