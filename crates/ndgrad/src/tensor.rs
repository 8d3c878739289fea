//! N-dimensional tensor: a strided view onto a shared [`Storage`].
//!
//! ```text
//! Tensor
//! ├── storage: Storage  (shared, reference counted)
//! └── layout:  Layout   (shape, strides, offset)
//! ```
//!
//! Every method in the "views" group returns a tensor that points at the
//! same storage; nothing is copied. Methods with a trailing underscore write
//! through the storage, so all views observe the change.

use crate::device::Device;
use crate::dtype::DType;
use crate::error::TensorError;
use crate::layout::Layout;
use crate::storage::Storage;
use crate::strides::numel;

/// A strided view onto a storage buffer.
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    layout: Layout,
}

impl Tensor {
    pub(crate) fn from_parts(storage: Storage, layout: Layout) -> Self {
        debug_assert!(
            layout
                .max_storage_index()
                .is_none_or(|max| max < storage.len())
        );
        Self { storage, layout }
    }

    /// Fresh contiguous tensor holding `values` (already in row-major order).
    pub(crate) fn from_values(values: Vec<f64>, shape: &[usize], dtype: DType, device: Device) -> Self {
        debug_assert_eq!(values.len(), numel(shape));
        Self {
            storage: Storage::from_vec(values, dtype, device),
            layout: Layout::from_shape(shape),
        }
    }

    /// Create a zero-initialized `f32` tensor on the CPU.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.numel(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full_with(shape, 0.0, DType::default(), Device::default())
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full_with(shape, 1.0, DType::default(), Device::default())
    }

    /// Create a tensor filled with `value`.
    pub fn full(shape: &[usize], value: f64) -> Self {
        Self::full_with(shape, value, DType::default(), Device::default())
    }

    pub fn full_with(shape: &[usize], value: f64, dtype: DType, device: Device) -> Self {
        Self::from_values(vec![value; numel(shape)], shape, dtype, device)
    }

    pub fn zeros_like(other: &Tensor) -> Self {
        Self::full_with(other.shape(), 0.0, other.dtype(), other.device())
    }

    pub fn ones_like(other: &Tensor) -> Self {
        Self::full_with(other.shape(), 1.0, other.dtype(), other.device())
    }

    /// Create an `f32` tensor from row-major data.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let points = Tensor::from_vec(vec![4.0, 1.0, 5.0, 3.0, 2.0, 1.0], &[3, 2]).unwrap();
    /// assert_eq!(points.get(&[0, 1]), Some(1.0));
    /// assert_eq!(points.get(&[1, 0]), Some(5.0));
    /// assert_eq!(points.strides(), &[2, 1]);
    /// ```
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> Result<Self, TensorError> {
        Self::from_vec_with(data, shape, DType::default(), Device::default())
    }

    pub fn from_vec_with(
        data: Vec<f64>,
        shape: &[usize],
        dtype: DType,
        device: Device,
    ) -> Result<Self, TensorError> {
        let expected = numel(shape);
        if data.len() != expected {
            return Err(TensorError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_values(data, shape, dtype, device))
    }

    /// Rank-0 tensor holding a single value.
    pub fn scalar(value: f64) -> Self {
        Self::full(&[], value)
    }

    /// 1-D tensor `start, start + step, ...` up to (excluding) `end`.
    pub fn arange(start: f64, end: f64, step: f64) -> Result<Self, TensorError> {
        if step == 0.0 || !step.is_finite() {
            return Err(TensorError::InvalidOperation(format!(
                "arange step must be finite and non-zero, got {step}"
            )));
        }
        let count = ((end - start) / step).ceil().max(0.0) as usize;
        let data: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
        Ok(Self::from_values(data, &[count], DType::default(), Device::default()))
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Number of logical elements in the view.
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.numel()
    }

    /// Strides in elements, one per dimension.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        self.layout.strides()
    }

    /// Storage index of element `[0, ..., 0]`.
    #[inline]
    pub fn storage_offset(&self) -> usize {
        self.layout.offset()
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The underlying storage handle (shared with every other view).
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn device(&self) -> Device {
        self.storage.device()
    }

    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    pub fn shares_storage_with(&self, other: &Tensor) -> bool {
        self.storage.shares_storage_with(&other.storage)
    }

    /// Element at `indices`, or `None` if out of bounds.
    pub fn get(&self, indices: &[usize]) -> Option<f64> {
        let i = self.layout.index_of(indices).ok()?;
        self.storage.get(i)
    }

    /// Value of a single-element tensor.
    pub fn item(&self) -> Result<f64, TensorError> {
        if self.numel() != 1 {
            return Err(TensorError::InvalidOperation(format!(
                "a tensor with {} elements cannot be converted to a scalar",
                self.numel()
            )));
        }
        let data = self.storage.borrow();
        Ok(data[self.layout.offset()])
    }

    /// Logical elements in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        let data = self.storage.borrow();
        self.layout.storage_indices().map(|i| data[i]).collect()
    }

    fn with_layout(&self, layout: Layout) -> Self {
        Self {
            storage: self.storage.clone(),
            layout,
        }
    }

    // ---- views -------------------------------------------------------------

    /// Index dimension `dim` at `index`, dropping that dimension.
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let points = Tensor::from_vec(vec![4.0, 1.0, 5.0, 3.0, 2.0, 1.0], &[3, 2]).unwrap();
    /// let second = points.select(0, 1).unwrap();
    /// assert_eq!(second.storage_offset(), 2);
    /// assert_eq!(second.to_vec(), vec![5.0, 3.0]);
    /// assert!(second.shares_storage_with(&points));
    /// ```
    pub fn select(&self, dim: usize, index: usize) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.select(dim, index)?))
    }

    /// Slice `start..start + len` along `dim`.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.narrow(dim, start, len)?))
    }

    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.transpose(dim0, dim1)?))
    }

    /// Matrix transpose. Only defined for tensors of rank 2 or lower.
    pub fn t(&self) -> Result<Self, TensorError> {
        match self.ndim() {
            0 | 1 => Ok(self.clone()),
            2 => self.transpose(0, 1),
            n => Err(TensorError::InvalidOperation(format!(
                "t() expects a tensor with <= 2 dimensions, but self is {n}D"
            ))),
        }
    }

    pub fn permute(&self, perm: &[usize]) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.permute(perm)?))
    }

    /// Reinterpret under `shape` without copying. Fails on non-contiguous views.
    pub fn view(&self, shape: &[usize]) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.view(shape)?))
    }

    pub fn unsqueeze(&self, dim: usize) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.unsqueeze(dim)?))
    }

    pub fn squeeze(&self, dim: usize) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.squeeze(dim)?))
    }

    /// Broadcast to `shape` using zero strides.
    pub fn expand(&self, shape: &[usize]) -> Result<Self, TensorError> {
        Ok(self.with_layout(self.layout.broadcast_to(shape)?))
    }

    // ---- in-place ----------------------------------------------------------

    /// Write `value` at `indices`.
    pub fn set(&self, indices: &[usize], value: f64) -> Result<(), TensorError> {
        let i = self.layout.index_of(indices)?;
        self.storage.set(i, value)
    }

    /// Fill every element of the view with `value`.
    pub fn fill_(&self, value: f64) {
        let indices: Vec<usize> = self.layout.storage_indices().collect();
        self.storage.write(|data| {
            for i in indices {
                data[i] = value;
            }
        });
    }

    pub fn zero_(&self) {
        self.fill_(0.0);
    }

    /// Copy `src` (broadcast to this view's shape) into this view.
    pub fn copy_(&self, src: &Tensor) -> Result<(), TensorError> {
        let values = src.expand(self.shape())?.to_vec();
        self.assign_values(values);
        Ok(())
    }

    /// In-place `self += other`.
    pub fn add_(&self, other: &Tensor) -> Result<(), TensorError> {
        self.update_with(other, |a, b| a + b)
    }

    /// In-place `self -= other`.
    pub fn sub_(&self, other: &Tensor) -> Result<(), TensorError> {
        self.update_with(other, |a, b| a - b)
    }

    /// In-place `self *= scalar`.
    pub fn mul_scalar_(&self, scalar: f64) {
        let updated: Vec<f64> = self.to_vec().into_iter().map(|x| x * scalar).collect();
        self.assign_values(updated);
    }

    fn update_with(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Result<(), TensorError> {
        if self.device() != other.device() {
            return Err(TensorError::DeviceMismatch {
                lhs: self.device(),
                rhs: other.device(),
            });
        }
        let rhs = other.expand(self.shape())?.to_vec();
        let updated: Vec<f64> = self
            .to_vec()
            .into_iter()
            .zip(rhs)
            .map(|(a, b)| f(a, b))
            .collect();
        self.assign_values(updated);
        Ok(())
    }

    /// Write logical-order `values` back through this view.
    fn assign_values(&self, values: Vec<f64>) {
        let indices: Vec<usize> = self.layout.storage_indices().collect();
        self.storage.write(|data| {
            for (i, v) in indices.into_iter().zip(values) {
                data[i] = v;
            }
        });
    }
}
