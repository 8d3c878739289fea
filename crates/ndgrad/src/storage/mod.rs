//! Storage: the flat buffer every tensor view points into.
//!
//! ```text
//! Storage (Rc<RefCell<HostBuffer>>)
//! ├── Tensor a   shape [3, 2], strides [2, 1], offset 0
//! ├── Tensor a_t shape [2, 3], strides [1, 2], offset 0   (transpose)
//! └── Tensor p1  shape [2],    strides [1],    offset 2   (a.select(0, 1))
//! ```
//!
//! Cloning a `Storage` aliases the same buffer, so writes through one view
//! are visible through all the others. Storage is single-threaded (`Rc`), in
//! line with the thread-local autograd graph.

mod buffer;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

pub use buffer::HostBuffer;

use crate::device::Device;
use crate::dtype::DType;
use crate::error::TensorError;

/// Shared handle to a tensor's element buffer.
#[derive(Clone)]
pub struct Storage {
    inner: Rc<RefCell<HostBuffer>>,
}

impl Storage {
    /// Create storage with given length, zero-initialized.
    pub fn zeros(len: usize, dtype: DType, device: Device) -> Self {
        Self::from_buffer(HostBuffer::zeros(len, dtype, device))
    }

    /// Create storage from values; each value is normalized to `dtype`.
    pub fn from_vec(data: Vec<f64>, dtype: DType, device: Device) -> Self {
        Self::from_buffer(HostBuffer::from_vec(data, dtype, device))
    }

    fn from_buffer(buffer: HostBuffer) -> Self {
        Self {
            inner: Rc::new(RefCell::new(buffer)),
        }
    }

    /// Length of storage (number of elements).
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Check if storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        self.inner.borrow().dtype()
    }

    pub fn device(&self) -> Device {
        self.inner.borrow().device()
    }

    /// Number of writes performed on this buffer so far.
    pub fn version(&self) -> u64 {
        self.inner.borrow().version()
    }

    /// Size of the buffer in bytes for its dtype.
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype().size_in_bytes()
    }

    /// Element at storage index `i`.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.inner.borrow().as_slice().get(i).copied()
    }

    /// Overwrite the element at storage index `i`.
    pub fn set(&self, i: usize, value: f64) -> Result<(), TensorError> {
        let len = self.len();
        if i >= len {
            return Err(TensorError::IndexOutOfBounds {
                index: i,
                dim_size: len,
            });
        }
        self.write(|data| data[i] = value);
        Ok(())
    }

    /// Borrow the raw element lanes.
    pub fn borrow(&self) -> Ref<'_, [f64]> {
        Ref::map(self.inner.borrow(), |b| b.as_slice())
    }

    /// Mutate the raw element lanes; every view of this storage sees the change.
    pub fn write<R>(&self, f: impl FnOnce(&mut [f64]) -> R) -> R {
        self.inner.borrow_mut().write(f)
    }

    /// Copy the whole buffer out, in storage order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.inner.borrow().as_slice().to_vec()
    }

    /// Check if two handles point at the same buffer.
    pub fn shares_storage_with(&self, other: &Storage) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles (tensor views) on this buffer.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Stable address of the buffer, for printing identity.
    pub fn data_ptr(&self) -> usize {
        self.inner.as_ptr() as usize
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.inner.borrow();
        f.debug_struct("Storage")
            .field("len", &buffer.len())
            .field("dtype", &buffer.dtype())
            .field("device", &buffer.device())
            .field("version", &buffer.version())
            .finish()
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.inner.borrow();
        for x in buffer.as_slice() {
            writeln!(f, " {}", x)?;
        }
        write!(
            f,
            "[storage of size {} dtype={} device={}]",
            buffer.len(),
            buffer.dtype(),
            buffer.device()
        )
    }
}
