//! Host memory buffer behind a [`Storage`](super::Storage).

use crate::device::Device;
use crate::dtype::DType;

/// Flat element buffer with its dtype/device tags and a write counter.
///
/// Elements are held in `f64` lanes and are always normalized to `dtype`
/// (see [`DType::cast`]).
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer {
    data: Vec<f64>,
    dtype: DType,
    device: Device,
    version: u64,
}

impl HostBuffer {
    /// Create a zero-initialized buffer.
    pub fn zeros(len: usize, dtype: DType, device: Device) -> Self {
        Self {
            data: vec![0.0; len],
            dtype,
            device,
            version: 0,
        }
    }

    /// Create a buffer from values, normalizing each one to `dtype`.
    pub fn from_vec(mut data: Vec<f64>, dtype: DType, device: Device) -> Self {
        if dtype != DType::F64 {
            for x in data.iter_mut() {
                *x = dtype.cast(*x);
            }
        }
        Self {
            data,
            dtype,
            device,
            version: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutate the raw lanes. Values are re-normalized afterwards and the
    /// version counter is bumped.
    pub fn write<R>(&mut self, f: impl FnOnce(&mut [f64]) -> R) -> R {
        let out = f(&mut self.data);
        if self.dtype != DType::F64 {
            let dtype = self.dtype;
            for x in self.data.iter_mut() {
                *x = dtype.cast(*x);
            }
        }
        self.version += 1;
        out
    }
}
