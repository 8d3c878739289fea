//! ndgrad - strided tensors with reverse-mode automatic differentiation
//!
//! A tensor is a shaped, strided, offset window onto a shared storage
//! buffer. Views (`select`, `narrow`, `transpose`, `view`, ...) never copy;
//! writes through any view are visible to every other view of the same
//! storage. On top of that, [`autodiff`] records operations on
//! [`TrackedTensor`]s and computes gradients by traversing the recorded
//! graph backwards.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Storage    → shared, versioned buffer tagged with dtype + device
//! Level 2: Tensor     → Storage + Layout (shape, strides, offset)
//! Level 3: operations → elementwise, reductions, matmul (faer), conversions
//! Level 4: autodiff   → TrackedTensor, thread-local graph, backward
//!          optim      → Sgd, Adam
//! ```
//!
//! # Example
//!
//! ```
//! use ndgrad::Tensor;
//!
//! let points = Tensor::from_vec(vec![4.0, 1.0, 5.0, 3.0, 2.0, 1.0], &[3, 2]).unwrap();
//! assert_eq!(points.strides(), &[2, 1]);
//!
//! // A view onto the second point shares the storage
//! let second = points.select(0, 1).unwrap();
//! assert_eq!(second.storage_offset(), 2);
//! second.set(&[0], 10.0).unwrap();
//! assert_eq!(points.get(&[1, 0]), Some(10.0));
//!
//! // Transposing swaps strides, no copy
//! let t = points.t().unwrap();
//! assert_eq!(t.strides(), &[1, 2]);
//! assert!(t.shares_storage_with(&points));
//! ```

pub mod autodiff;
pub mod device;
mod display;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod operations;
pub mod optim;
mod random;
mod serialize;
pub mod storage;
pub mod strides;
pub mod tensor;

pub use autodiff::{TrackedTensor, backward, no_grad};
pub use device::Device;
pub use dtype::DType;
pub use error::TensorError;
pub use layout::Layout;
pub use operations::{allclose, matmul};
pub use storage::Storage;
pub use tensor::Tensor;
