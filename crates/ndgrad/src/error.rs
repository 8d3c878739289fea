//! Error types for ndgrad.

use crate::device::Device;
use thiserror::Error;

/// Errors that can occur in tensor and autograd operations.
#[derive(Debug, Error)]
pub enum TensorError {
    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// Wrong number of indices provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Invalid permutation.
    #[error("invalid permutation {perm:?} for tensor with {ndim} dimensions")]
    InvalidPermutation { perm: Vec<usize>, ndim: usize },

    /// Dimension argument outside `0..ndim`.
    #[error("dimension {dim} out of range for tensor with {ndim} dimensions")]
    InvalidDimension { dim: usize, ndim: usize },

    /// Operation requires a specific tensor rank.
    #[error("expected tensor of rank {expected}, got rank {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// Slice range out of bounds.
    #[error("slice range {start}..{end} out of bounds for dimension {dim} with size {size}")]
    SliceOutOfBounds {
        start: usize,
        end: usize,
        dim: usize,
        size: usize,
    },

    /// Shapes cannot be broadcast together.
    #[error("incompatible shapes {lhs:?} and {rhs:?} for {op}")]
    IncompatibleShapes {
        lhs: Vec<usize>,
        rhs: Vec<usize>,
        op: String,
    },

    /// A view was requested over a layout that cannot express it.
    #[error(
        "view size is not compatible with input tensor's size and stride \
         (shape {shape:?}, strides {strides:?}); use reshape() instead"
    )]
    NotContiguous {
        shape: Vec<usize>,
        strides: Vec<usize>,
    },

    /// Operands live on different devices.
    #[error("expected all tensors to be on the same device, found {lhs} and {rhs}")]
    DeviceMismatch { lhs: Device, rhs: Device },

    /// Conversion to a plain array was requested on a graph-attached tensor.
    #[error("can't export a tensor that requires grad; call detach() first")]
    RequiresGrad,

    /// Gradient tracking requested on a non floating-point tensor.
    #[error("only floating point tensors can require gradients, got dtype {dtype}")]
    NonFloatGrad { dtype: crate::dtype::DType },

    /// Backward called on a tensor with no autograd history.
    #[error("element 0 of tensors does not require grad and does not have a grad_fn")]
    NoGradFn,

    /// Backward attempted through nodes released by an earlier backward.
    #[error(
        "trying to backward through the graph a second time; \
         pass retain_graph = true on the first backward call"
    )]
    GraphReleased,

    /// A value saved for backward was overwritten by an in-place operation.
    #[error(
        "a tensor needed for gradient computation has been modified by an \
         in-place operation (saved at version {saved}, now at version {current})"
    )]
    ModifiedInPlace { saved: u64, current: u64 },

    /// Generic invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O failure while saving or loading a tensor.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed tensor file.
    #[error("tensor serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
