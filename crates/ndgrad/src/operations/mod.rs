//! Tensor operations.
//!
//! Every operation here reads its inputs through their layouts (so views,
//! transposes and broadcasts are all accepted) and writes a fresh,
//! contiguous result:
//!
//! ```text
//! inputs (any layout) ─► broadcast / gather ─► compute ─► new Storage
//! ```
//!
//! Most operations are exposed both as `Tensor` methods and, where useful,
//! as free functions.

mod convert;
mod elementwise;
mod matmul;
mod reduce;

pub use convert::allclose;
pub use elementwise::{apply_binary, apply_unary};
pub use matmul::matmul;
