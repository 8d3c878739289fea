//! Reverse-mode automatic differentiation.
//!
//! This module provides tape-based reverse-mode AD for tensor operations,
//! following a PyTorch-style API with a thread-local computation graph.
//!
//! # Architecture
//!
//! ```text
//! TrackedTensor  ──registers in──►  ComputationGraph (thread_local)
//!      │    │                            │          │
//!      │    └── grad cell ◄── weak ── leaves      nodes
//!      ▼                                            │
//!    Tensor                              MulBackward, MmBackward, ...
//!                                          (GradFn trait)
//!                                                   │
//!                                        SavedTensor (storage version)
//! ```
//!
//! # Example
//!
//! ```
//! use ndgrad::autodiff::{TrackedTensor, backward};
//! use ndgrad::Tensor;
//!
//! // Create leaf tensors that require gradients
//! let a = TrackedTensor::leaf(Tensor::ones(&[2, 3])).unwrap();
//! let b = TrackedTensor::leaf(Tensor::ones(&[3, 4])).unwrap();
//!
//! // Forward pass: C = A @ B, summed to a scalar loss
//! let loss = a.matmul(&b).unwrap().sum();
//!
//! // Backward pass accumulates into each leaf
//! backward(&loss).unwrap();
//! assert_eq!(a.grad().unwrap().shape(), &[2, 3]);
//! assert_eq!(b.grad().unwrap().to_vec(), vec![2.0; 12]);
//! ```
//!
//! # Key Types
//!
//! - [`TrackedTensor`]: Tensor with gradient tracking
//! - [`backward`]: Execute backward pass from scalar loss
//! - [`Gradients`]: Leaf gradients of a single backward pass
//! - [`no_grad`]: Run code without recording operations
//!
//! # Design Notes
//!
//! - Thread-local computation graph (no `Arc`, uses `Rc`)
//! - Gradient accumulation for multiple paths to same node
//! - Backward releases the nodes it traversed unless asked to retain them

mod backward;
mod grad_mode;
mod gradients;
mod graph;
mod ops;
mod saved_tensor;
mod tensor;

pub use backward::{BackwardOptions, backward, backward_with};
pub use grad_mode::{NoGradGuard, is_grad_enabled, no_grad, set_grad_enabled};
pub use gradients::Gradients;
pub use graph::{ComputationGraph, GradFn, Node, NodeId, clear_graph, graph_len, with_graph};
pub use saved_tensor::SavedTensor;
pub use tensor::TrackedTensor;
