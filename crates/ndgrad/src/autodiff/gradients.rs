//! Gradient storage container.

use std::collections::HashMap;

use super::graph::NodeId;
use crate::error::TensorError;
use crate::tensor::Tensor;

/// Container for accumulated gradients.
///
/// Stores gradients keyed by NodeId, summing contributions for nodes with
/// multiple downstream paths.
#[derive(Debug, Default)]
pub struct Gradients {
    grads: HashMap<NodeId, Tensor>,
}

impl Gradients {
    /// Create empty gradient container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate gradient for a node.
    ///
    /// If gradient already exists, adds to it (for multiple paths).
    pub fn accumulate(&mut self, id: NodeId, grad: Tensor) -> Result<(), TensorError> {
        if let Some(existing) = self.grads.get_mut(&id) {
            *existing = existing.add(&grad)?;
        } else {
            self.grads.insert(id, grad);
        }
        Ok(())
    }

    /// Get gradient for a node.
    pub fn get(&self, id: NodeId) -> Option<&Tensor> {
        self.grads.get(&id)
    }

    /// Remove and return gradient (for passing to backward functions).
    pub fn remove(&mut self, id: NodeId) -> Option<Tensor> {
        self.grads.remove(&id)
    }

    /// Check if gradient exists for node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.grads.contains_key(&id)
    }

    /// Number of stored gradients.
    pub fn len(&self) -> usize {
        self.grads.len()
    }

    /// Check if no gradients stored.
    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// Iterate over all gradients.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Tensor)> {
        self.grads.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradients_new() {
        let grads = Gradients::new();
        assert!(grads.is_empty());
        assert_eq!(grads.len(), 0);
    }

    #[test]
    fn test_gradients_accumulate_multiple() {
        let mut grads = Gradients::new();
        let id = NodeId::new_for_test(0);
        let grad1 = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let grad2 = Tensor::from_vec(vec![4.0, 5.0, 6.0], &[3]).unwrap();

        grads.accumulate(id, grad1).unwrap();
        grads.accumulate(id, grad2).unwrap();

        assert_eq!(grads.get(id).unwrap().to_vec(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_gradients_accumulate_mismatched_shapes() {
        let mut grads = Gradients::new();
        let id = NodeId::new_for_test(0);
        grads.accumulate(id, Tensor::ones(&[2])).unwrap();
        assert!(grads.accumulate(id, Tensor::ones(&[3])).is_err());
    }

    #[test]
    fn test_gradients_remove() {
        let mut grads = Gradients::new();
        let id = NodeId::new_for_test(0);
        grads.accumulate(id, Tensor::ones(&[3])).unwrap();
        assert!(grads.contains(id));

        assert!(grads.remove(id).is_some());
        assert!(!grads.contains(id));
    }

    #[test]
    fn test_gradients_multiple_nodes() {
        let mut grads = Gradients::new();
        let id1 = NodeId::new_for_test(0);
        let id2 = NodeId::new_for_test(1);

        grads.accumulate(id1, Tensor::ones(&[2])).unwrap();
        grads.accumulate(id2, Tensor::ones(&[3])).unwrap();

        assert_eq!(grads.len(), 2);
        assert_eq!(grads.get(id1).unwrap().shape(), &[2]);
        assert_eq!(grads.get(id2).unwrap().shape(), &[3]);
    }
}
