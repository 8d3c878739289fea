//! Shape, stride and offset of a view onto a storage.

use smallvec::SmallVec;

use crate::error::TensorError;
use crate::strides::{cartesian_to_linear, compute_strides, numel};

pub(crate) type Dims = SmallVec<[usize; 6]>;

/// Layout of a tensor view.
///
/// Element `[i0, i1, ...]` lives at storage index
/// `offset + i0 * strides[0] + i1 * strides[1] + ...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Layout {
    shape: Dims,
    strides: Dims,
    offset: usize,
}

impl Layout {
    pub fn new(shape: &[usize], strides: &[usize], offset: usize) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape: shape.iter().copied().collect(),
            strides: strides.iter().copied().collect(),
            offset,
        }
    }

    pub fn from_shape(shape: &[usize]) -> Self {
        Self::new(shape, &compute_strides(shape), 0)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    /// True if the view walks storage in plain row-major order.
    ///
    /// Dimensions of size 1 never affect addressing, so their stride is
    /// ignored.
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1;
        for i in (0..self.ndim()).rev() {
            if self.shape[i] != 1 && self.strides[i] != expected {
                return false;
            }
            expected *= self.shape[i];
        }
        true
    }

    /// Storage index of the element at `indices`, with bounds checks.
    pub fn index_of(&self, indices: &[usize]) -> Result<usize, TensorError> {
        if indices.len() != self.ndim() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        for (&idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if idx >= dim {
                return Err(TensorError::IndexOutOfBounds {
                    index: idx,
                    dim_size: dim,
                });
            }
        }
        Ok(cartesian_to_linear(indices, &self.strides, self.offset))
    }

    /// Largest storage index this view can touch, or `None` if it is empty.
    pub fn max_storage_index(&self) -> Option<usize> {
        if self.numel() == 0 {
            return None;
        }
        Some(
            self.offset
                + self
                    .shape
                    .iter()
                    .zip(self.strides.iter())
                    .map(|(&d, &s)| (d - 1) * s)
                    .sum::<usize>(),
        )
    }

    /// Storage indices of every element, in logical row-major order.
    pub fn storage_indices(&self) -> StorageIndices<'_> {
        StorageIndices {
            layout: self,
            counter: smallvec::smallvec![0; self.ndim()],
            current: self.offset,
            remaining: self.numel(),
        }
    }

    fn check_dim(&self, dim: usize) -> Result<(), TensorError> {
        if dim >= self.ndim() {
            return Err(TensorError::InvalidDimension {
                dim,
                ndim: self.ndim(),
            });
        }
        Ok(())
    }

    /// Fix dimension `dim` at `index`, dropping it from the view.
    pub fn select(&self, dim: usize, index: usize) -> Result<Self, TensorError> {
        self.check_dim(dim)?;
        if index >= self.shape[dim] {
            return Err(TensorError::IndexOutOfBounds {
                index,
                dim_size: self.shape[dim],
            });
        }
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        let offset = self.offset + index * strides[dim];
        shape.remove(dim);
        strides.remove(dim);
        Ok(Self {
            shape,
            strides,
            offset,
        })
    }

    /// Restrict dimension `dim` to `start..start + len`.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Self, TensorError> {
        self.check_dim(dim)?;
        let size = self.shape[dim];
        if start.checked_add(len).is_none_or(|end| end > size) {
            return Err(TensorError::SliceOutOfBounds {
                start,
                end: start.saturating_add(len),
                dim,
                size,
            });
        }
        let mut out = self.clone();
        out.shape[dim] = len;
        out.offset += start * self.strides[dim];
        Ok(out)
    }

    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Self, TensorError> {
        self.check_dim(dim0)?;
        self.check_dim(dim1)?;
        let mut out = self.clone();
        out.shape.swap(dim0, dim1);
        out.strides.swap(dim0, dim1);
        Ok(out)
    }

    /// Reorder dimensions: dimension `i` of the result is `perm[i]` of self.
    pub fn permute(&self, perm: &[usize]) -> Result<Self, TensorError> {
        let ndim = self.ndim();
        let mut seen = vec![false; ndim];
        let valid = perm.len() == ndim
            && perm.iter().all(|&p| {
                if p >= ndim || seen[p] {
                    return false;
                }
                seen[p] = true;
                true
            });
        if !valid {
            return Err(TensorError::InvalidPermutation {
                perm: perm.to_vec(),
                ndim,
            });
        }
        Ok(Self {
            shape: perm.iter().map(|&p| self.shape[p]).collect(),
            strides: perm.iter().map(|&p| self.strides[p]).collect(),
            offset: self.offset,
        })
    }

    /// Reinterpret a contiguous view under a new shape.
    pub fn view(&self, new_shape: &[usize]) -> Result<Self, TensorError> {
        if numel(new_shape) != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.numel(),
                actual: numel(new_shape),
            });
        }
        if !self.is_contiguous() {
            return Err(TensorError::NotContiguous {
                shape: self.shape.to_vec(),
                strides: self.strides.to_vec(),
            });
        }
        Ok(Self::new(new_shape, &compute_strides(new_shape), self.offset))
    }

    pub fn unsqueeze(&self, dim: usize) -> Result<Self, TensorError> {
        if dim > self.ndim() {
            return Err(TensorError::InvalidDimension {
                dim,
                ndim: self.ndim(),
            });
        }
        let stride = if dim < self.ndim() {
            self.strides[dim] * self.shape[dim]
        } else {
            1
        };
        let mut out = self.clone();
        out.shape.insert(dim, 1);
        out.strides.insert(dim, stride);
        Ok(out)
    }

    /// Drop dimension `dim` if it has size 1; otherwise return the layout unchanged.
    pub fn squeeze(&self, dim: usize) -> Result<Self, TensorError> {
        self.check_dim(dim)?;
        if self.shape[dim] != 1 {
            return Ok(self.clone());
        }
        let mut out = self.clone();
        out.shape.remove(dim);
        out.strides.remove(dim);
        Ok(out)
    }

    /// Expand to `target` by giving stretched dimensions a stride of 0.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Self, TensorError> {
        let incompatible = |i: usize| TensorError::IncompatibleShapes {
            lhs: self.shape.to_vec(),
            rhs: target.to_vec(),
            op: format!("broadcast at dimension {i}"),
        };
        if self.ndim() > target.len() {
            return Err(incompatible(0));
        }

        let rank_diff = target.len() - self.ndim();
        let mut strides: Dims = smallvec::smallvec![0; target.len()];
        for (i, &tgt) in target.iter().enumerate() {
            if i < rank_diff {
                continue;
            }
            let src = self.shape[i - rank_diff];
            if src == tgt {
                strides[i] = self.strides[i - rank_diff];
            } else if src != 1 {
                return Err(incompatible(i));
            }
        }

        Ok(Self {
            shape: target.iter().copied().collect(),
            strides,
            offset: self.offset,
        })
    }
}

/// Iterator over storage indices of a layout in logical order.
pub struct StorageIndices<'a> {
    layout: &'a Layout,
    counter: Dims,
    current: usize,
    remaining: usize,
}

impl Iterator for StorageIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.current;
        self.remaining -= 1;

        // Odometer increment from the last dimension.
        for d in (0..self.layout.ndim()).rev() {
            self.counter[d] += 1;
            self.current += self.layout.strides[d];
            if self.counter[d] < self.layout.shape[d] {
                break;
            }
            self.current -= self.counter[d] * self.layout.strides[d];
            self.counter[d] = 0;
        }

        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StorageIndices<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shape_is_contiguous() {
        let layout = Layout::from_shape(&[3, 2]);
        assert_eq!(layout.strides(), &[2, 1]);
        assert_eq!(layout.offset(), 0);
        assert!(layout.is_contiguous());
    }

    #[test]
    fn test_select_moves_offset() {
        // points[1] of a 3x2 tensor starts at storage index 2.
        let layout = Layout::from_shape(&[3, 2]).select(0, 1).unwrap();
        assert_eq!(layout.shape(), &[2]);
        assert_eq!(layout.strides(), &[1]);
        assert_eq!(layout.offset(), 2);
    }

    #[test]
    fn test_select_column() {
        let layout = Layout::from_shape(&[3, 2]).select(1, 1).unwrap();
        assert_eq!(layout.shape(), &[3]);
        assert_eq!(layout.strides(), &[2]);
        assert_eq!(layout.offset(), 1);
        assert!(!layout.is_contiguous());
    }

    #[test]
    fn test_transpose_swaps_strides() {
        let layout = Layout::from_shape(&[3, 2]).transpose(0, 1).unwrap();
        assert_eq!(layout.shape(), &[2, 3]);
        assert_eq!(layout.strides(), &[1, 2]);
        assert!(!layout.is_contiguous());
    }

    #[test]
    fn test_storage_indices_transposed() {
        let layout = Layout::from_shape(&[3, 2]).transpose(0, 1).unwrap();
        let idx: Vec<usize> = layout.storage_indices().collect();
        assert_eq!(idx, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_storage_indices_scalar() {
        let layout = Layout::from_shape(&[]);
        let idx: Vec<usize> = layout.storage_indices().collect();
        assert_eq!(idx, vec![0]);
    }

    #[test]
    fn test_storage_indices_empty() {
        let layout = Layout::from_shape(&[2, 0]);
        assert_eq!(layout.storage_indices().count(), 0);
        assert_eq!(layout.max_storage_index(), None);
    }

    #[test]
    fn test_narrow() {
        let layout = Layout::from_shape(&[3, 2]).narrow(0, 1, 2).unwrap();
        assert_eq!(layout.shape(), &[2, 2]);
        assert_eq!(layout.offset(), 2);
        assert_eq!(layout.max_storage_index(), Some(5));
        assert!(Layout::from_shape(&[3, 2]).narrow(0, 2, 2).is_err());
    }

    #[test]
    fn test_narrow_huge_start_is_an_error() {
        let err = Layout::from_shape(&[3]).narrow(0, usize::MAX, 2).unwrap_err();
        assert!(matches!(
            err,
            TensorError::SliceOutOfBounds {
                start: usize::MAX,
                end: usize::MAX,
                dim: 0,
                size: 3,
            }
        ));
    }

    #[test]
    fn test_view_requires_contiguous() {
        let t = Layout::from_shape(&[3, 2]).transpose(0, 1).unwrap();
        assert!(matches!(t.view(&[6]), Err(TensorError::NotContiguous { .. })));
        assert!(Layout::from_shape(&[3, 2]).view(&[6]).is_ok());
        assert!(Layout::from_shape(&[3, 2]).view(&[4]).is_err());
    }

    #[test]
    fn test_permute_invalid() {
        let layout = Layout::from_shape(&[2, 3]);
        assert!(layout.permute(&[0]).is_err());
        assert!(layout.permute(&[0, 0]).is_err());
        assert!(layout.permute(&[0, 2]).is_err());
        assert_eq!(layout.permute(&[1, 0]).unwrap().shape(), &[3, 2]);
    }

    #[test]
    fn test_unsqueeze_squeeze() {
        let layout = Layout::from_shape(&[3]);
        let u = layout.unsqueeze(1).unwrap();
        assert_eq!(u.shape(), &[3, 1]);
        assert!(u.is_contiguous());
        let s = u.squeeze(1).unwrap();
        assert_eq!(s.shape(), &[3]);
        assert!(layout.unsqueeze(2).is_err());
    }

    #[test]
    fn test_broadcast_to() {
        let layout = Layout::from_shape(&[3, 1]);
        let b = layout.broadcast_to(&[2, 3, 4]).unwrap();
        assert_eq!(b.strides(), &[0, 1, 0]);
        let idx: Vec<usize> = b.storage_indices().take(5).collect();
        assert_eq!(idx, vec![0, 0, 0, 0, 1]);
        assert!(layout.broadcast_to(&[2, 2]).is_err());
    }
}
