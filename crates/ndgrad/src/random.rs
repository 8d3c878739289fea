//! Random tensor construction.

use rand::Rng;
use rand::distr::StandardUniform;
use rand::seq::SliceRandom;
use rand_distr::StandardNormal;

use crate::device::Device;
use crate::dtype::DType;
use crate::strides::numel;
use crate::tensor::Tensor;

impl Tensor {
    /// Create a tensor with uniform random values in [0, 1).
    ///
    /// # Example
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t = Tensor::random(&[2, 3]);
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert!(t.to_vec().iter().all(|&v| (0.0..1.0).contains(&v)));
    /// ```
    pub fn random(shape: &[usize]) -> Self {
        Self::random_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with uniform random values using a specific RNG.
    ///
    /// # Example
    ///
    /// ```
    /// use ndgrad::Tensor;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t1 = Tensor::random_with_rng(&[2, 3], &mut rng);
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t2 = Tensor::random_with_rng(&[2, 3], &mut rng);
    ///
    /// assert_eq!(t1.to_vec(), t2.to_vec());
    /// ```
    pub fn random_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let data: Vec<f64> = (0..numel(shape))
            .map(|_| rng.sample::<f64, _>(StandardUniform))
            .collect();
        Self::from_values(data, shape, DType::default(), Device::default())
    }

    /// Create a tensor with standard normal random values.
    pub fn randn(shape: &[usize]) -> Self {
        Self::randn_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with standard normal random values using a specific RNG.
    pub fn randn_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let data: Vec<f64> = (0..numel(shape))
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        Self::from_values(data, shape, DType::default(), Device::default())
    }

    /// Random permutation of `0..n` as an `I64` tensor.
    pub fn randperm_with_rng<R: Rng>(n: usize, rng: &mut R) -> Self {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let data = indices.into_iter().map(|i| i as f64).collect();
        Self::from_values(data, &[n], DType::I64, Device::default())
    }

    /// Gather entries of dimension 0 at `indices` into a new tensor.
    pub fn index_select0(&self, indices: &[usize]) -> Result<Self, crate::TensorError> {
        let mut data = Vec::new();
        for &i in indices {
            data.extend(self.select(0, i)?.to_vec());
        }
        let mut shape = self.shape().to_vec();
        if let Some(first) = shape.first_mut() {
            *first = indices.len();
        }
        Ok(Self::from_values(data, &shape, self.dtype(), self.device()))
    }
}
