//! Thermometer readings: Celsius and an unknown unit.

use ndgrad::{Device, Tensor, TensorError};
use rand::Rng;

const T_C: [f64; 11] = [0.5, 14.0, 15.0, 28.0, 11.0, 8.0, 3.0, -4.0, 6.0, 13.0, 21.0];
const T_U: [f64; 11] = [
    35.7, 55.9, 58.2, 81.9, 56.3, 48.9, 33.9, 21.8, 48.4, 60.4, 68.4,
];

/// `(t_u, t_c)` as 1-D tensors on `device`.
pub fn thermometer(device: Device) -> Result<(Tensor, Tensor), TensorError> {
    let t_u = Tensor::from_vec(T_U.to_vec(), &[T_U.len()])?.to_device(device);
    let t_c = Tensor::from_vec(T_C.to_vec(), &[T_C.len()])?.to_device(device);
    Ok((t_u, t_c))
}

/// Shuffle `0..n` and split off `val_fraction` of it for validation.
/// Returns `(train, val)` indices; at least one sample stays in training.
pub fn split_indices<R: Rng>(n: usize, val_fraction: f64, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
    let shuffled: Vec<usize> = Tensor::randperm_with_rng(n, rng)
        .to_vec()
        .into_iter()
        .map(|i| i as usize)
        .collect();
    let n_val = ((n as f64 * val_fraction) as usize).min(n.saturating_sub(1));
    let (val, train) = shuffled.split_at(n_val);
    (train.to_vec(), val.to_vec())
}
