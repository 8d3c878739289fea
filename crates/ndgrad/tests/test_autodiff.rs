//! Integration tests for autodiff module.
//!
//! Tests backward-mode automatic differentiation with numerical gradient checks.

use approx::assert_relative_eq;
use ndgrad::autodiff::{TrackedTensor, backward, clear_graph, graph_len, no_grad};
use ndgrad::{DType, Device, Tensor, TensorError};

fn f64_tensor(data: Vec<f64>, shape: &[usize]) -> Tensor {
    Tensor::from_vec_with(data, shape, DType::F64, Device::Cpu).unwrap()
}

fn leaf(data: &[f64], shape: &[usize]) -> TrackedTensor {
    TrackedTensor::leaf(f64_tensor(data.to_vec(), shape)).unwrap()
}

/// Compute numerical gradient using central difference.
///
/// grad_i ≈ (f(x + eps*e_i) - f(x - eps*e_i)) / (2*eps)
fn numerical_gradient<F>(f: F, x: &[f64], eps: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut grad = vec![0.0; x.len()];
    let mut x_plus = x.to_vec();
    let mut x_minus = x.to_vec();

    for i in 0..x.len() {
        x_plus[i] = x[i] + eps;
        x_minus[i] = x[i] - eps;

        let f_plus = f(&x_plus);
        let f_minus = f(&x_minus);
        grad[i] = (f_plus - f_minus) / (2.0 * eps);

        x_plus[i] = x[i];
        x_minus[i] = x[i];
    }
    grad
}

fn assert_grad_close(analytical: &Tensor, numerical: &[f64]) {
    assert_eq!(analytical.numel(), numerical.len());
    for (a, n) in analytical.to_vec().iter().zip(numerical) {
        assert_relative_eq!(a, n, epsilon = 1e-5, max_relative = 1e-5);
    }
}

#[test]
fn test_numerical_gradient_matmul() {
    let eps = 1e-6;

    // f(A, B) = sum(tanh(A @ B)) where A is 2x3, B is 3x4
    let a_data = vec![0.1, -0.2, 0.3, 0.4, 0.5, -0.6];
    let b_data: Vec<f64> = (1..=12).map(|x| x as f64 / 10.0 - 0.6).collect();

    let forward = |a: &[f64], b: &[f64]| -> f64 {
        let a = f64_tensor(a.to_vec(), &[2, 3]);
        let b = f64_tensor(b.to_vec(), &[3, 4]);
        a.matmul(&b).unwrap().tanh().sum().item().unwrap()
    };
    let numerical_grad_a = numerical_gradient(|a| forward(a, &b_data), &a_data, eps);
    let numerical_grad_b = numerical_gradient(|b| forward(&a_data, b), &b_data, eps);

    let a = leaf(&a_data, &[2, 3]);
    let b = leaf(&b_data, &[3, 4]);
    let loss = a.matmul(&b).unwrap().tanh().sum();
    let grads = backward(&loss).unwrap();

    assert_grad_close(grads.get(a.node_id().unwrap()).unwrap(), &numerical_grad_a);
    assert_grad_close(grads.get(b.node_id().unwrap()).unwrap(), &numerical_grad_b);
    assert_grad_close(&a.grad().unwrap(), &numerical_grad_a);
}

#[test]
fn test_numerical_gradient_broadcast_chain() {
    let eps = 1e-6;

    // f(x, w, b) = mean(sigmoid(x * w + b) ^ 2) with w [3] broadcast over rows
    let x_data = vec![0.5, -1.0, 2.0, 1.5, 0.25, -0.75];
    let w_data = vec![0.3, -0.4, 0.2];
    let b_data = vec![0.1];

    let forward = |x: &[f64], w: &[f64], b: &[f64]| -> f64 {
        let x = f64_tensor(x.to_vec(), &[2, 3]);
        let w = f64_tensor(w.to_vec(), &[3]);
        let b = f64_tensor(b.to_vec(), &[1]);
        let z = x.mul(&w).unwrap().add(&b).unwrap().sigmoid();
        z.square().mean().unwrap().item().unwrap()
    };

    let x = leaf(&x_data, &[2, 3]);
    let w = leaf(&w_data, &[3]);
    let b = leaf(&b_data, &[1]);
    let loss = x
        .mul(&w)
        .unwrap()
        .add(&b)
        .unwrap()
        .sigmoid()
        .square()
        .mean()
        .unwrap();
    backward(&loss).unwrap();

    assert_grad_close(
        &x.grad().unwrap(),
        &numerical_gradient(|v| forward(v, &w_data, &b_data), &x_data, eps),
    );
    assert_grad_close(
        &w.grad().unwrap(),
        &numerical_gradient(|v| forward(&x_data, v, &b_data), &w_data, eps),
    );
    assert_grad_close(
        &b.grad().unwrap(),
        &numerical_gradient(|v| forward(&x_data, &w_data, v), &b_data, eps),
    );
}

#[test]
fn test_numerical_gradient_div_exp_log() {
    let eps = 1e-6;
    let x_data = vec![0.5, 1.5, 2.5];
    let y_data = vec![2.0, 0.5, 1.25];

    // f(x, y) = sum(log(exp(x) / y + 1))
    let forward = |x: &[f64], y: &[f64]| -> f64 {
        let x = f64_tensor(x.to_vec(), &[3]);
        let y = f64_tensor(y.to_vec(), &[3]);
        x.exp().div(&y).unwrap().add_scalar(1.0).log().sum().item().unwrap()
    };

    let x = leaf(&x_data, &[3]);
    let y = leaf(&y_data, &[3]);
    let loss = x.exp().div(&y).unwrap().add_scalar(1.0).log().sum();
    backward(&loss).unwrap();

    assert_grad_close(
        &x.grad().unwrap(),
        &numerical_gradient(|v| forward(v, &y_data), &x_data, eps),
    );
    assert_grad_close(
        &y.grad().unwrap(),
        &numerical_gradient(|v| forward(&x_data, v), &y_data, eps),
    );
}

#[test]
fn test_backward_twice_accumulates() {
    // Two forward/backward passes without zeroing: grads add up.
    let w = leaf(&[2.0], &[]);
    let x = TrackedTensor::new(f64_tensor(vec![3.0], &[]));

    for _ in 0..2 {
        let loss = w.mul(&x).unwrap();
        backward(&loss).unwrap();
    }
    assert_relative_eq!(w.grad().unwrap().item().unwrap(), 6.0);

    w.zero_grad();
    backward(&w.mul(&x).unwrap()).unwrap();
    assert_relative_eq!(w.grad().unwrap().item().unwrap(), 3.0);
}

#[test]
fn test_leaf_survives_clear_graph() {
    let w = leaf(&[1.0, 2.0], &[2]);
    let _unused = w.exp();
    clear_graph();
    assert_eq!(graph_len(), 0);

    backward(&w.square().sum()).unwrap();
    assert_eq!(w.grad().unwrap().to_vec(), vec![2.0, 4.0]);
    assert_eq!(graph_len(), 0);
}

#[test]
fn test_dropped_results_stay_until_cleared() {
    let w = leaf(&[1.0, 2.0], &[2]);
    clear_graph();
    for _ in 0..10 {
        let _ = w.mul_scalar(2.0).exp();
    }
    assert_eq!(graph_len(), 20);

    no_grad(|| {
        let _ = w.mul_scalar(2.0).exp();
    });
    assert_eq!(graph_len(), 20);

    clear_graph();
    assert_eq!(graph_len(), 0);
}

#[test]
fn test_detach_stops_gradient() {
    let w = leaf(&[3.0], &[]);
    let frozen = w.detach();
    let loss = w.mul(&frozen).unwrap();
    backward(&loss).unwrap();
    // only the tracked factor contributes
    assert_relative_eq!(w.grad().unwrap().item().unwrap(), 3.0);
}

#[test]
fn test_to_vec_on_graph_tensor_fails() {
    let w = leaf(&[1.0, 2.0], &[2]);
    let y = w.mul_scalar(3.0);
    assert!(matches!(y.to_vec(), Err(TensorError::RequiresGrad)));
    assert_eq!(y.detach().to_vec().unwrap(), vec![3.0, 6.0]);
}

#[test]
fn test_in_place_change_of_saved_input_fails() {
    let w = leaf(&[1.0, 2.0], &[2]);
    let x = TrackedTensor::new(f64_tensor(vec![5.0, 6.0], &[2]));
    let loss = w.mul(&x).unwrap().sum();

    // MulBackward saved x; changing it invalidates the graph.
    x.tensor().add_(&f64_tensor(vec![1.0, 1.0], &[2])).unwrap();
    assert!(matches!(
        backward(&loss),
        Err(TensorError::ModifiedInPlace { .. })
    ));
}

#[test]
fn test_no_grad_results_are_constants() {
    let w = leaf(&[1.0], &[1]);
    let y = no_grad(|| w.mul_scalar(2.0).exp());
    assert!(!y.requires_grad());
    assert!(matches!(backward(&y), Err(TensorError::NoGradFn)));
}
