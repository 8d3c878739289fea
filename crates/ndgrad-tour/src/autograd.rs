//! Gradient tracking, backward and accumulation.

use ndgrad::autodiff::{
    BackwardOptions, TrackedTensor, backward, backward_with, clear_graph, graph_len, no_grad,
};
use ndgrad::{DType, Device, Tensor};

use crate::config::TourConfig;
use crate::narrate::{expect_failure, heading, say, show};

pub fn run(_config: &TourConfig) -> anyhow::Result<()> {
    tracing::info!("autograd section");

    heading("Tracking gradients");
    let a = TrackedTensor::leaf(Tensor::from_vec(vec![2.0, 3.0], &[2])?)?;
    let b = TrackedTensor::leaf(Tensor::from_vec(vec![6.0, 4.0], &[2])?)?;
    show("a", &a);
    show("a.requires_grad", a.requires_grad());
    show("a.is_leaf", a.is_leaf());
    show("a.grad before backward", format!("{:?}", a.grad().map(|g| g.to_vec())));

    let q = a.pow_scalar(3.0).mul_scalar(3.0).sub(&b.square())?;
    show("q = 3a^3 - b^2", &q);
    show("q.grad_fn", q.grad_fn_name().unwrap_or("None"));
    show("nodes recorded", graph_len());

    heading("Backward");
    expect_failure("backward(q) on a non-scalar", backward(&q));
    let external = Tensor::ones(&[2]);
    backward_with(
        &q,
        BackwardOptions {
            grad_output: Some(external),
            ..Default::default()
        },
    )?;
    show("a.grad (9a^2)", a.grad().map(|g| g.to_string()).unwrap_or_default());
    show("b.grad (-2b)", b.grad().map(|g| g.to_string()).unwrap_or_default());
    show("nodes left after backward", graph_len());

    heading("Gradients accumulate");
    let w = TrackedTensor::leaf(Tensor::scalar(1.0))?;
    let x = TrackedTensor::new(Tensor::scalar(3.0));
    for pass in 1..=2 {
        let loss = w.mul(&x)?;
        backward(&loss)?;
        show(
            &format!("w.grad after pass {pass}"),
            w.grad().map(|g| g.to_string()).unwrap_or_default(),
        );
    }
    say("Zeroing the gradient before each pass gives the gradient of that pass alone:");
    w.zero_grad();
    backward(&w.mul(&x)?)?;
    show("w.grad", w.grad().map(|g| g.to_string()).unwrap_or_default());

    heading("A released graph");
    let y = w.mul(&x)?.exp();
    backward_with(
        &y,
        BackwardOptions {
            retain_graph: true,
            ..Default::default()
        },
    )?;
    backward(&y)?;
    say("The retained graph allowed a second pass; the next one finds it released.");
    expect_failure("third backward through y", backward(&y));

    heading("Leaving the graph");
    let z = a.mul_scalar(2.0);
    expect_failure("z.to_vec() while attached", z.to_vec());
    show("z.detach().to_vec()", format!("{:?}", z.detach().to_vec()?));
    let frozen = no_grad(|| a.mul_scalar(2.0));
    show("under no_grad, requires_grad", frozen.requires_grad());
    expect_failure(
        "in-place update of a leaf outside no_grad",
        a.sub_(&Tensor::ones(&[2])),
    );
    no_grad(|| a.sub_(&Tensor::ones(&[2])))?;
    show("a after an update under no_grad", &a);

    heading("Saved values must not change");
    let c = TrackedTensor::leaf(Tensor::from_vec(vec![0.5, 1.5], &[2])?)?;
    let e = c.exp();
    expect_failure(
        "e.copy_(..) while recording",
        e.copy_(&Tensor::zeros(&[2])),
    );
    say("Writing through the raw tensor skips that check, but backward notices:");
    let loss = e.sum();
    e.tensor().fill_(0.0);
    expect_failure("backward after editing exp's output", backward(&loss));

    heading("Only floating-point tensors carry gradients");
    expect_failure(
        "leaf of an i64 tensor",
        TrackedTensor::leaf(Tensor::full_with(&[2], 1.0, DType::I64, Device::Cpu)),
    );

    heading("Clearing the graph");
    show("nodes left by results that never reached backward", graph_len());
    clear_graph();
    show("nodes after clear_graph", graph_len());

    Ok(())
}
