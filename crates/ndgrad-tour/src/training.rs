//! Fitting the thermometer calibration: a linear model, then a small network.

use ndgrad::autodiff::{TrackedTensor, backward, no_grad};
use ndgrad::optim::{Adam, Optimizer, Sgd};
use ndgrad::{Device, Tensor, TensorError};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{OptimizerKind, TourConfig};
use crate::data::{split_indices, thermometer};
use crate::narrate::{heading, say, show};

/// Train and validation tensors for one split.
struct Split {
    train_u: TrackedTensor,
    train_c: TrackedTensor,
    val_u: TrackedTensor,
    val_c: TrackedTensor,
}

impl Split {
    fn new(t_u: &Tensor, t_c: &Tensor, train: &[usize], val: &[usize]) -> Result<Self, TensorError> {
        Ok(Self {
            train_u: TrackedTensor::new(t_u.index_select0(train)?),
            train_c: TrackedTensor::new(t_c.index_select0(train)?),
            val_u: TrackedTensor::new(t_u.index_select0(val)?),
            val_c: TrackedTensor::new(t_c.index_select0(val)?),
        })
    }

    /// Inputs and targets as column vectors.
    fn columns(&self) -> Result<Self, TensorError> {
        Ok(Self {
            train_u: self.train_u.unsqueeze(1)?,
            train_c: self.train_c.unsqueeze(1)?,
            val_u: self.val_u.unsqueeze(1)?,
            val_c: self.val_c.unsqueeze(1)?,
        })
    }

    fn has_validation(&self) -> bool {
        self.val_u.numel() > 0
    }
}

fn loss_fn(t_p: &TrackedTensor, t_c: &TrackedTensor) -> Result<TrackedTensor, TensorError> {
    t_p.sub(t_c)?.square().mean()
}

fn build_optimizer(
    config: &TourConfig,
    params: Vec<TrackedTensor>,
    learning_rate: f64,
) -> Result<Box<dyn Optimizer>, TensorError> {
    Ok(match config.optimizer {
        OptimizerKind::Sgd => Box::new(Sgd::new(params, learning_rate)?),
        OptimizerKind::Adam => Box::new(Adam::new(params, learning_rate)?),
    })
}

fn training_loop(
    config: &TourConfig,
    optimizer: &mut dyn Optimizer,
    split: &Split,
    epochs: usize,
    model: impl Fn(&TrackedTensor) -> Result<TrackedTensor, TensorError>,
) -> Result<f64, TensorError> {
    let mut train_loss = f64::NAN;
    for epoch in 1..=epochs {
        let loss = loss_fn(&model(&split.train_u)?, &split.train_c)?;
        train_loss = loss.item()?;

        optimizer.zero_grad();
        backward(&loss)?;
        optimizer.step()?;

        if epoch == 1 || epoch % config.print_every == 0 {
            if split.has_validation() {
                let val_loss = no_grad(|| -> Result<TrackedTensor, TensorError> {
                    loss_fn(&model(&split.val_u)?, &split.val_c)
                })?;
                println!(
                    "Epoch {epoch}, Training loss {train_loss:.4}, Validation loss {:.4}",
                    val_loss.item()?
                );
            } else {
                println!("Epoch {epoch}, Training loss {train_loss:.4}");
            }
        }
        tracing::trace!(epoch, train_loss, "epoch done");
    }
    Ok(train_loss)
}

fn leaf_on(device: Device, tensor: Tensor) -> Result<TrackedTensor, TensorError> {
    TrackedTensor::leaf(tensor.to_device(device))
}

pub fn run(config: &TourConfig) -> anyhow::Result<()> {
    tracing::info!(
        optimizer = ?config.optimizer,
        epochs = config.epochs,
        lr = config.learning_rate,
        device = %config.device,
        "training section"
    );

    heading("Thermometer data");
    let (t_u, t_c) = thermometer(config.device)?;
    show("t_c", &t_c);
    show("t_u", &t_u);
    let t_un = t_u.mul_scalar(0.1);
    say("Inputs are scaled by 0.1 so both parameters see gradients of similar size.");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train, val) = split_indices(t_u.numel(), config.val_fraction, &mut rng);
    show("train indices", format!("{train:?}"));
    show("val indices", format!("{val:?}"));
    let split = Split::new(&t_un, &t_c, &train, &val)?;

    heading("Linear model t_p = w * t_u + b");
    let w = leaf_on(config.device, Tensor::scalar(1.0))?;
    let b = leaf_on(config.device, Tensor::scalar(0.0))?;
    let mut optimizer = build_optimizer(config, vec![w.clone(), b.clone()], config.learning_rate)?;
    let linear = |x: &TrackedTensor| -> Result<TrackedTensor, TensorError> { w.mul(x)?.add(&b) };
    let loss = training_loop(config, optimizer.as_mut(), &split, config.epochs, &linear)?;
    show("final training loss", format!("{loss:.4}"));
    show("w", w.detach());
    show("b", b.detach());

    heading("A small network");
    let hidden = 8;
    let columns = split.columns()?;
    let w1 = leaf_on(
        config.device,
        Tensor::randn_with_rng(&[1, hidden], &mut rng).mul_scalar(0.5),
    )?;
    let b1 = leaf_on(config.device, Tensor::zeros(&[hidden]))?;
    let w2 = leaf_on(
        config.device,
        Tensor::randn_with_rng(&[hidden, 1], &mut rng).mul_scalar(0.5),
    )?;
    let b2 = leaf_on(config.device, Tensor::zeros(&[1]))?;
    let params = vec![w1.clone(), b1.clone(), w2.clone(), b2.clone()];
    show(
        "parameter count",
        params.iter().map(TrackedTensor::numel).sum::<usize>(),
    );

    let mut optimizer = build_optimizer(config, params, config.learning_rate * 0.1)?;
    let net = |x: &TrackedTensor| -> Result<TrackedTensor, TensorError> {
        let hidden = x.matmul(&w1)?.add(&b1)?.tanh();
        hidden.matmul(&w2)?.add(&b2)
    };
    let loss = training_loop(config, optimizer.as_mut(), &columns, config.epochs, &net)?;
    show("final training loss", format!("{loss:.4}"));

    let inputs = TrackedTensor::new(t_un.unsqueeze(1)?);
    let predictions = no_grad(|| net(&inputs))?;
    show("predictions", predictions.into_tensor().squeeze(1)?);
    show("targets", &t_c);

    Ok(())
}
