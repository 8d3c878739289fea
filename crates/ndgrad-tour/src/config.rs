use anyhow::ensure;
use clap::{Args, ValueEnum};
use ndgrad::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptimizerKind {
    /// Plain stochastic gradient descent
    Sgd,
    /// Adam with default betas
    Adam,
}

#[derive(Debug, Args)]
pub struct TrainingArgs {
    /// Number of passes over the training set
    #[arg(long, default_value_t = 3000)]
    pub epochs: usize,

    /// Optimizer step size
    #[arg(long = "learning-rate", default_value_t = 1e-2)]
    pub learning_rate: f64,

    /// Update rule for the parameters
    #[arg(long, value_enum, default_value_t = OptimizerKind::Sgd)]
    pub optimizer: OptimizerKind,

    /// Fraction of samples held out for validation
    #[arg(long = "val-fraction", default_value_t = 0.2)]
    pub val_fraction: f64,

    /// Device for data and parameters (cpu, accel:N)
    #[arg(long, default_value = "cpu")]
    pub device: Device,

    /// Print the losses every N epochs
    #[arg(long = "print-every", default_value_t = 500)]
    pub print_every: usize,
}

/// Settings shared by every section of the tour.
#[derive(Debug, Clone)]
pub struct TourConfig {
    pub seed: u64,
    pub epochs: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    pub val_fraction: f64,
    pub device: Device,
    pub print_every: usize,
}

impl TourConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            epochs: 3000,
            learning_rate: 1e-2,
            optimizer: OptimizerKind::Sgd,
            val_fraction: 0.2,
            device: Device::Cpu,
            print_every: 500,
        }
    }

    pub fn from_training(seed: u64, args: TrainingArgs) -> anyhow::Result<Self> {
        ensure!(
            (0.0..1.0).contains(&args.val_fraction),
            "--val-fraction must be in [0, 1), got {}",
            args.val_fraction
        );
        ensure!(
            args.learning_rate > 0.0,
            "--learning-rate must be positive"
        );
        ensure!(args.print_every > 0, "--print-every must be at least 1");
        Ok(Self {
            seed,
            epochs: args.epochs,
            learning_rate: args.learning_rate,
            optimizer: args.optimizer,
            val_fraction: args.val_fraction,
            device: args.device,
            print_every: args.print_every,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        training: TrainingArgs,
    }

    #[test]
    fn test_every_training_flag_has_help() {
        let command = Harness::command();
        for arg in command.get_arguments() {
            if arg.get_id() == "help" {
                continue;
            }
            assert!(arg.get_help().is_some(), "--{} has no help", arg.get_id());
        }
    }

    #[test]
    fn test_from_training_rejects_bad_fraction() {
        let args = Harness::parse_from(["tour", "--val-fraction", "1.5"]).training;
        assert!(TourConfig::from_training(0, args).is_err());

        let args = Harness::parse_from(["tour", "--optimizer", "adam"]).training;
        let config = TourConfig::from_training(7, args).unwrap();
        assert_eq!(config.optimizer, OptimizerKind::Adam);
        assert_eq!(config.seed, 7);
    }
}
