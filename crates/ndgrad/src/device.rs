//! Device tags.
//!
//! `Accel` buffers are kept in host memory. The tag still matters: moving a
//! tensor between devices copies its storage, and operations refuse to mix
//! operands from different devices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Cpu,
    Accel(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Accel(id) => write!(f, "accel:{id}"),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device[{}]", self)
    }
}

impl FromStr for Device {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TensorError::InvalidOperation(format!("unknown device '{s}'"));
        match s {
            "cpu" => Ok(Device::Cpu),
            "accel" => Ok(Device::Accel(0)),
            _ => {
                let ordinal = s.strip_prefix("accel:").ok_or_else(invalid)?;
                ordinal
                    .parse::<usize>()
                    .map(Device::Accel)
                    .map_err(|_| invalid())
            }
        }
    }
}

impl Device {
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}
