//! Element types.
//!
//! Storage keeps every element in an `f64` lane; the dtype decides which
//! values the lane may hold. Writing a value normalizes it into the dtype's
//! domain, so an `I16` tensor really only ever holds 16-bit integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TensorError;

/// Element type of a tensor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    U8,
    I16,
    I32,
    I64,
    F16,
    #[default]
    F32,
    F64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        write!(f, "{s}")
    }
}

impl fmt::Debug for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "u8" => Ok(Self::U8),
            "i16" => Ok(Self::I16),
            "i32" => Ok(Self::I32),
            "i64" => Ok(Self::I64),
            "f16" => Ok(Self::F16),
            "f32" => Ok(Self::F32),
            "f64" => Ok(Self::F64),
            other => Err(TensorError::InvalidOperation(format!(
                "unknown dtype '{other}'"
            ))),
        }
    }
}

impl DType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::Bool | Self::U8 => 1,
            Self::I16 | Self::F16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::U8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Normalize `value` into this dtype's domain.
    ///
    /// Integers truncate toward zero and saturate at the type bounds
    /// (NaN becomes 0). `Bool` maps any non-zero value to 1.
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            Self::Bool => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::U8 => value as u8 as f64,
            Self::I16 => value as i16 as f64,
            Self::I32 => value as i32 as f64,
            // i64 values above 2^53 are not representable in the lane anyway.
            Self::I64 => value as i64 as f64,
            Self::F16 => half::f16::from_f64(value).to_f64(),
            Self::F32 => value as f32 as f64,
            Self::F64 => value,
        }
    }

    /// Promote two dtypes to a common dtype for binary operations.
    ///
    /// Floats win over integers, wider types win over narrower ones, and
    /// `U8` mixed with a signed integer yields the signed type.
    pub fn promote(lhs: DType, rhs: DType) -> DType {
        if lhs == rhs {
            return lhs;
        }

        let priority = |dt: DType| -> u8 {
            match dt {
                Self::F64 => 100,
                Self::F32 => 90,
                Self::F16 => 80,
                Self::I64 => 65,
                Self::I32 => 55,
                Self::I16 => 45,
                Self::U8 => 30,
                Self::Bool => 25,
            }
        };

        if priority(lhs) >= priority(rhs) {
            lhs
        } else {
            rhs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_f32() {
        assert_eq!(DType::default(), DType::F32);
    }

    #[test]
    fn test_sizes() {
        assert_eq!(DType::Bool.size_in_bytes(), 1);
        assert_eq!(DType::I16.size_in_bytes(), 2);
        assert_eq!(DType::F32.size_in_bytes(), 4);
        assert_eq!(DType::F64.size_in_bytes(), 8);
    }

    #[test]
    fn test_cast_integers_truncate() {
        assert_eq!(DType::I16.cast(2.7), 2.0);
        assert_eq!(DType::I16.cast(-2.7), -2.0);
        assert_eq!(DType::I16.cast(40000.0), i16::MAX as f64);
        assert_eq!(DType::U8.cast(-3.0), 0.0);
        assert_eq!(DType::I32.cast(f64::NAN), 0.0);
    }

    #[test]
    fn test_cast_bool() {
        assert_eq!(DType::Bool.cast(0.3), 1.0);
        assert_eq!(DType::Bool.cast(0.0), 0.0);
    }

    #[test]
    fn test_cast_floats_round() {
        assert_eq!(DType::F64.cast(0.1), 0.1);
        assert_eq!(DType::F32.cast(0.1), 0.1f32 as f64);
        assert_ne!(DType::F32.cast(0.1), 0.1);
        assert_eq!(DType::F16.cast(1.0 / 3.0), half::f16::from_f64(1.0 / 3.0).to_f64());
    }

    #[test]
    fn test_promote() {
        assert_eq!(DType::promote(DType::I64, DType::F32), DType::F32);
        assert_eq!(DType::promote(DType::F32, DType::F64), DType::F64);
        assert_eq!(DType::promote(DType::U8, DType::I16), DType::I16);
        assert_eq!(DType::promote(DType::Bool, DType::U8), DType::U8);
        assert_eq!(DType::promote(DType::F16, DType::F16), DType::F16);
    }

    #[test]
    fn test_parse_roundtrip_names() {
        for dt in [DType::Bool, DType::I32, DType::F16, DType::F64] {
            assert_eq!(dt.to_string().parse::<DType>().unwrap(), dt);
        }
        assert!("complex".parse::<DType>().is_err());
    }
}
