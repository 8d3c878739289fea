//! Human-readable printing of tensors.

use std::fmt;

use crate::dtype::DType;
use crate::tensor::Tensor;

fn format_element(value: f64, dtype: DType) -> String {
    match dtype {
        DType::Bool => (value != 0.0).to_string(),
        dt if dt.is_int() => format!("{}", value as i64),
        _ => format!("{value:.4}"),
    }
}

fn write_nested(
    f: &mut fmt::Formatter<'_>,
    values: &[String],
    shape: &[usize],
    indent: usize,
) -> fmt::Result {
    match shape {
        [] => write!(f, "{}", values[0]),
        [_] => write!(f, "[{}]", values.join(", ")),
        [outer, rest @ ..] => {
            let chunk = values.len() / (*outer).max(1);
            write!(f, "[")?;
            for i in 0..*outer {
                if i > 0 {
                    write!(f, ",\n{}", " ".repeat(indent + 1))?;
                }
                let slice = &values[i * chunk..(i + 1) * chunk];
                write_nested(f, slice, rest, indent + 1)?;
            }
            write!(f, "]")
        }
    }
}

impl fmt::Display for Tensor {
    /// Prints like `tensor([[4.0000, 1.0000], [5.0000, 3.0000]])`, adding
    /// `dtype=` / `device=` when they differ from the defaults.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dtype = self.dtype();
        let values: Vec<String> = self
            .to_vec()
            .into_iter()
            .map(|v| format_element(v, dtype))
            .collect();

        const PREFIX: &str = "tensor(";
        write!(f, "{PREFIX}")?;
        if values.is_empty() {
            write!(f, "[]")?;
        } else {
            write_nested(f, &values, self.shape(), PREFIX.len())?;
        }
        if dtype != DType::default() {
            write!(f, ", dtype={dtype}")?;
        }
        if !self.device().is_cpu() {
            write!(f, ", device={}", self.device())?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("offset", &self.storage_offset())
            .field("dtype", &self.dtype())
            .field("device", &self.device())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;

    #[test]
    fn test_display_matrix() {
        let t = Tensor::from_vec(vec![4.0, 1.0, 5.0, 3.0], &[2, 2]).unwrap();
        assert_eq!(
            t.to_string(),
            "tensor([[4.0000, 1.0000],\n        [5.0000, 3.0000]])"
        );
    }

    #[test]
    fn test_display_scalar_and_vector() {
        assert_eq!(Tensor::scalar(2.5).to_string(), "tensor(2.5000)");
        let v = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        assert_eq!(v.to_string(), "tensor([1.0000, 2.0000])");
    }

    #[test]
    fn test_display_dtype_and_device_suffix() {
        let t = Tensor::full_with(&[2], 3.0, DType::I16, Device::Accel(0));
        assert_eq!(t.to_string(), "tensor([3, 3], dtype=i16, device=accel:0)");
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(Tensor::zeros(&[0]).to_string(), "tensor([])");
    }

    #[test]
    fn test_display_3d_indents() {
        let t = Tensor::ones(&[2, 1, 1]);
        assert_eq!(
            t.to_string(),
            "tensor([[[1.0000]],\n        [[1.0000]]])"
        );
    }
}
