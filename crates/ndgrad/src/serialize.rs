//! Saving and loading tensors as JSON records.
//!
//! Only the logical elements of a view are written, in row-major order, so
//! a transposed or sliced view is compacted on save and loads back as a
//! contiguous tensor.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::dtype::DType;
use crate::error::TensorError;
use crate::tensor::Tensor;

#[derive(Debug, Serialize, Deserialize)]
struct TensorRecord {
    dtype: DType,
    device: Device,
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), TensorError> {
        let record = TensorRecord {
            dtype: self.dtype(),
            device: self.device(),
            shape: self.shape().to_vec(),
            data: self.to_vec(),
        };
        serde_json::to_writer(writer, &record)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Tensor, TensorError> {
        let record: TensorRecord = serde_json::from_reader(reader)?;
        Tensor::from_vec_with(record.data, &record.shape, record.dtype, record.device)
    }

    /// Write this tensor to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TensorError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        tracing::debug!(path = %path.as_ref().display(), shape = ?self.shape(), "saved tensor");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Tensor, TensorError> {
        Tensor::from_reader(BufReader::new(File::open(path.as_ref())?))
    }
}
