//! Storage, shapes, strides and views.

use anyhow::Context;
use ndgrad::{DType, Device, Tensor};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::TourConfig;
use crate::narrate::{expect_failure, heading, say, show};

pub fn run(config: &TourConfig) -> anyhow::Result<()> {
    tracing::info!("tensors section");

    heading("From lists to tensors");
    let a = Tensor::ones(&[3]);
    show("a", &a);
    show("a[1]", a.get(&[1]).context("index 1 of a")?);
    a.set(&[2], 2.0)?;
    show("after a[2] = 2", &a);

    let points = Tensor::from_vec(vec![4.0, 1.0, 5.0, 3.0, 2.0, 1.0], &[3, 2])?;
    show("points", &points);
    show("points.shape", format!("{:?}", points.shape()));
    show("points[0, 1]", points.get(&[0, 1]).context("index (0, 1)")?);
    show("points[0]", points.select(0, 0)?);

    heading("Tensor element types");
    let double_points = Tensor::ones(&[10, 2]).to_dtype(DType::F64);
    let short_points = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2])?.to_dtype(DType::I16);
    show("double_points.dtype", double_points.dtype());
    show("short_points", &short_points);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let points_64 = Tensor::randn_with_rng(&[10, 2], &mut rng).to_dtype(DType::F64);
    let points_short = points_64.to_dtype(DType::I16);
    show("randn(10, 2) as f64 -> i16, first row", points_short.select(0, 0)?);
    let mixed = points_64.mul(&points_short)?;
    show("f64 * i16 promotes to", mixed.dtype());
    expect_failure("mean of an integer tensor", short_points.mean());

    heading("Storage");
    let storage = points.storage();
    show("points.storage()", storage);
    say("Writing into the storage changes every tensor that views it:");
    let second_storage = points.storage().clone();
    second_storage.set(0, 2.0)?;
    show("points after storage[0] = 2", &points);

    heading("Size, offset and stride");
    let second_point = points.select(0, 1)?;
    show("second_point", &second_point);
    show("second_point.storage_offset()", second_point.storage_offset());
    show("second_point.shape", format!("{:?}", second_point.shape()));
    show("points.strides()", format!("{:?}", points.strides()));
    say("second_point is a view, so editing it edits points:");
    second_point.set(&[0], 10.0)?;
    show("points", &points);
    let independent = points.select(0, 1)?.deep_clone();
    independent.set(&[0], 99.0)?;
    show("after editing a deep_clone, points[1]", points.select(0, 1)?);

    heading("Transposing without copying");
    let points_t = points.t()?;
    show("points_t", &points_t);
    show(
        "points_t shares storage with points",
        points_t.shares_storage_with(&points),
    );
    show("points.strides()", format!("{:?}", points.strides()));
    show("points_t.strides()", format!("{:?}", points_t.strides()));

    let some_t = Tensor::ones(&[3, 4, 5]);
    let transpose_t = some_t.transpose(0, 2)?;
    show("some_t.shape", format!("{:?}", some_t.shape()));
    show("transpose_t.shape", format!("{:?}", transpose_t.shape()));
    show("some_t.strides()", format!("{:?}", some_t.strides()));
    show("transpose_t.strides()", format!("{:?}", transpose_t.strides()));
    expect_failure("some_t.t() on a 3-D tensor", some_t.t());

    heading("Contiguous tensors");
    show("points.is_contiguous()", points.is_contiguous());
    show("points_t.is_contiguous()", points_t.is_contiguous());
    expect_failure("points_t.view([6])", points_t.view(&[6]));
    let points_t_cont = points_t.contiguous();
    show("points_t_cont", &points_t_cont);
    show("points_t_cont.strides()", format!("{:?}", points_t_cont.strides()));
    show("points_t_cont.storage()", points_t_cont.storage());
    show("points_t_cont.view([6])", points_t_cont.view(&[6])?);

    heading("Moving tensors between devices");
    let points_accel = points.to_device(Device::Accel(0));
    show("points_accel", &points_accel);
    show(
        "points_accel shares storage with points",
        points_accel.shares_storage_with(&points),
    );
    let doubled = points_accel.mul_scalar(2.0);
    show("2 * points_accel", &doubled);
    expect_failure("points + points_accel", points.add(&points_accel));
    show("back on the cpu", doubled.to_device(Device::Cpu));

    heading("Nested rows");
    let rows = points.to_nested_vec_2d()?;
    show("points as rows", format!("{rows:?}"));

    heading("Serializing tensors");
    let dir = tempfile::tempdir().context("creating a scratch directory")?;
    let path = dir.path().join("ourpoints.json");
    points_t.save(&path)?;
    let loaded = Tensor::load(&path)?;
    show("saved points_t and loaded", &loaded);
    show("loaded.is_contiguous()", loaded.is_contiguous());

    heading("In-place operations");
    let zeros = Tensor::ones(&[2, 2]);
    zeros.zero_();
    show("ones(2, 2).zero_()", &zeros);
    let version = points.storage().version();
    points.mul_scalar_(0.5);
    show("points.mul_scalar_(0.5)", &points);
    show(
        "storage version before / after",
        format!("{version} / {}", points.storage().version()),
    );

    Ok(())
}
