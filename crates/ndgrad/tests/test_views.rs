//! Integration tests for strided views over shared storage.

use ndgrad::{DType, Device, Tensor, TensorError};

fn points() -> Tensor {
    Tensor::from_vec(vec![4.0, 1.0, 5.0, 3.0, 2.0, 1.0], &[3, 2]).unwrap()
}

#[test]
fn test_select_view_offsets_into_storage() {
    let points = points();
    let second = points.select(0, 1).unwrap();

    assert_eq!(second.shape(), &[2]);
    assert_eq!(second.storage_offset(), 2);
    assert_eq!(second.strides(), &[1]);
    assert!(second.shares_storage_with(&points));
    assert_eq!(second.storage().len(), 6);

    second.set(&[0], 10.0).unwrap();
    assert_eq!(points.get(&[1, 0]), Some(10.0));
}

#[test]
fn test_transpose_shares_storage() {
    let points = points();
    let points_t = points.t().unwrap();

    assert_eq!(points_t.shape(), &[2, 3]);
    assert_eq!(points_t.strides(), &[1, 2]);
    assert!(!points_t.is_contiguous());
    assert!(points_t.shares_storage_with(&points));
    assert_eq!(points_t.to_vec(), vec![4.0, 5.0, 2.0, 1.0, 3.0, 1.0]);

    points_t.set(&[1, 2], -1.0).unwrap();
    assert_eq!(points.get(&[2, 1]), Some(-1.0));
}

#[test]
fn test_transpose_higher_rank() {
    let some_t = Tensor::ones(&[3, 4, 5]);
    let transposed = some_t.transpose(0, 2).unwrap();

    assert_eq!(some_t.strides(), &[20, 5, 1]);
    assert_eq!(transposed.shape(), &[5, 4, 3]);
    assert_eq!(transposed.strides(), &[1, 5, 20]);
    assert!(matches!(
        some_t.t(),
        Err(TensorError::InvalidOperation(_))
    ));
}

#[test]
fn test_view_needs_contiguous() {
    let points_t = points().t().unwrap();
    assert!(matches!(
        points_t.view(&[6]),
        Err(TensorError::NotContiguous { .. })
    ));

    let compact = points_t.contiguous();
    assert!(compact.is_contiguous());
    assert!(!compact.shares_storage_with(&points_t));
    assert_eq!(compact.strides(), &[3, 1]);
    assert_eq!(
        compact.view(&[6]).unwrap().to_vec(),
        vec![4.0, 5.0, 2.0, 1.0, 3.0, 1.0]
    );
}

#[test]
fn test_narrow_and_in_place_updates() {
    let t = Tensor::arange(0.0, 12.0, 1.0).unwrap().view(&[3, 4]).unwrap();
    let middle = t.narrow(1, 1, 2).unwrap();
    assert_eq!(middle.shape(), &[3, 2]);
    assert_eq!(middle.storage_offset(), 1);
    assert_eq!(middle.to_vec(), vec![1.0, 2.0, 5.0, 6.0, 9.0, 10.0]);

    middle.zero_();
    assert_eq!(
        t.to_vec(),
        vec![0.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 7.0, 8.0, 0.0, 0.0, 11.0]
    );

    let version = t.storage().version();
    t.select(0, 0).unwrap().fill_(1.0);
    assert!(t.storage().version() > version);
    assert_eq!(t.get(&[0, 3]), Some(1.0));
}

#[test]
fn test_narrow_out_of_range_is_an_error() {
    let t = Tensor::ones(&[3]);
    assert!(matches!(
        t.narrow(0, usize::MAX, 2),
        Err(TensorError::SliceOutOfBounds { size: 3, .. })
    ));
    assert!(matches!(
        t.narrow(0, 2, 2),
        Err(TensorError::SliceOutOfBounds { end: 4, .. })
    ));
}

#[test]
fn test_copy_broadcasts_source() {
    let t = Tensor::zeros(&[2, 3]);
    let row = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
    t.copy_(&row).unwrap();
    assert_eq!(t.to_vec(), vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_dtype_conversion_copies_and_casts() {
    let t = Tensor::from_vec(vec![1.7, -2.3, 300.0], &[3]).unwrap();

    let as_int = t.to_dtype(DType::I32);
    assert_eq!(as_int.dtype(), DType::I32);
    assert_eq!(as_int.to_vec(), vec![1.0, -2.0, 300.0]);
    assert!(!as_int.shares_storage_with(&t));

    let as_u8 = t.to_dtype(DType::U8);
    assert_eq!(as_u8.to_vec(), vec![1.0, 0.0, 255.0]);

    let same = t.to_dtype(DType::F32);
    assert!(same.shares_storage_with(&t));

    let doubled = t.to_dtype(DType::F64);
    assert_eq!(doubled.dtype().size_in_bytes(), 8);
    assert_eq!(doubled.storage().nbytes(), 24);
}

#[test]
fn test_device_transfer_copies_storage() {
    let t = points();
    let moved = t.to_device(Device::Accel(0));
    assert_eq!(moved.device(), Device::Accel(0));
    assert!(!moved.shares_storage_with(&t));
    assert_eq!(moved.to_vec(), t.to_vec());

    assert!(matches!(
        t.add(&moved),
        Err(TensorError::DeviceMismatch { .. })
    ));

    let back = moved.to_device(Device::Cpu);
    assert_eq!(back.add(&t).unwrap().to_vec(), vec![8.0, 2.0, 10.0, 6.0, 4.0, 2.0]);
}

#[test]
fn test_broadcast_arithmetic() {
    let points = points();
    let mean = points.mean_dim(0, false).unwrap();
    assert_eq!(mean.shape(), &[2]);

    let centered = points.sub(&mean).unwrap();
    assert_eq!(centered.shape(), &[3, 2]);
    let sums = centered.sum_dim(0, false).unwrap().to_vec();
    assert!(sums.iter().all(|s| s.abs() < 1e-5));
}
