use clarray_device::{DeviceKind, HostDriver, InitOptions};
use clarray_dtype::ElemType;
use num_complex::Complex32;
use test_case::test_case;

use crate::test::{host_engine, host_engine_with};
use crate::{BinaryOp, Error, HostArray, InitMode, UnaryOp};

#[test]
fn test_lazy_initialization_is_idempotent() {
    let (driver, mut engine) = host_engine();
    assert!(engine.current_device_info().is_none());

    let first = engine.ensure_initialized().unwrap();
    let second = engine.ensure_initialized().unwrap();

    assert!(first.same_context(&second));
    assert_eq!(driver.stats().contexts_opened, 1);
    assert!(engine.current_device_info().is_some());
}

#[test]
fn test_operations_initialize_on_demand() {
    let (driver, mut engine) = host_engine();
    engine.construct(ElemType::Byte, &[4], InitMode::Zero).unwrap();
    engine.construct(ElemType::Byte, &[4], InitMode::Zero).unwrap();
    assert_eq!(driver.stats().contexts_opened, 1);
}

#[test]
fn test_reinitialize_recompiles() {
    let (driver, mut engine) = host_engine();
    let host = HostArray::from_vec(vec![4.0f32, 9.0]).unwrap();

    let a = engine.upload(&host).unwrap();
    engine.apply_unary(UnaryOp::Sqrt, &a, None).unwrap();
    assert_eq!(driver.stats().compiles, 1);

    engine.initialize(InitOptions::builder().platform(0).device(0).build()).unwrap();
    assert!(engine.cache().is_empty());

    let a = engine.upload(&host).unwrap();
    engine.apply_unary(UnaryOp::Sqrt, &a, None).unwrap();
    assert_eq!(driver.stats().compiles, 2);
    assert_eq!(driver.stats().contexts_opened, 2);
}

#[test]
fn test_arrays_from_previous_session_are_stale() {
    let (_, mut engine) = host_engine();
    let old = engine.construct(ElemType::Int32, &[3], InitMode::Zero).unwrap();
    engine.initialize(InitOptions::builder().build()).unwrap();

    let result = engine.download(&old);
    assert!(matches!(result, Err(Error::StaleHandle { handle: 1, current: 2 })), "{result:?}");
    assert_eq!(result.unwrap_err().status_code(), -101);
}

#[test]
fn test_failed_initialize_keeps_session() {
    let (_, mut engine) = host_engine();
    let array = engine.construct(ElemType::Int32, &[3], InitMode::Index).unwrap();

    let result = engine.initialize(InitOptions::builder().platform(5).build());
    assert!(matches!(result, Err(Error::Device { .. })));

    let host = engine.download(&array).unwrap();
    assert_eq!(host.to_vec::<i32>().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_gpu_initialization_without_gpu_fails() {
    let (_, mut engine) = host_engine();
    let result = engine.initialize(InitOptions::builder().gpu(true).build());
    assert!(matches!(result, Err(Error::Device { .. })));
    assert!(engine.current_device_info().is_none());
}

#[test]
fn test_gpu_initialization_picks_gpu_platform() {
    let driver = HostDriver::with_topology(vec![vec![DeviceKind::Cpu], vec![DeviceKind::Gpu]]);
    let (_, mut engine) = host_engine_with(driver);

    let active = engine.initialize(InitOptions::builder().gpu(true).build()).unwrap();
    assert_eq!(active.platform(), 1);
    assert_eq!(engine.current_device_info().unwrap().kind, DeviceKind::Gpu);
}

#[test]
fn test_shutdown_clears_cache() {
    let (_, mut engine) = host_engine();
    engine.construct(ElemType::Float32, &[2], InitMode::Zero).unwrap();
    assert_eq!(engine.cache().len(), 1);

    assert!(engine.shutdown());
    assert!(engine.cache().is_empty());
    assert!(!engine.shutdown());

    engine.construct(ElemType::Float32, &[2], InitMode::Zero).unwrap();
    assert_eq!(engine.session().generation(), 2);
}

#[test]
fn test_queries_do_not_initialize() {
    let (driver, engine) = host_engine();
    assert_eq!(engine.list_platforms().unwrap().len(), 1);
    assert_eq!(engine.list_devices(0, false).unwrap().len(), 1);
    assert!(engine.list_devices(0, true).unwrap().is_empty());
    assert_eq!(driver.stats().contexts_opened, 0);
}

#[test_case(ElemType::Int32 ; "int32")]
#[test_case(ElemType::UInt64 ; "uint64")]
#[test_case(ElemType::Int16 ; "int16")]
fn test_zero_and_index_construction(ty: ElemType) {
    let (_, mut engine) = host_engine();
    let zero = engine.construct(ty, &[8], InitMode::Zero).unwrap();
    let index = engine.construct(ty, &[8], InitMode::Index).unwrap();

    assert_eq!(engine.download(&zero).unwrap().as_bytes(), vec![0; 8 * ty.bytes()]);
    let index = engine.download(&index).unwrap();
    let expected: Vec<u8> = (0..8u8)
        .flat_map(|i| {
            let mut slot = vec![0; ty.bytes()];
            slot[0] = i;
            slot
        })
        .collect();
    assert_eq!(index.as_bytes(), expected);
}

#[test]
fn test_complex_index_fills_real_part() {
    let (_, mut engine) = host_engine();
    let array = engine.construct(ElemType::Complex64, &[3], InitMode::Index).unwrap();
    let values = engine.download(&array).unwrap().to_vec::<Complex32>().unwrap();
    assert_eq!(values, vec![Complex32::new(0.0, 0.0), Complex32::new(1.0, 0.0), Complex32::new(2.0, 0.0)]);
}

#[test]
fn test_uninitialized_construction_skips_fill() {
    let (driver, mut engine) = host_engine();
    let array = engine.construct(ElemType::Float64, &[8], InitMode::Uninitialized).unwrap();
    assert_eq!(array.element_count(), 8);
    assert_eq!(driver.stats().compiles, 0);
    assert_eq!(driver.stats().launches, 0);
}

#[test]
fn test_construct_rejects_bad_shapes() {
    let (_, mut engine) = host_engine();
    let result = engine.construct(ElemType::Byte, &[1; 9], InitMode::Zero);
    assert!(matches!(result, Err(Error::RankTooLarge { rank: 9 })));

    let result = engine.construct(ElemType::Byte, &[2, 0], InitMode::Zero);
    assert!(matches!(result, Err(Error::InvalidShape { .. })));
    assert_eq!(result.unwrap_err().status_code(), -6);
}

#[test]
fn test_construct_rejects_overflowing_byte_size() {
    let (driver, mut engine) = host_engine();
    let result = engine.construct(ElemType::Float64, &[usize::MAX / 2, 3], InitMode::Zero);
    assert!(matches!(result, Err(Error::InvalidShape { .. })), "{result:?}");

    let result = engine.construct(ElemType::Complex128, &[usize::MAX / 8], InitMode::Uninitialized);
    assert!(matches!(result, Err(Error::InvalidShape { .. })), "{result:?}");
    assert_eq!(driver.stats().launches, 0);
}

#[test]
fn test_construct_beyond_device_memory_fails() {
    let (_, mut engine) = host_engine();
    let limit = engine.ensure_initialized().unwrap().device_info().global_mem_size as usize;

    let result = engine.construct(ElemType::Byte, &[limit + 1], InitMode::Zero);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Device { source: clarray_device::Error::AllocationFailed { .. } }), "{err:?}");
    assert_eq!(err.status_code(), -61);
}

#[test]
fn test_reshape_in_place() {
    let (_, mut engine) = host_engine();
    let mut array = engine.construct(ElemType::Int32, &[4, 5], InitMode::Index).unwrap();

    let reshaped = engine.reshape(&mut array, &[10, 2], true).unwrap();
    assert_eq!(array.shape(), &[10, 2]);
    assert_eq!(reshaped.shape(), &[10, 2]);
    assert!(reshaped.buffer().unwrap().shares_storage(array.buffer().unwrap()));
}

#[test]
fn test_reshape_copy_leaves_source() {
    let (_, mut engine) = host_engine();
    let mut array = engine.construct(ElemType::Int32, &[4, 5], InitMode::Index).unwrap();

    let copy = engine.reshape(&mut array, &[2, 10], false).unwrap();
    assert_eq!(array.shape(), &[4, 5]);
    assert_eq!(copy.shape(), &[2, 10]);
    assert!(!copy.buffer().unwrap().shares_storage(array.buffer().unwrap()));
    assert_eq!(engine.download(&copy).unwrap().to_vec::<i32>().unwrap(), (0..20).collect::<Vec<_>>());
}

#[test]
fn test_reshape_rejects_other_counts() {
    let (_, mut engine) = host_engine();
    let mut array = engine.construct(ElemType::Int32, &[4, 5], InitMode::Zero).unwrap();

    let result = engine.reshape(&mut array, &[7, 3], true);
    assert!(matches!(result, Err(Error::ShapeMismatch { expected: 20, actual: 21 })), "{result:?}");
    assert_eq!(array.shape(), &[4, 5]);
}

#[test]
fn test_release_view_keeps_parent() {
    let (_, mut engine) = host_engine();
    let parent = engine.construct(ElemType::Float32, &[8], InitMode::Index).unwrap();
    let mut view = engine.view(&parent, 2, 3).unwrap();
    assert!(view.is_view());

    assert!(engine.release(&mut view));
    let values = engine.download(&parent).unwrap().to_vec::<f32>().unwrap();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
}

#[test]
fn test_view_outlives_released_parent() {
    let (_, mut engine) = host_engine();
    let mut parent = engine.construct(ElemType::UInt16, &[6], InitMode::Index).unwrap();
    let view = engine.view(&parent, 4, 2).unwrap();

    engine.release(&mut parent);
    assert_eq!(engine.download(&view).unwrap().to_vec::<u16>().unwrap(), vec![4, 5]);
}

#[test]
fn test_view_writes_reach_parent() {
    let (_, mut engine) = host_engine();
    let parent = engine.construct(ElemType::Int32, &[6], InitMode::Zero).unwrap();
    let view = engine.view(&parent, 1, 3).unwrap();

    let source = engine.upload(&HostArray::from_vec(vec![7i32, 8, 9]).unwrap()).unwrap();
    engine.apply_binary(BinaryOp::Add, &source, &source, Some(view)).unwrap();

    let values = engine.download(&parent).unwrap().to_vec::<i32>().unwrap();
    assert_eq!(values, vec![0, 14, 16, 18, 0, 0]);
}

#[test_case(5, 2 ; "past end")]
#[test_case(6, 1 ; "offset at end")]
#[test_case(usize::MAX, 2 ; "overflowing offset")]
fn test_view_out_of_bounds(offset: usize, length: usize) {
    let (_, mut engine) = host_engine();
    let parent = engine.construct(ElemType::Byte, &[6], InitMode::Zero).unwrap();
    let result = engine.view(&parent, offset, length);
    assert!(matches!(result, Err(Error::Device { .. })), "{result:?}");
}

#[test]
fn test_release_all_counts_live_handles() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Byte, &[2], InitMode::Zero).unwrap();
    let mut b = engine.construct(ElemType::Byte, &[2], InitMode::Zero).unwrap();
    engine.release(&mut b);

    let mut handles = [a, b];
    assert_eq!(engine.release_all(&mut handles), 1);
    assert!(handles.iter().all(|h| h.is_released()));
}

#[test]
fn test_global_engine_is_shared() {
    let first = {
        let mut engine = crate::global_engine();
        engine.construct(ElemType::Byte, &[1], InitMode::Zero).unwrap().generation()
    };
    let second = crate::global_engine().session().generation();
    assert_eq!(first, second);
}
