//! Unit tests for FrameSync

use crate::error::Error;
use crate::frame::FrameSync;
use crate::graphics_device::mock_graphics_device::{CapturingLogger, MockGpu, MockGraphicsDevice};
use crate::log::{LogRegistry, LogSeverity};
use serial_test::serial;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn sync(timeout: Duration) -> (Arc<MockGpu>, FrameSync) {
    let gpu = MockGpu::new();
    let device = MockGraphicsDevice::new(&gpu);
    let sync = FrameSync::new(&device, timeout, LogRegistry::silent()).unwrap();
    (gpu, sync)
}

// ============================================================================
// SIGNAL
// ============================================================================

#[test]
fn test_first_signal_is_one() {
    let (_gpu, mut sync) = sync(Duration::from_millis(100));
    assert_eq!(sync.last_signaled(), 0);
    assert_eq!(sync.signal().unwrap(), 1);
    assert_eq!(sync.last_signaled(), 1);
}

#[test]
fn test_signal_values_strictly_increase() {
    let (_gpu, mut sync) = sync(Duration::from_millis(100));
    let values: Vec<u64> = (0..5).map(|_| sync.signal().unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_failed_signal_does_not_reuse_value() {
    let (gpu, mut sync) = sync(Duration::from_millis(100));
    assert_eq!(sync.signal().unwrap(), 1);
    gpu.fail_on("signal");
    assert!(sync.signal().is_err());
    assert_eq!(sync.last_signaled(), 1);
    assert_eq!(sync.signal().unwrap(), 3);
}

#[test]
fn test_next_value_skips_rejected_signals() {
    let (gpu, mut sync) = sync(Duration::from_millis(100));
    assert_eq!(sync.next_value(), 1);
    gpu.fail_on("signal");
    assert!(sync.signal().is_err());
    assert_eq!(sync.next_value(), 2);
    assert_eq!(sync.signal().unwrap(), 2);
}

// ============================================================================
// WAIT
// ============================================================================

#[test]
fn test_wait_after_signal_returns_and_completes() {
    let (_gpu, mut sync) = sync(Duration::from_millis(100));
    let value = sync.signal().unwrap();
    sync.wait_until(value).unwrap();
    assert!(sync.completed_value().unwrap() >= value);
}

#[test]
fn test_wait_on_completed_value_returns_immediately() {
    let (_gpu, mut sync) = sync(Duration::from_millis(100));
    sync.signal().unwrap();
    sync.signal().unwrap();
    sync.wait_until(1).unwrap();
    sync.wait_until(0).unwrap();
}

#[test]
fn test_wait_on_unsignaled_value_fails_fast() {
    let (_gpu, sync) = sync(Duration::from_secs(30));
    let result = sync.wait_until(1);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
#[serial]
fn test_wait_blocks_until_gpu_catches_up() {
    let (gpu, mut sync) = sync(Duration::from_secs(5));
    gpu.set_deferred_execution(true);
    let value = sync.signal().unwrap();

    let worker_gpu = Arc::clone(&gpu);
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        worker_gpu.execute_pending();
    });

    sync.wait_until(value).unwrap();
    assert_eq!(sync.completed_value().unwrap(), value);
    worker.join().unwrap();
}

#[test]
#[serial]
fn test_wait_times_out_on_stalled_gpu() {
    let gpu = MockGpu::new();
    let device = MockGraphicsDevice::new(&gpu);
    let (log, sink) = CapturingLogger::registry();
    let mut sync = FrameSync::new(&device, Duration::from_millis(20), log).unwrap();
    gpu.set_deferred_execution(true);

    let value = sync.signal().unwrap();
    let result = sync.wait_until(value);

    assert_eq!(result, Err(Error::FenceTimeout { value: 1, completed: 0 }));
    assert_eq!(sink.messages(LogSeverity::Error).len(), 1);
}

#[test]
fn test_wait_reports_device_loss() {
    let (gpu, mut sync) = sync(Duration::from_millis(100));
    gpu.set_deferred_execution(true);
    let value = sync.signal().unwrap();
    gpu.lose_device();
    assert!(matches!(sync.wait_until(value), Err(Error::DeviceLost { .. })));
}

// ============================================================================
// FLUSH
// ============================================================================

#[test]
fn test_flush_completes_everything() {
    let (_gpu, mut sync) = sync(Duration::from_millis(100));
    sync.signal().unwrap();
    let value = sync.flush().unwrap();
    assert_eq!(value, 2);
    assert_eq!(sync.completed_value().unwrap(), 2);
}
