//! Unit tests for MockBackend
//!
//! The frame protocol tests rely on the mock rejecting misordered
//! semaphore and fence usage, so that behaviour is checked here directly.

use crate::backend::mock_backend::{MockBackend, MockFence};
use crate::backend::DisplayBackend;
use crate::error::Error;
use crate::types::Extent2D;

fn backend_with_slots(count: usize, fences: usize) -> MockBackend {
    let mut backend = MockBackend::new();
    for slot in 0..count {
        backend.create_interop_slot(slot, Extent2D::new(64, 64)).unwrap();
    }
    backend.create_frame_sync(count, fences).unwrap();
    backend
}

#[test]
fn test_mock_textures_are_nonzero_names() {
    let backend = backend_with_slots(3, 3);
    assert_eq!(backend.textures, vec![1, 2, 3]);
}

#[test]
fn test_mock_interop_slots_in_order() {
    let mut backend = MockBackend::new();
    let result = backend.create_interop_slot(1, Extent2D::new(64, 64));
    assert!(matches!(result, Err(Error::BackendError(_))));
}

#[test]
fn test_mock_wait_unsignalled_available_fails() {
    let mut backend = backend_with_slots(2, 2);
    assert!(backend.wait_available(0).is_err());

    backend.presignal_available(2).unwrap();
    assert!(backend.wait_available(0).is_ok());
    assert!(backend.wait_available(0).is_err());
}

#[test]
fn test_mock_double_signal_fails() {
    let mut backend = backend_with_slots(2, 2);
    backend.signal_finished(1).unwrap();
    assert!(backend.signal_finished(1).is_err());
}

#[test]
fn test_mock_submit_requires_reset_fence() {
    let mut backend = backend_with_slots(1, 1);
    backend.signal_finished(0).unwrap();
    backend.acquire_next_image(0).unwrap();

    // Fence starts signalled: submitting without a reset is rejected
    assert!(backend.submit_blit(0, 0).is_err());

    backend.wait_frame_fence(0).unwrap();
    assert!(backend.submit_blit(0, 0).is_err());

    backend.reset_frame_fence(0).unwrap();
    backend.submit_blit(0, 0).unwrap();
    assert_eq!(backend.fences[0], MockFence::Pending);
    assert_eq!(backend.in_flight, 1);
}

#[test]
fn test_mock_fence_wait_completes_pending() {
    let mut backend = backend_with_slots(1, 1);
    backend.wait_frame_fence(0).unwrap();
    backend.signal_finished(0).unwrap();
    backend.acquire_next_image(0).unwrap();
    backend.reset_frame_fence(0).unwrap();
    backend.submit_blit(0, 0).unwrap();

    backend.wait_frame_fence(0).unwrap();
    assert_eq!(backend.in_flight, 0);
    assert_eq!(backend.fences[0], MockFence::Signaled);

    // Waiting again on a signalled fence returns at once
    backend.wait_frame_fence(0).unwrap();

    // Reset fence with no submission would never signal
    backend.reset_frame_fence(0).unwrap();
    assert!(backend.wait_frame_fence(0).is_err());
}

#[test]
fn test_mock_reset_requires_signalled_fence() {
    let mut backend = backend_with_slots(1, 1);
    backend.reset_frame_fence(0).unwrap();
    assert!(backend.reset_frame_fence(0).is_err());
    assert!(backend.reset_frame_fence(3).is_err());
}

#[test]
fn test_mock_acquire_round_robin() {
    let mut backend = backend_with_slots(3, 3);
    let mut images = Vec::new();
    for slot in 0..3 {
        images.push(backend.acquire_next_image(slot).unwrap());
    }
    assert_eq!(images, vec![0, 1, 2]);
}

#[test]
fn test_mock_failure_injection_records_call() {
    let mut backend = MockBackend::new().failing_at("create_device");
    assert!(backend.create_device(0).is_err());
    assert_eq!(backend.call_count("create_device"), 1);
    assert_eq!(backend.device_queue_family, None);
}

#[test]
fn test_mock_out_of_range_slot() {
    let mut backend = backend_with_slots(2, 2);
    assert!(backend.signal_available(2).is_err());
}
