//! Unit tests for error.rs

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_missing_extension_display() {
    let err = Error::MissingExtension("VK_KHR_display".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Required extension not found"));
    assert!(display.contains("VK_KHR_display"));
}

#[test]
fn test_no_suitable_device_display() {
    let err = Error::NoSuitableDevice;
    assert_eq!(format!("{}", err), "Could not find a GPU with suitable display device");
}

#[test]
fn test_no_compatible_plane_display() {
    let err = Error::NoCompatiblePlane;
    assert_eq!(format!("{}", err), "Could not find a compatible display plane");
}

#[test]
fn test_image_index_mismatch_display() {
    let err = Error::ImageIndexMismatch { expected: 1, acquired: 2 };
    let display = format!("{}", err);
    assert!(display.contains("image 2"));
    assert!(display.contains("slot 1"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("swapchain".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("swapchain"));
}

// ============================================================================
// ERROR CLASSIFICATION
// ============================================================================

#[test]
fn test_init_errors_are_fatal() {
    assert!(Error::NoSuitableDevice.is_fatal_init());
    assert!(Error::NoDisplay.is_fatal_init());
    assert!(Error::NoCompatiblePlane.is_fatal_init());
    assert!(Error::NoSuitableQueueFamily.is_fatal_init());
    assert!(Error::NoSuitableMemoryType.is_fatal_init());
    assert!(Error::MissingExtension("x".to_string()).is_fatal_init());
    assert!(Error::InteropFailed("x".to_string()).is_fatal_init());
}

#[test]
fn test_frame_errors_are_not_init_errors() {
    assert!(!Error::InvalidState("x".to_string()).is_fatal_init());
    assert!(!Error::ImageIndexMismatch { expected: 0, acquired: 1 }.is_fatal_init());
    assert!(!Error::BackendError("x".to_string()).is_fatal_init());
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::NoDisplay;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::InteropFailed("glImportMemoryWin32HandleEXT".to_string());
    assert_eq!(err.clone(), err);
}

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::NoSuitableQueueFamily)
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert_eq!(outer(), Err(Error::NoSuitableQueueFamily));
}
