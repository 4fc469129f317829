//! Integration tests for the Vulkan display backend
//!
//! GPU-free: construction failure paths and the per-platform transport
//! tables. A full presentation run needs a current GL context and a free
//! display output and is left to the demo binaries.

use ash::vk;
use direct_display::Error;
use direct_display_vulkan::{GlInterop, InteropTransport, PlatformDisplayBackend, PlatformTransport};
use std::ffi::c_void;

fn null_loader(_: &str) -> *const c_void {
    std::ptr::null()
}

// ============================================================================
// GL LOADING
// ============================================================================

#[test]
fn test_gl_interop_requires_memory_object_entry_points() {
    let result = GlInterop::load(&mut null_loader);
    match result {
        Err(Error::InteropFailed(message)) => assert!(message.contains("glCreateMemoryObjectsEXT")),
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("loading from a null loader must fail"),
    }
}

#[test]
fn test_backend_without_gl_context_fails_before_vulkan() {
    let result = PlatformDisplayBackend::new(null_loader);
    assert!(matches!(result, Err(Error::InteropFailed(_))));
}

#[test]
fn test_missing_import_entry_points_are_optional_at_load() {
    // Every mandatory entry point resolves to a dummy address, imports do not
    let mut loader = |name: &str| -> *const c_void {
        if name.starts_with("glImport") {
            std::ptr::null()
        } else {
            0x1 as *const c_void
        }
    };
    let gl = GlInterop::load(&mut loader).unwrap();
    assert!(!gl.supports_fd_import());
    assert!(!gl.supports_win32_import());
    assert!(matches!(PlatformTransport::check_gl_support(&gl), Err(Error::InteropFailed(_))));
}

// ============================================================================
// TRANSPORT TABLES
// ============================================================================

fn names(list: Vec<&'static std::ffi::CStr>) -> Vec<String> {
    list.iter().map(|n| n.to_string_lossy().into_owned()).collect()
}

#[cfg(unix)]
#[test]
fn test_fd_transport_tables() {
    assert_eq!(PlatformTransport::name(), "fd");
    assert_eq!(PlatformTransport::memory_handle_type(), vk::ExternalMemoryHandleTypeFlags::OPAQUE_FD);
    assert_eq!(
        PlatformTransport::semaphore_handle_type(),
        vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_FD
    );
    assert!(PlatformTransport::instance_extensions().is_empty());
    assert_eq!(
        names(PlatformTransport::device_extensions()),
        vec!["VK_KHR_external_memory_fd", "VK_KHR_external_semaphore_fd"]
    );
}

#[cfg(windows)]
#[test]
fn test_win32_transport_tables() {
    assert_eq!(PlatformTransport::name(), "win32");
    assert_eq!(PlatformTransport::memory_handle_type(), vk::ExternalMemoryHandleTypeFlags::OPAQUE_WIN32);
    assert_eq!(
        PlatformTransport::semaphore_handle_type(),
        vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_WIN32
    );
    assert_eq!(names(PlatformTransport::instance_extensions()), vec!["VK_EXT_direct_mode_display"]);
    assert_eq!(
        names(PlatformTransport::device_extensions()),
        vec![
            "VK_KHR_external_memory_win32",
            "VK_KHR_external_semaphore_win32",
            "VK_NV_acquire_winrt_display",
        ]
    );
}
