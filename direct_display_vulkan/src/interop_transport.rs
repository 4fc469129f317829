/// InteropTransport - how memory and semaphores cross from Vulkan to OpenGL
///
/// Two transports exist: Win32 NT handles (`OPAQUE_WIN32`, display taken
/// through the NV WinRT acquire path) and POSIX file descriptors
/// (`OPAQUE_FD`, display acquired by the driver on surface creation). The
/// backend is generic over the transport so the platform choice is made once
/// at compile time.

use ash::vk;
use direct_display::{Error, Extent2D, NativeTexture, Result};
use direct_display::dd_error;
#[cfg(windows)]
use direct_display::dd_warn;
use gl::types::GLuint;
use std::ffi::CStr;

use crate::gl_interop::GlInterop;

pub(crate) const SOURCE: &str = "direct_display::vulkan";

/// OS handle exported from Vulkan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedHandle {
    /// NT handle (Windows)
    Win32(vk::HANDLE),
    /// File descriptor (Linux)
    Fd(i32),
}

/// GL objects created from one imported memory handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedTexture {
    pub memory_object: GLuint,
    pub texture: NativeTexture,
}

pub trait InteropTransport: Sized {
    /// Short transport name for logs
    fn name() -> &'static str;

    fn memory_handle_type() -> vk::ExternalMemoryHandleTypeFlags;

    fn semaphore_handle_type() -> vk::ExternalSemaphoreHandleTypeFlags;

    /// Instance extensions on top of surface/display/external capabilities
    fn instance_extensions() -> Vec<&'static CStr>;

    /// Device extensions on top of swapchain/external memory/external semaphore
    fn device_extensions() -> Vec<&'static CStr>;

    /// Take exclusive control of `display` before surface creation
    fn acquire_display(
        entry: &ash::Entry,
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        display: vk::DisplayKHR,
    ) -> Result<()>;

    /// Fail early if the GL context lacks this transport's import entry points
    fn check_gl_support(gl: &GlInterop) -> Result<()>;

    /// Load the export entry points once the logical device exists
    fn new(instance: &ash::Instance, device: &ash::Device) -> Result<Self>;

    fn export_memory_handle(&self, memory: vk::DeviceMemory) -> Result<SharedHandle>;

    fn export_semaphore_handle(&self, semaphore: vk::Semaphore) -> Result<SharedHandle>;

    /// Hand `handle` to `memory_object`
    fn import_memory(&self, gl: &GlInterop, memory_object: GLuint, size: u64, handle: SharedHandle) -> Result<()>;

    /// Hand `handle` to `semaphore`
    fn import_semaphore(&self, gl: &GlInterop, semaphore: GLuint, handle: SharedHandle) -> Result<()>;

    /// Release the exporter's reference to `handle`
    fn release_handle(&self, handle: SharedHandle);

    /// Import `handle` (an allocation of `size` bytes) as a GL memory object
    /// and bind a texture of `extent` to it
    fn import_texture_from_handle(
        &self,
        gl: &GlInterop,
        handle: SharedHandle,
        size: u64,
        extent: Extent2D,
    ) -> Result<ImportedTexture> {
        let memory_object = gl.create_memory_object()?;
        if let Err(e) = self.import_memory(gl, memory_object, size, handle) {
            gl.delete_memory_object(memory_object);
            return Err(e);
        }
        match gl.create_texture_from_memory(memory_object, extent) {
            Ok(texture) => Ok(ImportedTexture { memory_object, texture }),
            Err(e) => {
                gl.delete_memory_object(memory_object);
                Err(e)
            }
        }
    }

    /// Import `handle` as a new GL semaphore
    fn import_semaphore_from_handle(&self, gl: &GlInterop, handle: SharedHandle) -> Result<GLuint> {
        let semaphore = gl.gen_semaphore()?;
        if let Err(e) = self.import_semaphore(gl, semaphore, handle) {
            gl.delete_semaphore(semaphore);
            return Err(e);
        }
        Ok(semaphore)
    }
}

fn wrong_handle(expected: &str, handle: SharedHandle) -> Error {
    dd_error!(SOURCE, "Expected a {} handle, got {:?}", expected, handle);
    Error::InteropFailed(format!("Expected a {} handle, got {:?}", expected, handle))
}

// ============================================================================
// WIN32
// ============================================================================

#[cfg(windows)]
pub use win32::Win32Transport;

#[cfg(windows)]
mod win32 {
    use super::*;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};

    /// NT handle transport
    pub struct Win32Transport {
        memory_loader: ash::khr::external_memory_win32::Device,
        semaphore_loader: ash::khr::external_semaphore_win32::Device,
    }

    impl InteropTransport for Win32Transport {
        fn name() -> &'static str {
            "win32"
        }

        fn memory_handle_type() -> vk::ExternalMemoryHandleTypeFlags {
            vk::ExternalMemoryHandleTypeFlags::OPAQUE_WIN32
        }

        fn semaphore_handle_type() -> vk::ExternalSemaphoreHandleTypeFlags {
            vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_WIN32
        }

        fn instance_extensions() -> Vec<&'static CStr> {
            vec![ash::ext::direct_mode_display::NAME]
        }

        fn device_extensions() -> Vec<&'static CStr> {
            vec![
                ash::khr::external_memory_win32::NAME,
                ash::khr::external_semaphore_win32::NAME,
                ash::nv::acquire_winrt_display::NAME,
            ]
        }

        fn acquire_display(
            entry: &ash::Entry,
            instance: &ash::Instance,
            physical_device: vk::PhysicalDevice,
            display: vk::DisplayKHR,
        ) -> Result<()> {
            let loader = ash::nv::acquire_winrt_display::Instance::new(entry, instance);
            unsafe {
                (loader.fp().acquire_winrt_display_nv)(physical_device, display).result().map_err(|e| {
                    dd_error!(SOURCE, "Failed to acquire display: {:?}", e);
                    Error::InitializationFailed(format!("Failed to acquire display: {:?}", e))
                })
            }
        }

        fn check_gl_support(gl: &GlInterop) -> Result<()> {
            if gl.supports_win32_import() {
                Ok(())
            } else {
                dd_error!(SOURCE, "GL context lacks EXT_memory_object_win32 / EXT_semaphore_win32");
                Err(Error::InteropFailed(
                    "GL context lacks EXT_memory_object_win32 / EXT_semaphore_win32".to_string(),
                ))
            }
        }

        fn new(instance: &ash::Instance, device: &ash::Device) -> Result<Self> {
            Ok(Self {
                memory_loader: ash::khr::external_memory_win32::Device::new(instance, device),
                semaphore_loader: ash::khr::external_semaphore_win32::Device::new(instance, device),
            })
        }

        fn export_memory_handle(&self, memory: vk::DeviceMemory) -> Result<SharedHandle> {
            let info = vk::MemoryGetWin32HandleInfoKHR::default()
                .memory(memory)
                .handle_type(Self::memory_handle_type());
            unsafe {
                self.memory_loader
                    .get_memory_win32_handle(&info)
                    .map(SharedHandle::Win32)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to export memory handle: {:?}", e);
                        Error::InteropFailed(format!("Failed to export memory handle: {:?}", e))
                    })
            }
        }

        fn export_semaphore_handle(&self, semaphore: vk::Semaphore) -> Result<SharedHandle> {
            let info = vk::SemaphoreGetWin32HandleInfoKHR::default()
                .semaphore(semaphore)
                .handle_type(Self::semaphore_handle_type());
            unsafe {
                self.semaphore_loader
                    .get_semaphore_win32_handle(&info)
                    .map(SharedHandle::Win32)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to export semaphore handle: {:?}", e);
                        Error::InteropFailed(format!("Failed to export semaphore handle: {:?}", e))
                    })
            }
        }

        fn import_memory(&self, gl: &GlInterop, memory_object: GLuint, size: u64, handle: SharedHandle) -> Result<()> {
            match handle {
                SharedHandle::Win32(raw) => gl.import_memory_win32(memory_object, size, raw as *mut _),
                other => Err(wrong_handle("win32", other)),
            }
        }

        fn import_semaphore(&self, gl: &GlInterop, semaphore: GLuint, handle: SharedHandle) -> Result<()> {
            match handle {
                SharedHandle::Win32(raw) => gl.import_semaphore_win32(semaphore, raw as *mut _),
                other => Err(wrong_handle("win32", other)),
            }
        }

        /// GL duplicates NT handles on import, the exporter copy is closed here
        fn release_handle(&self, handle: SharedHandle) {
            if let SharedHandle::Win32(raw) = handle {
                if !raw.is_null() {
                    if let Err(e) = unsafe { CloseHandle(HANDLE(raw as *mut _)) } {
                        dd_warn!(SOURCE, "Failed to close exported handle {:?}: {}", raw, e);
                    }
                }
            }
        }
    }
}

// ============================================================================
// POSIX FD
// ============================================================================

#[cfg(unix)]
pub use fd::FdTransport;

#[cfg(unix)]
mod fd {
    use super::*;
    use std::os::fd::{FromRawFd, OwnedFd};

    /// File descriptor transport
    pub struct FdTransport {
        memory_loader: ash::khr::external_memory_fd::Device,
        semaphore_loader: ash::khr::external_semaphore_fd::Device,
    }

    impl FdTransport {
        fn close(fd: i32) {
            if fd >= 0 {
                drop(unsafe { OwnedFd::from_raw_fd(fd) });
            }
        }
    }

    impl InteropTransport for FdTransport {
        fn name() -> &'static str {
            "fd"
        }

        fn memory_handle_type() -> vk::ExternalMemoryHandleTypeFlags {
            vk::ExternalMemoryHandleTypeFlags::OPAQUE_FD
        }

        fn semaphore_handle_type() -> vk::ExternalSemaphoreHandleTypeFlags {
            vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_FD
        }

        fn instance_extensions() -> Vec<&'static CStr> {
            Vec::new()
        }

        fn device_extensions() -> Vec<&'static CStr> {
            vec![
                ash::khr::external_memory_fd::NAME,
                ash::khr::external_semaphore_fd::NAME,
            ]
        }

        /// The display is taken when the display plane surface is created
        fn acquire_display(
            _entry: &ash::Entry,
            _instance: &ash::Instance,
            _physical_device: vk::PhysicalDevice,
            _display: vk::DisplayKHR,
        ) -> Result<()> {
            Ok(())
        }

        fn check_gl_support(gl: &GlInterop) -> Result<()> {
            if gl.supports_fd_import() {
                Ok(())
            } else {
                dd_error!(SOURCE, "GL context lacks EXT_memory_object_fd / EXT_semaphore_fd");
                Err(Error::InteropFailed(
                    "GL context lacks EXT_memory_object_fd / EXT_semaphore_fd".to_string(),
                ))
            }
        }

        fn new(instance: &ash::Instance, device: &ash::Device) -> Result<Self> {
            Ok(Self {
                memory_loader: ash::khr::external_memory_fd::Device::new(instance, device),
                semaphore_loader: ash::khr::external_semaphore_fd::Device::new(instance, device),
            })
        }

        fn export_memory_handle(&self, memory: vk::DeviceMemory) -> Result<SharedHandle> {
            let info = vk::MemoryGetFdInfoKHR::default()
                .memory(memory)
                .handle_type(Self::memory_handle_type());
            unsafe {
                self.memory_loader
                    .get_memory_fd(&info)
                    .map(SharedHandle::Fd)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to export memory fd: {:?}", e);
                        Error::InteropFailed(format!("Failed to export memory fd: {:?}", e))
                    })
            }
        }

        fn export_semaphore_handle(&self, semaphore: vk::Semaphore) -> Result<SharedHandle> {
            let info = vk::SemaphoreGetFdInfoKHR::default()
                .semaphore(semaphore)
                .handle_type(Self::semaphore_handle_type());
            unsafe {
                self.semaphore_loader
                    .get_semaphore_fd(&info)
                    .map(SharedHandle::Fd)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to export semaphore fd: {:?}", e);
                        Error::InteropFailed(format!("Failed to export semaphore fd: {:?}", e))
                    })
            }
        }

        /// A successful import transfers fd ownership to GL, a failed one
        /// leaves it with us
        fn import_memory(&self, gl: &GlInterop, memory_object: GLuint, size: u64, handle: SharedHandle) -> Result<()> {
            match handle {
                SharedHandle::Fd(fd) => gl.import_memory_fd(memory_object, size, fd).inspect_err(|_| Self::close(fd)),
                other => Err(wrong_handle("fd", other)),
            }
        }

        fn import_semaphore(&self, gl: &GlInterop, semaphore: GLuint, handle: SharedHandle) -> Result<()> {
            match handle {
                SharedHandle::Fd(fd) => gl.import_semaphore_fd(semaphore, fd).inspect_err(|_| Self::close(fd)),
                other => Err(wrong_handle("fd", other)),
            }
        }

        /// Imported fds belong to GL
        fn release_handle(&self, _handle: SharedHandle) {}
    }
}
