/*!
# Direct Display - Vulkan Backend

Vulkan `VK_KHR_display` implementation of the `direct_display::DisplayBackend`
trait, with OpenGL texture interop through `EXT_memory_object` and
`EXT_semaphore`.

The shared-handle transport is chosen per platform: NT handles on Windows
(`Win32Transport`), file descriptors on Linux (`FdTransport`).
`PlatformDisplayBackend` names the backend for the current target.

```no_run
use direct_display::{Config, DirectDisplay};
use direct_display_vulkan::PlatformDisplayBackend;

# fn get_proc_address(_: &str) -> *const std::ffi::c_void { std::ptr::null() }
// GL context current on this thread
let backend = PlatformDisplayBackend::new(get_proc_address)?;
let mut display = DirectDisplay::init(backend, Config::default())?;
loop {
    let texture = display.get_texture()?;
    // render into `texture` with GL ...
    let _ = texture;
    display.submit_texture()?;
}
# Ok::<(), direct_display::Error>(())
```
*/

mod debug;
mod gl_interop;
mod interop_transport;
mod vulkan_backend;
mod vulkan_convert;
mod vulkan_device;
mod vulkan_display;
mod vulkan_frame;
mod vulkan_instance;
mod vulkan_interop;
mod vulkan_swapchain;

pub use vulkan_backend::VulkanDisplayBackend;
pub use interop_transport::{ImportedTexture, InteropTransport, SharedHandle};
pub use gl_interop::GlInterop;

#[cfg(windows)]
pub use interop_transport::Win32Transport;
#[cfg(unix)]
pub use interop_transport::FdTransport;

/// Transport for the current target
#[cfg(windows)]
pub type PlatformTransport = Win32Transport;
/// Transport for the current target
#[cfg(unix)]
pub type PlatformTransport = FdTransport;

pub type PlatformDisplayBackend = VulkanDisplayBackend<PlatformTransport>;

// Re-export debug utilities
pub use debug::{reset_validation_stats, validation_stats, ValidationStats};
