/// DisplayBackend trait - the device seam of the direct display presenter
///
/// The orchestrator (`DirectDisplay`) drives a backend through the init
/// stages in a fixed order and then through the per-frame protocol. The
/// backend owns every device resource and shared handle, the orchestrator
/// owns only the selection decisions and the frame cursor.
///
/// Slot indices passed to the frame methods are always `< slot_count`, and
/// fence indices are always `< fence_count`, as established at init.

use crate::config::Config;
use crate::error::Result;
use crate::types::{
    AlphaModes, DisplayId, DisplayMode, DisplayModeId, DisplayPlane, DisplayProperties,
    DisplaySurfaceDesc, Extent2D, NativeTexture, PhysicalDeviceInfo, PresentMode,
    QueueFamilyInfo, SurfaceCapabilities, SurfaceFormat, SwapchainDesc,
};

pub trait DisplayBackend {
    // ===== BOOTSTRAP =====

    /// Instance extensions that must all be present
    fn required_instance_extensions(&self) -> Vec<String>;

    /// Device extensions a physical device must expose to qualify
    fn required_device_extensions(&self) -> Vec<String>;

    /// Instance extensions exposed by the loader
    fn available_instance_extensions(&mut self) -> Result<Vec<String>>;

    /// Create the API instance with the required instance extensions enabled
    fn create_instance(&mut self, config: &Config) -> Result<()>;

    /// Physical devices in enumeration order
    fn enumerate_physical_devices(&mut self) -> Result<Vec<PhysicalDeviceInfo>>;

    /// Bind the backend to the device at `index` (as enumerated)
    fn select_physical_device(&mut self, index: usize) -> Result<()>;

    // ===== DISPLAY SURFACE =====

    /// Displays attached to the selected physical device
    fn displays(&mut self) -> Result<Vec<DisplayProperties>>;

    fn display_modes(&mut self, display: DisplayId) -> Result<Vec<DisplayMode>>;

    /// Take exclusive control of a display output
    fn acquire_display(&mut self, display: DisplayId) -> Result<()>;

    fn display_planes(&mut self) -> Result<Vec<DisplayPlane>>;

    /// Displays the plane at `plane_index` can drive
    fn plane_supported_displays(&mut self, plane_index: u32) -> Result<Vec<DisplayId>>;

    /// Alpha modes the plane supports for `mode`
    fn plane_supported_alpha(&mut self, mode: DisplayModeId, plane_index: u32)
        -> Result<AlphaModes>;

    /// Create the presentable surface bound to the display output
    fn create_display_surface(&mut self, desc: &DisplaySurfaceDesc) -> Result<()>;

    // ===== LOGICAL DEVICE =====

    /// Queue families, with present support evaluated against the surface
    fn queue_families(&mut self) -> Result<Vec<QueueFamilyInfo>>;

    /// Create the logical device with one queue from `queue_family`
    fn create_device(&mut self, queue_family: u32) -> Result<()>;

    fn create_command_pool(&mut self) -> Result<()>;

    // ===== SWAPCHAIN =====

    fn surface_capabilities(&mut self) -> Result<SurfaceCapabilities>;

    fn surface_formats(&mut self) -> Result<Vec<SurfaceFormat>>;

    fn present_modes(&mut self) -> Result<Vec<PresentMode>>;

    /// Create the swapchain and return the number of images it holds
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<usize>;

    // ===== INTEROP POOL =====

    /// Create the shared texture and semaphores for one slot and import them
    /// into the rendering API
    ///
    /// # Returns
    ///
    /// The texture handle in the rendering API
    fn create_interop_slot(&mut self, slot: usize, extent: Extent2D) -> Result<NativeTexture>;

    /// Create the per-slot "image acquired" / "blit finished" semaphores and
    /// `fence_count` fences (created signalled)
    fn create_frame_sync(&mut self, slot_count: usize, fence_count: usize) -> Result<()>;

    /// Record one blit command buffer per slot
    ///
    /// # Returns
    ///
    /// Number of command buffers recorded
    fn record_blit_commands(&mut self, slot_count: usize) -> Result<usize>;

    /// Signal every slot's "available" semaphore once so the first frame
    /// does not wait on a signal nobody sends
    fn presignal_available(&mut self, slot_count: usize) -> Result<()>;

    // ===== FRAME =====

    /// Rendering timeline: wait on the slot's "available" semaphore
    fn wait_available(&mut self, slot: usize) -> Result<()>;

    /// Host: block until the fence is signalled, leaving it signalled
    fn wait_frame_fence(&mut self, fence: usize) -> Result<()>;

    /// Host: return the fence to unsignalled, right before the submission
    /// that signals it
    fn reset_frame_fence(&mut self, fence: usize) -> Result<()>;

    /// Rendering timeline: signal the slot's "finished" semaphore and flush
    fn signal_finished(&mut self, slot: usize) -> Result<()>;

    /// Presentation timeline: acquire the next swapchain image, signalling the
    /// slot's "image acquired" semaphore
    fn acquire_next_image(&mut self, slot: usize) -> Result<u32>;

    /// Submit the slot's blit, waiting on "finished" + "image acquired",
    /// signalling "blit finished" and the fence
    fn submit_blit(&mut self, slot: usize, fence: usize) -> Result<()>;

    /// Present `image_index`, waiting on the slot's "blit finished"
    fn present(&mut self, slot: usize, image_index: u32) -> Result<()>;

    /// Presentation timeline: re-signal the slot's "available" semaphore
    fn signal_available(&mut self, slot: usize) -> Result<()>;

    /// Block until the device is idle
    fn wait_idle(&mut self) -> Result<()>;
}
