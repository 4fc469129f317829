/// Mock display backend (no GPU required)
///
/// Reports a configurable device/display topology, records every call and
/// simulates the binary semaphores and fences of the frame protocol so that
/// ordering mistakes surface as errors instead of deadlocks.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{
    AlphaModes, ColorSpace, DisplayId, DisplayMode, DisplayModeId, DisplayPlane,
    DisplayProperties, DisplaySurfaceDesc, Extent2D, NativeTexture, PhysicalDeviceInfo,
    PixelFormat, PresentMode, QueueFamilyInfo, SurfaceCapabilities, SurfaceFormat,
    SurfaceTransforms, SwapchainDesc,
};
use crate::backend::DisplayBackend;

pub const MOCK_INSTANCE_EXTENSIONS: [&str; 2] = ["VK_KHR_surface", "VK_KHR_display"];
pub const MOCK_DEVICE_EXTENSIONS: [&str; 2] = ["VK_KHR_swapchain", "VK_KHR_external_memory"];

/// Simulated fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFence {
    Signaled,
    Unsignaled,
    /// Submitted work not yet observed by the host
    Pending,
}

// ============================================================================
// Mock Backend
// ============================================================================

#[derive(Debug)]
pub struct MockBackend {
    // ----- reported topology -----
    pub instance_extensions: Vec<String>,
    pub devices: Vec<PhysicalDeviceInfo>,
    pub displays: Vec<DisplayProperties>,
    pub modes: Vec<DisplayMode>,
    pub planes: Vec<DisplayPlane>,
    /// Displays each plane can drive, indexed like `planes`
    pub plane_displays: Vec<Vec<DisplayId>>,
    pub alpha_modes: AlphaModes,
    pub queue_families: Vec<QueueFamilyInfo>,
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,

    // ----- failure injection -----
    /// Name of a backend method that fails with `BackendError`
    pub fail_at: Option<&'static str>,
    /// Image index returned by every acquire instead of the round-robin one
    pub acquire_override: Option<u32>,

    // ----- recorded state -----
    pub calls: Vec<String>,
    pub selected_device: Option<usize>,
    pub acquired_display: Option<DisplayId>,
    pub surface: Option<DisplaySurfaceDesc>,
    pub device_queue_family: Option<u32>,
    pub swapchain: Option<SwapchainDesc>,
    pub textures: Vec<NativeTexture>,
    pub command_buffers: usize,
    pub presented: Vec<u32>,
    pub idle_waits: usize,

    // ----- simulated synchronization -----
    pub available: Vec<bool>,
    pub finished: Vec<bool>,
    pub image_acquired: Vec<bool>,
    pub blit_finished: Vec<bool>,
    pub fences: Vec<MockFence>,
    /// Submitted frames whose fence the host has not waited on yet
    pub in_flight: usize,
    pub max_in_flight: usize,
    next_image: u32,
}

impl MockBackend {
    /// One GPU driving one 1920x1080 display with an 800x600@60 and a
    /// 1920x1080@30 mode, one free plane and a surface allowing 2..=3 images
    pub fn new() -> Self {
        let display = DisplayId(0x10);
        Self {
            instance_extensions: MOCK_INSTANCE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            devices: vec![PhysicalDeviceInfo {
                name: "Mock GPU".to_string(),
                display_count: 1,
                extensions: MOCK_DEVICE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            }],
            displays: vec![DisplayProperties {
                id: display,
                name: "Mock Display".to_string(),
                physical_resolution: Extent2D::new(1920, 1080),
            }],
            modes: vec![
                DisplayMode {
                    id: DisplayModeId(1),
                    visible_region: Extent2D::new(800, 600),
                    refresh_rate: 60_000,
                },
                DisplayMode {
                    id: DisplayModeId(2),
                    visible_region: Extent2D::new(1920, 1080),
                    refresh_rate: 30_000,
                },
            ],
            planes: vec![DisplayPlane { current_display: None, current_stack_index: 0 }],
            plane_displays: vec![vec![display]],
            alpha_modes: AlphaModes::OPAQUE | AlphaModes::GLOBAL,
            queue_families: vec![QueueFamilyInfo {
                index: 0,
                supports_graphics: true,
                supports_present: true,
            }],
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: Extent2D::new(Extent2D::UNDEFINED, Extent2D::UNDEFINED),
                min_image_extent: Extent2D::new(1, 1),
                max_image_extent: Extent2D::new(4096, 4096),
                supported_transforms: SurfaceTransforms::IDENTITY,
                current_transform: SurfaceTransforms::IDENTITY,
            },
            formats: vec![SurfaceFormat {
                format: PixelFormat::B8G8R8A8_UNORM,
                color_space: ColorSpace::SRGB_NONLINEAR,
            }],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            fail_at: None,
            acquire_override: None,
            calls: Vec::new(),
            selected_device: None,
            acquired_display: None,
            surface: None,
            device_queue_family: None,
            swapchain: None,
            textures: Vec::new(),
            command_buffers: 0,
            presented: Vec::new(),
            idle_waits: 0,
            available: Vec::new(),
            finished: Vec::new(),
            image_acquired: Vec::new(),
            blit_finished: Vec::new(),
            fences: Vec::new(),
            in_flight: 0,
            max_in_flight: 0,
            next_image: 0,
        }
    }

    /// Surface capabilities yielding exactly `count` swapchain images
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.capabilities.min_image_count = count.saturating_sub(1);
        self.capabilities.max_image_count = count;
        self
    }

    pub fn failing_at(mut self, method: &'static str) -> Self {
        self.fail_at = Some(method);
        self
    }

    /// Number of recorded calls to `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == method).count()
    }

    fn record(&mut self, method: &'static str) -> Result<()> {
        self.calls.push(method.to_string());
        if self.fail_at == Some(method) {
            return Err(Error::BackendError(format!("mock failure in {}", method)));
        }
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.textures.len()
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.slot_count() {
            return Err(Error::BackendError(format!(
                "slot {} out of range ({} slots)",
                slot,
                self.slot_count()
            )));
        }
        Ok(())
    }

    fn signal(semaphores: &mut [bool], slot: usize, name: &str) -> Result<()> {
        if semaphores[slot] {
            return Err(Error::BackendError(format!(
                "{} semaphore of slot {} signalled twice",
                name, slot
            )));
        }
        semaphores[slot] = true;
        Ok(())
    }

    fn consume(semaphores: &mut [bool], slot: usize, name: &str) -> Result<()> {
        if !semaphores[slot] {
            return Err(Error::BackendError(format!(
                "wait on unsignalled {} semaphore of slot {} would deadlock",
                name, slot
            )));
        }
        semaphores[slot] = false;
        Ok(())
    }

    fn complete_pending(&mut self) {
        for fence in self.fences.iter_mut() {
            if *fence == MockFence::Pending {
                *fence = MockFence::Signaled;
                self.in_flight -= 1;
            }
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for MockBackend {
    fn required_instance_extensions(&self) -> Vec<String> {
        MOCK_INSTANCE_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    fn required_device_extensions(&self) -> Vec<String> {
        MOCK_DEVICE_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    fn available_instance_extensions(&mut self) -> Result<Vec<String>> {
        self.record("available_instance_extensions")?;
        Ok(self.instance_extensions.clone())
    }

    fn create_instance(&mut self, _config: &Config) -> Result<()> {
        self.record("create_instance")
    }

    fn enumerate_physical_devices(&mut self) -> Result<Vec<PhysicalDeviceInfo>> {
        self.record("enumerate_physical_devices")?;
        Ok(self.devices.clone())
    }

    fn select_physical_device(&mut self, index: usize) -> Result<()> {
        self.record("select_physical_device")?;
        self.selected_device = Some(index);
        Ok(())
    }

    fn displays(&mut self) -> Result<Vec<DisplayProperties>> {
        self.record("displays")?;
        Ok(self.displays.clone())
    }

    fn display_modes(&mut self, display: DisplayId) -> Result<Vec<DisplayMode>> {
        self.record("display_modes")?;
        if !self.displays.iter().any(|d| d.id == display) {
            return Err(Error::BackendError(format!("unknown display {:?}", display)));
        }
        Ok(self.modes.clone())
    }

    fn acquire_display(&mut self, display: DisplayId) -> Result<()> {
        self.record("acquire_display")?;
        self.acquired_display = Some(display);
        Ok(())
    }

    fn display_planes(&mut self) -> Result<Vec<DisplayPlane>> {
        self.record("display_planes")?;
        Ok(self.planes.clone())
    }

    fn plane_supported_displays(&mut self, plane_index: u32) -> Result<Vec<DisplayId>> {
        self.record("plane_supported_displays")?;
        Ok(self
            .plane_displays
            .get(plane_index as usize)
            .cloned()
            .unwrap_or_default())
    }

    fn plane_supported_alpha(
        &mut self,
        _mode: DisplayModeId,
        _plane_index: u32,
    ) -> Result<AlphaModes> {
        self.record("plane_supported_alpha")?;
        Ok(self.alpha_modes)
    }

    fn create_display_surface(&mut self, desc: &DisplaySurfaceDesc) -> Result<()> {
        self.record("create_display_surface")?;
        self.surface = Some(*desc);
        Ok(())
    }

    fn queue_families(&mut self) -> Result<Vec<QueueFamilyInfo>> {
        self.record("queue_families")?;
        Ok(self.queue_families.clone())
    }

    fn create_device(&mut self, queue_family: u32) -> Result<()> {
        self.record("create_device")?;
        self.device_queue_family = Some(queue_family);
        Ok(())
    }

    fn create_command_pool(&mut self) -> Result<()> {
        self.record("create_command_pool")
    }

    fn surface_capabilities(&mut self) -> Result<SurfaceCapabilities> {
        self.record("surface_capabilities")?;
        Ok(self.capabilities)
    }

    fn surface_formats(&mut self) -> Result<Vec<SurfaceFormat>> {
        self.record("surface_formats")?;
        Ok(self.formats.clone())
    }

    fn present_modes(&mut self) -> Result<Vec<PresentMode>> {
        self.record("present_modes")?;
        Ok(self.present_modes.clone())
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<usize> {
        self.record("create_swapchain")?;
        self.swapchain = Some(*desc);
        Ok(desc.image_count as usize)
    }

    fn create_interop_slot(&mut self, slot: usize, _extent: Extent2D) -> Result<NativeTexture> {
        self.record("create_interop_slot")?;
        if slot != self.textures.len() {
            return Err(Error::BackendError(format!("interop slot {} created out of order", slot)));
        }
        let texture = slot as NativeTexture + 1;
        self.textures.push(texture);
        self.available.push(false);
        self.finished.push(false);
        Ok(texture)
    }

    fn create_frame_sync(&mut self, slot_count: usize, fence_count: usize) -> Result<()> {
        self.record("create_frame_sync")?;
        self.image_acquired = vec![false; slot_count];
        self.blit_finished = vec![false; slot_count];
        self.fences = vec![MockFence::Signaled; fence_count];
        Ok(())
    }

    fn record_blit_commands(&mut self, slot_count: usize) -> Result<usize> {
        self.record("record_blit_commands")?;
        self.command_buffers = slot_count;
        Ok(slot_count)
    }

    fn presignal_available(&mut self, slot_count: usize) -> Result<()> {
        self.record("presignal_available")?;
        for slot in 0..slot_count {
            Self::signal(&mut self.available, slot, "available")?;
        }
        Ok(())
    }

    fn wait_available(&mut self, slot: usize) -> Result<()> {
        self.record("wait_available")?;
        self.check_slot(slot)?;
        Self::consume(&mut self.available, slot, "available")
    }

    fn wait_frame_fence(&mut self, fence: usize) -> Result<()> {
        self.record("wait_frame_fence")?;
        let state = *self
            .fences
            .get(fence)
            .ok_or_else(|| Error::BackendError(format!("fence {} out of range", fence)))?;
        match state {
            MockFence::Unsignaled => {
                return Err(Error::BackendError(format!(
                    "wait on unsubmitted fence {} would deadlock",
                    fence
                )));
            }
            MockFence::Pending => self.in_flight -= 1,
            MockFence::Signaled => {}
        }
        self.fences[fence] = MockFence::Signaled;
        Ok(())
    }

    fn reset_frame_fence(&mut self, fence: usize) -> Result<()> {
        self.record("reset_frame_fence")?;
        match self.fences.get(fence) {
            Some(MockFence::Signaled) => {
                self.fences[fence] = MockFence::Unsignaled;
                Ok(())
            }
            Some(state) => Err(Error::BackendError(format!(
                "reset of fence {} in state {:?}",
                fence, state
            ))),
            None => Err(Error::BackendError(format!("fence {} out of range", fence))),
        }
    }

    fn signal_finished(&mut self, slot: usize) -> Result<()> {
        self.record("signal_finished")?;
        self.check_slot(slot)?;
        Self::signal(&mut self.finished, slot, "finished")
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<u32> {
        self.record("acquire_next_image")?;
        self.check_slot(slot)?;
        Self::signal(&mut self.image_acquired, slot, "image acquired")?;
        let image = self.next_image;
        self.next_image = (self.next_image + 1) % self.slot_count() as u32;
        Ok(self.acquire_override.unwrap_or(image))
    }

    fn submit_blit(&mut self, slot: usize, fence: usize) -> Result<()> {
        self.record("submit_blit")?;
        self.check_slot(slot)?;
        if self.fences.get(fence) != Some(&MockFence::Unsignaled) {
            return Err(Error::BackendError(format!(
                "fence {} must be unsignalled at submit",
                fence
            )));
        }
        Self::consume(&mut self.finished, slot, "finished")?;
        Self::consume(&mut self.image_acquired, slot, "image acquired")?;
        Self::signal(&mut self.blit_finished, slot, "blit finished")?;
        self.fences[fence] = MockFence::Pending;
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<()> {
        self.record("present")?;
        self.check_slot(slot)?;
        Self::consume(&mut self.blit_finished, slot, "blit finished")?;
        self.presented.push(image_index);
        Ok(())
    }

    fn signal_available(&mut self, slot: usize) -> Result<()> {
        self.record("signal_available")?;
        self.check_slot(slot)?;
        Self::signal(&mut self.available, slot, "available")
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.record("wait_idle")?;
        self.complete_pending();
        self.idle_waits += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_backend_tests.rs"]
mod tests;
