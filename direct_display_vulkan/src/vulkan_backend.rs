/// VulkanDisplayBackend - DisplayBackend over Vulkan VK_KHR_display and GL interop
///
/// Objects are created stage by stage as `DirectDisplay::init` drives the
/// backend and are held in `Option`s until then. Destruction runs in reverse
/// creation order in `Drop`.

use ash::vk;
use direct_display::{
    AlphaModes, Config, DisplayBackend, DisplayId, DisplayMode, DisplayModeId, DisplayPlane,
    DisplayProperties, DisplaySurfaceDesc, Error, Extent2D, NativeTexture, PhysicalDeviceInfo,
    PresentMode, QueueFamilyInfo, Result, SurfaceCapabilities, SurfaceFormat, SwapchainDesc,
};
use direct_display::{dd_debug, dd_err, dd_error, dd_trace};
use std::ffi::c_void;

use crate::gl_interop::GlInterop;
use crate::interop_transport::{InteropTransport, SOURCE};
use crate::vulkan_convert::{display_from_id, names_to_strings};
use crate::vulkan_device::{base_device_extensions, queue_families, VulkanDevice};
use crate::vulkan_display;
use crate::vulkan_frame::{signal_semaphores, FrameSync};
use crate::vulkan_instance::{available_extensions, base_instance_extensions, load_entry, VulkanInstance};
use crate::vulkan_interop::InteropSlot;
use crate::vulkan_swapchain::{self, Swapchain};

pub struct VulkanDisplayBackend<T: InteropTransport> {
    entry: ash::Entry,
    gl: GlInterop,

    instance: Option<VulkanInstance>,
    physical_devices: Vec<vk::PhysicalDevice>,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,

    device: Option<VulkanDevice>,
    transport: Option<T>,
    swapchain: Option<Swapchain>,

    slots: Vec<InteropSlot>,
    frame: Option<FrameSync>,
}

impl<T: InteropTransport> VulkanDisplayBackend<T> {
    /// Load Vulkan and the GL entry points
    ///
    /// The GL context the textures will be used from must be current on the
    /// calling thread, here and for every later call.
    ///
    /// # Arguments
    ///
    /// * `gl_loader` - GL proc address lookup (e.g. the windowing library's `get_proc_address`)
    pub fn new<F>(mut gl_loader: F) -> Result<Self>
    where
        F: FnMut(&str) -> *const c_void,
    {
        gl::load_with(|name| gl_loader(name));
        let gl = GlInterop::load(&mut gl_loader)?;
        T::check_gl_support(&gl)?;

        let entry = load_entry()?;
        dd_debug!(SOURCE, "Vulkan loaded, GL interop through the {} transport", T::name());

        Ok(Self {
            entry,
            gl,
            instance: None,
            physical_devices: Vec::new(),
            physical_device: vk::PhysicalDevice::null(),
            surface: vk::SurfaceKHR::null(),
            device: None,
            transport: None,
            swapchain: None,
            slots: Vec::new(),
            frame: None,
        })
    }

    // ===== STATE ACCESS =====

    fn instance(&self) -> Result<&VulkanInstance> {
        self.instance.as_ref().ok_or_else(|| not_ready("instance"))
    }

    fn device(&self) -> Result<&VulkanDevice> {
        self.device.as_ref().ok_or_else(|| not_ready("device"))
    }

    fn transport(&self) -> Result<&T> {
        self.transport.as_ref().ok_or_else(|| not_ready("transport"))
    }

    fn swapchain(&self) -> Result<&Swapchain> {
        self.swapchain.as_ref().ok_or_else(|| not_ready("swapchain"))
    }

    fn frame(&self) -> Result<&FrameSync> {
        self.frame.as_ref().ok_or_else(|| not_ready("frame sync"))
    }

    fn surface(&self) -> Result<vk::SurfaceKHR> {
        if self.surface == vk::SurfaceKHR::null() {
            Err(not_ready("display surface"))
        } else {
            Ok(self.surface)
        }
    }

    fn slot(&self, slot: usize) -> Result<&InteropSlot> {
        self.slots
            .get(slot)
            .ok_or_else(|| dd_err!(SOURCE, "Slot {} out of range ({})", slot, self.slots.len()))
    }

    /// The shared texture of `slot`, if created
    pub fn texture(&self, slot: usize) -> Option<NativeTexture> {
        self.slots.get(slot).map(|s| s.texture)
    }
}

fn not_ready(what: &str) -> Error {
    dd_error!(SOURCE, "Vulkan {} used before creation", what);
    Error::InvalidState(format!("Vulkan {} used before creation", what))
}

impl<T: InteropTransport> DisplayBackend for VulkanDisplayBackend<T> {
    // ===== BOOTSTRAP =====

    fn required_instance_extensions(&self) -> Vec<String> {
        let mut names = base_instance_extensions();
        names.extend(T::instance_extensions());
        names_to_strings(&names)
    }

    fn required_device_extensions(&self) -> Vec<String> {
        let mut names = base_device_extensions();
        names.extend(T::device_extensions());
        names_to_strings(&names)
    }

    fn available_instance_extensions(&mut self) -> Result<Vec<String>> {
        available_extensions(&self.entry)
    }

    fn create_instance(&mut self, config: &Config) -> Result<()> {
        let mut extensions = base_instance_extensions();
        extensions.extend(T::instance_extensions());
        self.instance = Some(VulkanInstance::new(&self.entry, config, &extensions)?);
        Ok(())
    }

    fn enumerate_physical_devices(&mut self) -> Result<Vec<PhysicalDeviceInfo>> {
        let instance = self.instance()?;
        let physical_devices = instance.physical_devices()?;
        let infos = physical_devices
            .iter()
            .map(|&pd| instance.physical_device_info(pd))
            .collect::<Result<Vec<_>>>()?;
        for info in &infos {
            dd_trace!(SOURCE, "Physical device '{}': {} display(s), {} extensions",
                info.name, info.display_count, info.extensions.len());
        }
        self.physical_devices = physical_devices;
        Ok(infos)
    }

    fn select_physical_device(&mut self, index: usize) -> Result<()> {
        self.physical_device = *self.physical_devices.get(index).ok_or_else(|| {
            dd_error!(SOURCE, "Physical device index {} out of range", index);
            Error::NoSuitableDevice
        })?;
        Ok(())
    }

    // ===== DISPLAY SURFACE =====

    fn displays(&mut self) -> Result<Vec<DisplayProperties>> {
        vulkan_display::displays(&self.instance()?.display_loader, self.physical_device)
    }

    fn display_modes(&mut self, display: DisplayId) -> Result<Vec<DisplayMode>> {
        vulkan_display::display_modes(
            &self.instance()?.display_loader,
            self.physical_device,
            display_from_id(display),
        )
    }

    fn acquire_display(&mut self, display: DisplayId) -> Result<()> {
        let instance = self.instance()?;
        T::acquire_display(&self.entry, &instance.instance, self.physical_device, display_from_id(display))
    }

    fn display_planes(&mut self) -> Result<Vec<DisplayPlane>> {
        vulkan_display::display_planes(&self.instance()?.display_loader, self.physical_device)
    }

    fn plane_supported_displays(&mut self, plane_index: u32) -> Result<Vec<DisplayId>> {
        vulkan_display::plane_supported_displays(
            &self.instance()?.display_loader,
            self.physical_device,
            plane_index,
        )
    }

    fn plane_supported_alpha(&mut self, mode: DisplayModeId, plane_index: u32) -> Result<AlphaModes> {
        vulkan_display::plane_supported_alpha(
            &self.instance()?.display_loader,
            self.physical_device,
            mode,
            plane_index,
        )
    }

    fn create_display_surface(&mut self, desc: &DisplaySurfaceDesc) -> Result<()> {
        self.surface = vulkan_display::create_surface(&self.instance()?.display_loader, desc)?;
        Ok(())
    }

    // ===== LOGICAL DEVICE =====

    fn queue_families(&mut self) -> Result<Vec<QueueFamilyInfo>> {
        let instance = self.instance()?;
        queue_families(&instance.instance, &instance.surface_loader, self.physical_device, self.surface()?)
    }

    fn create_device(&mut self, queue_family: u32) -> Result<()> {
        let mut extensions = base_device_extensions();
        extensions.extend(T::device_extensions());

        let instance = self.instance()?;
        let device = VulkanDevice::new(&instance.instance, self.physical_device, queue_family, &extensions)?;
        let transport = T::new(&instance.instance, &device.device);

        self.device = Some(device);
        self.transport = Some(transport?);
        Ok(())
    }

    fn create_command_pool(&mut self) -> Result<()> {
        self.device
            .as_mut()
            .ok_or_else(|| not_ready("device"))?
            .create_command_pool()
    }

    // ===== SWAPCHAIN =====

    fn surface_capabilities(&mut self) -> Result<SurfaceCapabilities> {
        vulkan_swapchain::surface_capabilities(&self.instance()?.surface_loader, self.physical_device, self.surface()?)
    }

    fn surface_formats(&mut self) -> Result<Vec<SurfaceFormat>> {
        vulkan_swapchain::surface_formats(&self.instance()?.surface_loader, self.physical_device, self.surface()?)
    }

    fn present_modes(&mut self) -> Result<Vec<PresentMode>> {
        vulkan_swapchain::present_modes(&self.instance()?.surface_loader, self.physical_device, self.surface()?)
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<usize> {
        let swapchain = Swapchain::new(&self.instance()?.instance, &self.device()?.device, self.surface()?, desc)?;
        let count = swapchain.image_count();
        self.swapchain = Some(swapchain);
        Ok(count)
    }

    // ===== INTEROP POOL =====

    fn create_interop_slot(&mut self, slot: usize, extent: Extent2D) -> Result<NativeTexture> {
        if slot != self.slots.len() {
            dd_error!(SOURCE, "Interop slot {} created out of order (have {})", slot, self.slots.len());
            return Err(Error::InvalidState(format!("Interop slot {} created out of order", slot)));
        }
        let interop_slot = InteropSlot::new(self.device()?, self.transport()?, &self.gl, extent)?;
        let texture = interop_slot.texture;
        self.slots.push(interop_slot);
        Ok(texture)
    }

    fn create_frame_sync(&mut self, slot_count: usize, fence_count: usize) -> Result<()> {
        self.frame = Some(FrameSync::new(&self.device()?.device, slot_count, fence_count)?);
        Ok(())
    }

    fn record_blit_commands(&mut self, slot_count: usize) -> Result<usize> {
        let swapchain = self.swapchain()?;
        if self.slots.len() != slot_count || swapchain.image_count() != slot_count {
            dd_error!(SOURCE, "Cannot record blits: {} slots, {} swapchain images, expected {}",
                self.slots.len(), swapchain.image_count(), slot_count);
            return Err(Error::InitializationFailed(format!(
                "Slot count {} does not match swapchain image count {}",
                self.slots.len(), swapchain.image_count()
            )));
        }

        let pairs = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                swapchain
                    .image(i)
                    .map(|dst| (slot.image, dst))
                    .ok_or_else(|| not_ready("swapchain image"))
            })
            .collect::<Result<Vec<_>>>()?;
        let src_extent = self.slots.first().map(|s| s.extent).unwrap_or_default();
        let dst_extent = swapchain.extent();

        let device = self.device.as_ref().ok_or_else(|| not_ready("device"))?;
        let command_buffers = device.allocate_command_buffers(slot_count as u32)?;
        let frame = self.frame.as_mut().ok_or_else(|| not_ready("frame sync"))?;
        frame.record_blits(&device.device, command_buffers, &pairs, src_extent, dst_extent)
    }

    fn presignal_available(&mut self, slot_count: usize) -> Result<()> {
        let semaphores: Vec<vk::Semaphore> = self.slots.iter().take(slot_count).map(|s| s.available).collect();
        let device = self.device()?;
        signal_semaphores(&device.device, device.queue, &semaphores)
    }

    // ===== FRAME =====

    fn wait_available(&mut self, slot: usize) -> Result<()> {
        let slot = self.slot(slot)?;
        self.gl.wait(slot.gl_available, slot.texture)
    }

    fn wait_frame_fence(&mut self, fence: usize) -> Result<()> {
        self.frame()?.wait_fence(&self.device()?.device, fence)
    }

    fn reset_frame_fence(&mut self, fence: usize) -> Result<()> {
        self.frame()?.reset_fence(&self.device()?.device, fence)
    }

    fn signal_finished(&mut self, slot: usize) -> Result<()> {
        let slot = self.slot(slot)?;
        self.gl.signal(slot.gl_finished, slot.texture)
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<u32> {
        let semaphore = *self
            .frame()?
            .image_acquired
            .get(slot)
            .ok_or_else(|| dd_err!(SOURCE, "Slot {} has no acquire semaphore", slot))?;
        self.swapchain()?.acquire_next_image(semaphore)
    }

    fn submit_blit(&mut self, slot: usize, fence: usize) -> Result<()> {
        let finished = self.slot(slot)?.finished;
        let device = self.device()?;
        self.frame()?.submit_blit(&device.device, device.queue, slot, finished, fence)
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<()> {
        let wait = *self
            .frame()?
            .blit_finished
            .get(slot)
            .ok_or_else(|| dd_err!(SOURCE, "Slot {} has no blit semaphore", slot))?;
        self.swapchain()?.present(self.device()?.queue, image_index, wait)
    }

    fn signal_available(&mut self, slot: usize) -> Result<()> {
        let available = self.slot(slot)?.available;
        let device = self.device()?;
        signal_semaphores(&device.device, device.queue, &[available])
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe {
            self.device()?
                .device
                .device_wait_idle()
                .map_err(|e| dd_err!(SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }
}

impl<T: InteropTransport> Drop for VulkanDisplayBackend<T> {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            if let Some(device) = &self.device {
                device.device.device_wait_idle().ok();
            }

            // 1. Interop slots: GL objects, then shared handles, then Vulkan objects
            if let (Some(device), Some(transport)) = (&self.device, &self.transport) {
                for slot in &mut self.slots {
                    slot.destroy(&device.device, transport, &self.gl);
                }
            }
            self.slots.clear();

            // 2. Semaphores, fences and blit command buffers
            if let (Some(device), Some(frame)) = (&self.device, &mut self.frame) {
                frame.destroy(&device.device, device.command_pool);
            }
            self.frame = None;

            // 3. Swapchain
            if let Some(swapchain) = &mut self.swapchain {
                swapchain.destroy();
            }
            self.swapchain = None;

            // 4. Export loaders, command pool and device
            self.transport = None;
            if let Some(device) = &mut self.device {
                device.destroy();
            }
            self.device = None;

            // 5. Display surface, debug messenger and instance
            if let Some(instance) = &mut self.instance {
                if self.surface != vk::SurfaceKHR::null() {
                    instance.surface_loader.destroy_surface(self.surface, None);
                    self.surface = vk::SurfaceKHR::null();
                }
                instance.destroy();
            }
            self.instance = None;
        }
    }
}
