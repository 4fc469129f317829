/// InteropSlot - one shared texture and its semaphore pair
///
/// The image and its memory are created by Vulkan with export enabled, the
/// memory handle is imported into GL as a memory object backing an RGBA8
/// texture. Two exported semaphores order the two APIs on this slot:
///
/// - `available`: signalled by Vulkan once the blit that read the image is
///   done, waited by GL before rendering into it
/// - `finished`: signalled by GL after rendering, waited by the blit

use ash::vk;
use direct_display::{Error, Extent2D, NativeTexture, Result};
use direct_display::{dd_debug, dd_error};
use gl::types::GLuint;

use crate::gl_interop::GlInterop;
use crate::interop_transport::{InteropTransport, SharedHandle, SOURCE};
use crate::vulkan_device::{find_memory_type, VulkanDevice};
use crate::vulkan_frame::record_initial_transition;

/// Vulkan format matching GL_RGBA8
pub const INTEROP_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

#[derive(Debug, Default)]
pub struct InteropSlot {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub allocation_size: u64,
    pub extent: vk::Extent2D,
    pub available: vk::Semaphore,
    pub finished: vk::Semaphore,
    /// Exported handles still owned by this slot
    handles: Vec<SharedHandle>,
    pub gl_memory_object: GLuint,
    pub texture: NativeTexture,
    pub gl_available: GLuint,
    pub gl_finished: GLuint,
}

impl InteropSlot {
    /// Build the slot for `extent`
    ///
    /// On failure every object created so far is released.
    pub fn new<T: InteropTransport>(
        device: &VulkanDevice,
        transport: &T,
        gl: &GlInterop,
        extent: Extent2D,
    ) -> Result<Self> {
        let mut slot = Self::default();
        if let Err(e) = slot.build(device, transport, gl, extent) {
            unsafe { slot.destroy(&device.device, transport, gl) };
            return Err(e);
        }
        Ok(slot)
    }

    fn build<T: InteropTransport>(
        &mut self,
        device: &VulkanDevice,
        transport: &T,
        gl: &GlInterop,
        extent: Extent2D,
    ) -> Result<()> {
        self.extent = vk::Extent2D {
            width: extent.width,
            height: extent.height,
        };
        self.create_image::<T>(device)?;

        let image = self.image;
        device.submit_one_time(|device, cb| record_initial_transition(device, cb, image))?;

        // Memory
        let memory_handle = transport.export_memory_handle(self.memory)?;
        self.handles.push(memory_handle);
        let imported = transport.import_texture_from_handle(gl, memory_handle, self.allocation_size, extent)?;
        self.gl_memory_object = imported.memory_object;
        self.texture = imported.texture;

        // Semaphores
        self.available = create_exportable_semaphore::<T>(&device.device)?;
        self.finished = create_exportable_semaphore::<T>(&device.device)?;

        let available_handle = transport.export_semaphore_handle(self.available)?;
        self.handles.push(available_handle);
        self.gl_available = transport.import_semaphore_from_handle(gl, available_handle)?;

        let finished_handle = transport.export_semaphore_handle(self.finished)?;
        self.handles.push(finished_handle);
        self.gl_finished = transport.import_semaphore_from_handle(gl, finished_handle)?;

        dd_debug!(SOURCE, "Interop slot ready: texture {}, {} bytes ({} transport)",
            self.texture, self.allocation_size, T::name());
        Ok(())
    }

    fn create_image<T: InteropTransport>(&mut self, device: &VulkanDevice) -> Result<()> {
        let mut external_info = vk::ExternalMemoryImageCreateInfo::default()
            .handle_types(T::memory_handle_type());

        let image_info = vk::ImageCreateInfo::default()
            .push_next(&mut external_info)
            .image_type(vk::ImageType::TYPE_2D)
            .format(INTEROP_FORMAT)
            .extent(vk::Extent3D {
                width: self.extent.width,
                height: self.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            self.image = device.device.create_image(&image_info, None).map_err(|e| {
                dd_error!(SOURCE, "Failed to create interop image: {:?}", e);
                Error::InteropFailed(format!("Failed to create interop image: {:?}", e))
            })?;

            let requirements = device.device.get_image_memory_requirements(self.image);
            let memory_type_index = find_memory_type(
                &device.memory_properties,
                requirements.memory_type_bits,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            )?;

            let mut export_info = vk::ExportMemoryAllocateInfo::default()
                .handle_types(T::memory_handle_type());
            let allocate_info = vk::MemoryAllocateInfo::default()
                .push_next(&mut export_info)
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index);

            self.memory = device.device.allocate_memory(&allocate_info, None).map_err(|e| {
                dd_error!(SOURCE, "Failed to allocate interop memory: {:?}", e);
                Error::InteropFailed(format!("Failed to allocate interop memory: {:?}", e))
            })?;
            self.allocation_size = requirements.size;

            device.device.bind_image_memory(self.image, self.memory, 0).map_err(|e| {
                dd_error!(SOURCE, "Failed to bind interop memory: {:?}", e);
                Error::InteropFailed(format!("Failed to bind interop memory: {:?}", e))
            })?;
        }
        Ok(())
    }

    /// Release GL objects, then handles, then Vulkan objects
    ///
    /// # Safety
    ///
    /// Neither API may still be using the slot. The GL context must be current.
    pub unsafe fn destroy<T: InteropTransport>(&mut self, device: &ash::Device, transport: &T, gl: &GlInterop) {
        if self.gl_finished != 0 {
            gl.delete_semaphore(self.gl_finished);
            self.gl_finished = 0;
        }
        if self.gl_available != 0 {
            gl.delete_semaphore(self.gl_available);
            self.gl_available = 0;
        }
        if self.texture != 0 {
            gl.delete_texture(self.texture);
            self.texture = 0;
        }
        if self.gl_memory_object != 0 {
            gl.delete_memory_object(self.gl_memory_object);
            self.gl_memory_object = 0;
        }

        for handle in self.handles.drain(..) {
            transport.release_handle(handle);
        }

        if self.finished != vk::Semaphore::null() {
            device.destroy_semaphore(self.finished, None);
            self.finished = vk::Semaphore::null();
        }
        if self.available != vk::Semaphore::null() {
            device.destroy_semaphore(self.available, None);
            self.available = vk::Semaphore::null();
        }
        if self.image != vk::Image::null() {
            device.destroy_image(self.image, None);
            self.image = vk::Image::null();
        }
        if self.memory != vk::DeviceMemory::null() {
            device.free_memory(self.memory, None);
            self.memory = vk::DeviceMemory::null();
        }
    }
}

fn create_exportable_semaphore<T: InteropTransport>(device: &ash::Device) -> Result<vk::Semaphore> {
    let mut export_info = vk::ExportSemaphoreCreateInfo::default()
        .handle_types(T::semaphore_handle_type());
    let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut export_info);

    unsafe {
        device.create_semaphore(&create_info, None).map_err(|e| {
            dd_error!(SOURCE, "Failed to create exportable semaphore: {:?}", e);
            Error::InteropFailed(format!("Failed to create exportable semaphore: {:?}", e))
        })
    }
}
