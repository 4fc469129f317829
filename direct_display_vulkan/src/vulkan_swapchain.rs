/// Swapchain - presentable images on the display plane surface

use ash::vk;
use direct_display::{
    Error, PresentMode, Result, SurfaceCapabilities, SurfaceFormat, SwapchainDesc,
};
use direct_display::{dd_debug, dd_err, dd_error};

use crate::interop_transport::SOURCE;
use crate::vulkan_convert::{
    capabilities_from_vk, color_space_to_vk, extent_to_vk, format_to_vk, present_mode_from_vk,
    present_mode_to_vk, surface_format_from_vk, transforms_to_vk,
};

pub fn surface_capabilities(
    loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceCapabilities> {
    unsafe {
        let capabilities = loader
            .get_physical_device_surface_capabilities(physical_device, surface)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to get surface capabilities: {:?}", e);
                Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
            })?;
        Ok(capabilities_from_vk(&capabilities))
    }
}

pub fn surface_formats(
    loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<Vec<SurfaceFormat>> {
    unsafe {
        let formats = loader
            .get_physical_device_surface_formats(physical_device, surface)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to query surface formats: {:?}", e);
                Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
            })?;
        Ok(formats.iter().map(surface_format_from_vk).collect())
    }
}

/// Present modes the surface supports, skipping ones direct_display has no name for
pub fn present_modes(
    loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<Vec<PresentMode>> {
    unsafe {
        let modes = loader
            .get_physical_device_surface_present_modes(physical_device, surface)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to query present modes: {:?}", e);
                Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
            })?;
        Ok(modes.into_iter().filter_map(present_mode_from_vk).collect())
    }
}

/// Vulkan swapchain on a display surface
///
/// Images are only ever written by transfer (the blit), so no image views
/// are created.
pub struct Swapchain {
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    images: Vec<vk::Image>,
    extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        instance: &ash::Instance,
        device: &ash::Device,
        surface: vk::SurfaceKHR,
        desc: &SwapchainDesc,
    ) -> Result<Self> {
        let extent = extent_to_vk(desc.extent);
        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(desc.image_count)
            .image_format(format_to_vk(desc.format.format))
            .image_color_space(color_space_to_vk(desc.format.color_space))
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(transforms_to_vk(desc.transform))
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true);

        unsafe {
            let swapchain_loader = ash::khr::swapchain::Device::new(instance, device);
            let swapchain = swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    dd_error!(SOURCE, "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            let images = match swapchain_loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    swapchain_loader.destroy_swapchain(swapchain, None);
                    dd_error!(SOURCE, "Failed to get swapchain images: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e)));
                }
            };

            dd_debug!(SOURCE, "Swapchain created: {} images, {} x {}, {:?}",
                images.len(), extent.width, extent.height, desc.present_mode);

            Ok(Self {
                swapchain,
                swapchain_loader,
                images,
                extent,
            })
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, index: usize) -> Option<vk::Image> {
        self.images.get(index).copied()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Acquire the next image, signalling `semaphore` when it is ready
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<u32> {
        unsafe {
            let (image_index, _is_suboptimal) = self
                .swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
                .map_err(|e| {
                    if e == vk::Result::ERROR_OUT_OF_DATE_KHR {
                        dd_err!(SOURCE, "Swapchain out of date during acquire")
                    } else {
                        dd_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e)
                    }
                })?;

            Ok(image_index)
        }
    }

    /// Queue `image_index` for presentation once `wait_semaphore` is signalled
    pub fn present(&self, queue: vk::Queue, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<()> {
        unsafe {
            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let wait_semaphores = [wait_semaphore];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match self.swapchain_loader.queue_present(queue, &present_info) {
                Ok(_) | Err(vk::Result::SUBOPTIMAL_KHR) => Ok(()),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    Err(dd_err!(SOURCE, "Swapchain out of date during present"))
                }
                Err(e) => Err(dd_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    /// # Safety
    ///
    /// The device must be idle with respect to this swapchain.
    pub unsafe fn destroy(&mut self) {
        self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        self.swapchain = vk::SwapchainKHR::null();
        self.images.clear();
    }
}
