/// VulkanDevice - logical device, its queue and command pool

use ash::vk;
use direct_display::{Error, QueueFamilyInfo, Result};
use direct_display::{dd_debug, dd_error};
use std::ffi::CStr;

use crate::interop_transport::SOURCE;

/// Device extensions every transport needs
pub fn base_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,
        ash::khr::external_memory::NAME,
        ash::khr::external_semaphore::NAME,
    ]
}

/// Queue families of `physical_device`, present support checked against `surface`
pub fn queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<Vec<QueueFamilyInfo>> {
    unsafe {
        let families = instance.get_physical_device_queue_family_properties(physical_device);
        families
            .iter()
            .enumerate()
            .map(|(index, family)| {
                let index = index as u32;
                let supports_present = surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to query present support of queue family {}: {:?}", index, e);
                        Error::InitializationFailed(format!("Failed to query present support: {:?}", e))
                    })?;
                Ok(QueueFamilyInfo {
                    index,
                    supports_graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                    supports_present,
                })
            })
            .collect()
    }
}

/// Index of the first memory type allowed by `type_bits` that has all of `flags`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Result<u32> {
    memory_properties.memory_types[..memory_properties.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(flags)
        })
        .map(|(index, _)| index as u32)
        .ok_or_else(|| {
            dd_error!(SOURCE, "No memory type matches bits 0x{:X} with {:?}", type_bits, flags);
            Error::NoSuitableMemoryType
        })
}

pub struct VulkanDevice {
    pub device: ash::Device,
    pub queue: vk::Queue,
    pub queue_family: u32,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub command_pool: Option<vk::CommandPool>,
}

impl VulkanDevice {
    /// Create the logical device with one queue from `queue_family`
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        extensions: &[&CStr],
    ) -> Result<Self> {
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family)
            .queue_priorities(&queue_priorities)];

        let extension_names: Vec<*const std::os::raw::c_char> =
            extensions.iter().map(|name| name.as_ptr()).collect();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names);

        unsafe {
            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    dd_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let queue = device.get_device_queue(queue_family, 0);
            let memory_properties = instance.get_physical_device_memory_properties(physical_device);

            dd_debug!(SOURCE, "Logical device created on queue family {}", queue_family);

            Ok(Self {
                device,
                queue,
                queue_family,
                memory_properties,
                command_pool: None,
            })
        }
    }

    pub fn create_command_pool(&mut self) -> Result<()> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(self.queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        unsafe {
            let pool = self.device.create_command_pool(&create_info, None).map_err(|e| {
                dd_error!(SOURCE, "Failed to create command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;
            self.command_pool = Some(pool);
        }
        Ok(())
    }

    pub fn command_pool(&self) -> Result<vk::CommandPool> {
        self.command_pool.ok_or_else(|| {
            dd_error!(SOURCE, "Command pool used before creation");
            Error::InvalidState("Command pool used before creation".to_string())
        })
    }

    pub fn allocate_command_buffers(&self, count: u32) -> Result<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool()?)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device.allocate_command_buffers(&allocate_info).map_err(|e| {
                dd_error!(SOURCE, "Failed to allocate command buffers: {:?}", e);
                Error::InitializationFailed(format!("Failed to allocate command buffers: {:?}", e))
            })
        }
    }

    /// Record with `record`, submit and block until the queue is idle
    pub fn submit_one_time<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let pool = self.command_pool()?;
        let command_buffer = self.allocate_command_buffers(1)?[0];

        let result = unsafe { self.record_and_wait(command_buffer, record) };

        unsafe {
            self.device.free_command_buffers(pool, &[command_buffer]);
        }
        result
    }

    unsafe fn record_and_wait<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to begin one-time command buffer: {:?}", e);
                Error::InitializationFailed(format!("Failed to begin command buffer: {:?}", e))
            })?;

        record(&self.device, command_buffer);

        self.device.end_command_buffer(command_buffer).map_err(|e| {
            dd_error!(SOURCE, "Failed to end one-time command buffer: {:?}", e);
            Error::InitializationFailed(format!("Failed to end command buffer: {:?}", e))
        })?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        self.device
            .queue_submit(self.queue, &[submit_info], vk::Fence::null())
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to submit one-time command buffer: {:?}", e);
                Error::InitializationFailed(format!("Failed to submit command buffer: {:?}", e))
            })?;
        self.device.queue_wait_idle(self.queue).map_err(|e| {
            dd_error!(SOURCE, "Failed to wait for queue idle: {:?}", e);
            Error::InitializationFailed(format!("Failed to wait for queue idle: {:?}", e))
        })
    }

    /// Destroy the command pool and the device
    ///
    /// # Safety
    ///
    /// Every object created from this device must already be destroyed.
    pub unsafe fn destroy(&mut self) {
        if let Some(pool) = self.command_pool.take() {
            self.device.destroy_command_pool(pool, None);
        }
        self.device.destroy_device(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (index, &property_flags) in flags.iter().enumerate() {
            properties.memory_types[index] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn test_find_memory_type_first_match() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        let index = find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert_eq!(index, Ok(1));
    }

    #[test]
    fn test_find_memory_type_respects_type_bits() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        let index = find_memory_type(&properties, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert_eq!(index, Ok(1));
    }

    #[test]
    fn test_find_memory_type_none() {
        let properties = memory_properties(&[vk::MemoryPropertyFlags::HOST_VISIBLE]);
        let index = find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert_eq!(index, Err(Error::NoSuitableMemoryType));
    }

    #[test]
    fn test_base_device_extensions() {
        let names: Vec<_> = base_device_extensions()
            .iter()
            .map(|n| n.to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["VK_KHR_swapchain", "VK_KHR_external_memory", "VK_KHR_external_semaphore"]);
    }
}
