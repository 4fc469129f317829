/// VK_KHR_display queries and display plane surface creation

use ash::vk;
use direct_display::{
    AlphaModes, DisplayMode, DisplayModeId, DisplayPlane, DisplayProperties, DisplaySurfaceDesc,
    Error, Result,
};
use direct_display::{dd_debug, dd_error};

use crate::interop_transport::SOURCE;
use crate::vulkan_convert::{
    alpha_mode_to_vk, alpha_modes_from_vk, display_from_id, display_id, display_mode_from_id,
    display_mode_id, extent_from_vk, extent_to_vk, name_from_ptr, optional_display_id,
    transforms_to_vk,
};

pub fn displays(
    loader: &ash::khr::display::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<Vec<DisplayProperties>> {
    unsafe {
        let properties = loader
            .get_physical_device_display_properties(physical_device)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to get display properties: {:?}", e);
                Error::InitializationFailed(format!("Failed to get display properties: {:?}", e))
            })?;

        Ok(properties
            .iter()
            .map(|p| DisplayProperties {
                id: display_id(p.display),
                name: name_from_ptr(p.display_name, "Unknown display"),
                physical_resolution: extent_from_vk(p.physical_resolution),
            })
            .collect())
    }
}

pub fn display_modes(
    loader: &ash::khr::display::Instance,
    physical_device: vk::PhysicalDevice,
    display: vk::DisplayKHR,
) -> Result<Vec<DisplayMode>> {
    unsafe {
        let modes = loader
            .get_display_mode_properties(physical_device, display)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to get display mode properties: {:?}", e);
                Error::InitializationFailed(format!("Failed to get display mode properties: {:?}", e))
            })?;

        Ok(modes
            .iter()
            .map(|m| DisplayMode {
                id: display_mode_id(m.display_mode),
                visible_region: extent_from_vk(m.parameters.visible_region),
                refresh_rate: m.parameters.refresh_rate,
            })
            .collect())
    }
}

pub fn display_planes(
    loader: &ash::khr::display::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<Vec<DisplayPlane>> {
    unsafe {
        let planes = loader
            .get_physical_device_display_plane_properties(physical_device)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to get display plane properties: {:?}", e);
                Error::InitializationFailed(format!("Failed to get display plane properties: {:?}", e))
            })?;

        Ok(planes
            .iter()
            .map(|p| DisplayPlane {
                current_display: optional_display_id(p.current_display),
                current_stack_index: p.current_stack_index,
            })
            .collect())
    }
}

pub fn plane_supported_displays(
    loader: &ash::khr::display::Instance,
    physical_device: vk::PhysicalDevice,
    plane_index: u32,
) -> Result<Vec<direct_display::DisplayId>> {
    unsafe {
        let displays = loader
            .get_display_plane_supported_displays(physical_device, plane_index)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to get supported displays for plane {}: {:?}", plane_index, e);
                Error::InitializationFailed(format!("Failed to get plane supported displays: {:?}", e))
            })?;

        Ok(displays.into_iter().map(display_id).collect())
    }
}

pub fn plane_supported_alpha(
    loader: &ash::khr::display::Instance,
    physical_device: vk::PhysicalDevice,
    mode: DisplayModeId,
    plane_index: u32,
) -> Result<AlphaModes> {
    unsafe {
        let capabilities = loader
            .get_display_plane_capabilities(physical_device, display_mode_from_id(mode), plane_index)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to get capabilities of plane {}: {:?}", plane_index, e);
                Error::InitializationFailed(format!("Failed to get display plane capabilities: {:?}", e))
            })?;

        Ok(alpha_modes_from_vk(capabilities.supported_alpha))
    }
}

/// Create a surface that scans out `desc.mode` on `desc.plane_index`
pub fn create_surface(
    loader: &ash::khr::display::Instance,
    desc: &DisplaySurfaceDesc,
) -> Result<vk::SurfaceKHR> {
    let create_info = vk::DisplaySurfaceCreateInfoKHR::default()
        .display_mode(display_mode_from_id(desc.mode))
        .plane_index(desc.plane_index)
        .plane_stack_index(desc.plane_stack_index)
        .transform(transforms_to_vk(desc.transform))
        .global_alpha(desc.global_alpha)
        .alpha_mode(alpha_mode_to_vk(desc.alpha_mode))
        .image_extent(extent_to_vk(desc.image_extent));

    unsafe {
        let surface = loader
            .create_display_plane_surface(&create_info, None)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to create display plane surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create display surface: {:?}", e))
            })?;

        dd_debug!(SOURCE, "Display surface created on plane {} (display {:?})",
            desc.plane_index, display_from_id(desc.display));

        Ok(surface)
    }
}
