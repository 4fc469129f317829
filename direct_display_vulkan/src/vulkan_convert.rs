/// Conversions between direct_display types and Vulkan types

use ash::vk;
use ash::vk::Handle;
use direct_display::{
    AlphaMode, AlphaModes, ColorSpace, DisplayId, DisplayModeId, Extent2D, PixelFormat,
    PresentMode, SurfaceCapabilities, SurfaceFormat, SurfaceTransforms,
};
use std::ffi::CStr;
use std::os::raw::c_char;

pub fn format_to_vk(format: PixelFormat) -> vk::Format {
    match format {
        PixelFormat::UNDEFINED => vk::Format::UNDEFINED,
        PixelFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        PixelFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        PixelFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        PixelFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        PixelFormat::A2B10G10R10_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
        PixelFormat::Other(raw) => vk::Format::from_raw(raw),
    }
}

pub fn format_from_vk(format: vk::Format) -> PixelFormat {
    match format {
        vk::Format::UNDEFINED => PixelFormat::UNDEFINED,
        vk::Format::B8G8R8A8_UNORM => PixelFormat::B8G8R8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => PixelFormat::B8G8R8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => PixelFormat::R8G8B8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => PixelFormat::R8G8B8A8_SRGB,
        vk::Format::A2B10G10R10_UNORM_PACK32 => PixelFormat::A2B10G10R10_UNORM,
        other => PixelFormat::Other(other.as_raw()),
    }
}

pub fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SRGB_NONLINEAR => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
    }
}

pub fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => ColorSpace::SRGB_NONLINEAR,
        other => ColorSpace::Other(other.as_raw()),
    }
}

pub fn surface_format_from_vk(format: &vk::SurfaceFormatKHR) -> SurfaceFormat {
    SurfaceFormat {
        format: format_from_vk(format.format),
        color_space: color_space_from_vk(format.color_space),
    }
}

pub fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

/// `None` for present modes with no direct_display counterpart
pub fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

pub fn alpha_mode_to_vk(mode: AlphaMode) -> vk::DisplayPlaneAlphaFlagsKHR {
    match mode {
        AlphaMode::Opaque => vk::DisplayPlaneAlphaFlagsKHR::OPAQUE,
        AlphaMode::Global => vk::DisplayPlaneAlphaFlagsKHR::GLOBAL,
        AlphaMode::PerPixel => vk::DisplayPlaneAlphaFlagsKHR::PER_PIXEL,
        AlphaMode::PerPixelPremultiplied => vk::DisplayPlaneAlphaFlagsKHR::PER_PIXEL_PREMULTIPLIED,
    }
}

pub fn alpha_modes_from_vk(flags: vk::DisplayPlaneAlphaFlagsKHR) -> AlphaModes {
    AlphaModes::from_bits_truncate(flags.as_raw())
}

// Bit values are shared with VkSurfaceTransformFlagBitsKHR
pub fn transforms_to_vk(transforms: SurfaceTransforms) -> vk::SurfaceTransformFlagsKHR {
    vk::SurfaceTransformFlagsKHR::from_raw(transforms.bits())
}

pub fn transforms_from_vk(flags: vk::SurfaceTransformFlagsKHR) -> SurfaceTransforms {
    SurfaceTransforms::from_bits_truncate(flags.as_raw())
}

pub fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

pub fn capabilities_from_vk(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent: extent_from_vk(caps.current_extent),
        min_image_extent: extent_from_vk(caps.min_image_extent),
        max_image_extent: extent_from_vk(caps.max_image_extent),
        supported_transforms: transforms_from_vk(caps.supported_transforms),
        current_transform: transforms_from_vk(caps.current_transform),
    }
}

// ===== HANDLES =====

pub fn display_id(display: vk::DisplayKHR) -> DisplayId {
    DisplayId(display.as_raw())
}

pub fn display_from_id(id: DisplayId) -> vk::DisplayKHR {
    vk::DisplayKHR::from_raw(id.0)
}

pub fn display_mode_id(mode: vk::DisplayModeKHR) -> DisplayModeId {
    DisplayModeId(mode.as_raw())
}

pub fn display_mode_from_id(id: DisplayModeId) -> vk::DisplayModeKHR {
    vk::DisplayModeKHR::from_raw(id.0)
}

/// `None` when the plane is not bound to any display
pub fn optional_display_id(display: vk::DisplayKHR) -> Option<DisplayId> {
    if display == vk::DisplayKHR::null() {
        None
    } else {
        Some(display_id(display))
    }
}

// ===== STRINGS =====

/// Owned copy of a NUL-terminated fixed-size Vulkan name array
pub fn name_from_array(name: &[c_char]) -> String {
    let bytes: Vec<u8> = name
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Owned copy of a possibly null C string pointer
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn name_from_ptr(ptr: *const c_char, fallback: &str) -> String {
    if ptr.is_null() {
        fallback.to_string()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

pub fn names_to_strings(names: &[&CStr]) -> Vec<String> {
    names.iter().map(|n| n.to_string_lossy().into_owned()).collect()
}

#[cfg(test)]
#[path = "vulkan_convert_tests.rs"]
mod tests;
