/// Device, display, plane and swapchain parameter selection
///
/// Pure functions over the capabilities a backend reports. Every choice is
/// deterministic: the same reported capabilities always give the same result,
/// and ties go to the first element in enumeration order.

use crate::config::ModeSelection;
use crate::error::{Error, Result};
use crate::types::{
    AlphaMode, AlphaModes, DisplayId, DisplayMode, DisplayPlane, Extent2D, PhysicalDeviceInfo,
    PixelFormat, PresentMode, QueueFamilyInfo, SurfaceCapabilities, SurfaceFormat,
    SurfaceTransforms,
};
use crate::dd_trace;

const SOURCE: &str = "direct_display::selection";

// ============================================================================
// Extensions and physical device
// ============================================================================

/// Verify that every required extension is present in `available`
///
/// Returns `Error::MissingExtension` for the first one that is not.
pub fn check_extensions<S: AsRef<str>>(available: &[String], required: &[S]) -> Result<()> {
    for name in required {
        let name = name.as_ref();
        if !available.iter().any(|ext| ext == name) {
            return Err(Error::MissingExtension(name.to_string()));
        }
        dd_trace!(SOURCE, "OK: {}", name);
    }
    Ok(())
}

/// Index of the first device that drives at least one display and exposes
/// every required device extension
pub fn select_physical_device<S: AsRef<str>>(
    devices: &[PhysicalDeviceInfo],
    required: &[S],
) -> Result<usize> {
    devices
        .iter()
        .position(|device| {
            device.display_count > 0
                && required
                    .iter()
                    .all(|name| device.extensions.iter().any(|ext| ext == name.as_ref()))
        })
        .ok_or(Error::NoSuitableDevice)
}

// ============================================================================
// Display mode and plane
// ============================================================================

/// Score used to rank display modes
pub fn mode_score(mode: &DisplayMode, selection: ModeSelection) -> u64 {
    let area = mode.visible_region.area();
    match selection {
        ModeSelection::Resolution => area,
        ModeSelection::ResolutionAndRefresh => area + mode.refresh_rate as u64,
    }
}

/// Index of the highest scoring mode (first one on ties)
pub fn select_display_mode(modes: &[DisplayMode], selection: ModeSelection) -> Result<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, mode) in modes.iter().enumerate() {
        let score = mode_score(mode, selection);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index).ok_or(Error::NoDisplay)
}

/// Index of the first plane that can drive `display` and is not bound to
/// another display
///
/// `supported_displays[i]` is the list of displays plane `i` can drive.
pub fn select_display_plane(
    planes: &[DisplayPlane],
    supported_displays: &[Vec<DisplayId>],
    display: DisplayId,
) -> Result<u32> {
    planes
        .iter()
        .zip(supported_displays)
        .position(|(plane, supported)| {
            let free = match plane.current_display {
                Some(current) => current == display,
                None => true,
            };
            free && supported.contains(&display)
        })
        .map(|index| index as u32)
        .ok_or(Error::NoCompatiblePlane)
}

/// First supported alpha mode in priority order, opaque if none is reported
pub fn select_alpha_mode(supported: AlphaModes) -> AlphaMode {
    [
        AlphaMode::Opaque,
        AlphaMode::Global,
        AlphaMode::PerPixel,
        AlphaMode::PerPixelPremultiplied,
    ]
    .into_iter()
    .find(|mode| supported.contains(mode.flag()))
    .unwrap_or(AlphaMode::Opaque)
}

// ============================================================================
// Queue family
// ============================================================================

/// First queue family with both graphics and present support
pub fn select_queue_family(families: &[QueueFamilyInfo]) -> Result<u32> {
    families
        .iter()
        .find(|family| family.supports_graphics && family.supports_present)
        .map(|family| family.index)
        .ok_or(Error::NoSuitableQueueFamily)
}

// ============================================================================
// Swapchain parameters
// ============================================================================

/// `min_image_count + 1`, capped by `max_image_count` when the surface has one
pub fn swapchain_image_count(caps: &SurfaceCapabilities) -> u32 {
    let desired = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        desired.min(caps.max_image_count)
    } else {
        desired
    }
}

/// Preferred format when it is listed (or the surface accepts anything),
/// the first reported format otherwise
pub fn select_surface_format(
    formats: &[SurfaceFormat],
    preferred: SurfaceFormat,
) -> Result<SurfaceFormat> {
    let first = formats.first().copied().ok_or_else(|| {
        Error::InitializationFailed("Surface reports no formats".to_string())
    })?;

    if formats.len() == 1 && first.format == PixelFormat::UNDEFINED {
        return Ok(preferred);
    }

    if formats.contains(&preferred) {
        return Ok(preferred);
    }

    Ok(first)
}

/// Swapchain extent
///
/// The surface's current extent, unless it is the "undefined" sentinel, in
/// which case the mode extent clamped into the min/max image extent.
pub fn resolve_extent(caps: &SurfaceCapabilities, mode_extent: Extent2D) -> Extent2D {
    if !caps.current_extent.is_undefined() {
        return caps.current_extent;
    }

    Extent2D {
        width: mode_extent
            .width
            .max(caps.min_image_extent.width)
            .min(caps.max_image_extent.width),
        height: mode_extent
            .height
            .max(caps.min_image_extent.height)
            .min(caps.max_image_extent.height),
    }
}

pub fn resolve_transform(caps: &SurfaceCapabilities) -> SurfaceTransforms {
    if caps.supported_transforms.contains(SurfaceTransforms::IDENTITY) {
        SurfaceTransforms::IDENTITY
    } else {
        caps.current_transform
    }
}

/// Preferred present mode if available, FIFO otherwise (always supported)
pub fn select_present_mode(modes: &[PresentMode], preferred: PresentMode) -> PresentMode {
    if modes.contains(&preferred) {
        preferred
    } else {
        PresentMode::Fifo
    }
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod tests;
