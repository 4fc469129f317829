/// Plain-data description of displays, planes, surfaces and swapchains
///
/// These mirror what a presentation backend reports, without tying the
/// selection logic to a specific graphics API. Backends convert to and from
/// their native structures.

use bitflags::bitflags;

/// Native texture handle in the rendering API (a GL texture name)
pub type NativeTexture = u32;

/// Opaque handle of a physical display output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayId(pub u64);

/// Opaque handle of a display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayModeId(pub u64);

/// Two-dimensional size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    /// Value of `current_extent.width` meaning "the surface size is set by the swapchain"
    pub const UNDEFINED: u32 = 0xFFFF_FFFF;

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_undefined(&self) -> bool {
        self.width == Self::UNDEFINED
    }
}

/// Physical device candidate as seen during bootstrap
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    /// Number of display outputs the device drives directly
    pub display_count: usize,
    /// Device extension names
    pub extensions: Vec<String>,
}

/// A physical display output
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayProperties {
    pub id: DisplayId,
    pub name: String,
    pub physical_resolution: Extent2D,
}

/// One mode reported for a display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMode {
    pub id: DisplayModeId,
    pub visible_region: Extent2D,
    /// Refresh rate in millihertz
    pub refresh_rate: u32,
}

impl DisplayMode {
    pub fn refresh_rate_hz(&self) -> f32 {
        self.refresh_rate as f32 / 1000.0
    }
}

/// A display plane as reported by the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPlane {
    /// Display this plane is currently bound to, if any
    pub current_display: Option<DisplayId>,
    pub current_stack_index: u32,
}

bitflags! {
    /// Alpha composition modes a plane supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AlphaModes: u32 {
        const OPAQUE = 0x1;
        const GLOBAL = 0x2;
        const PER_PIXEL = 0x4;
        const PER_PIXEL_PREMULTIPLIED = 0x8;
    }
}

/// A single alpha composition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Global,
    PerPixel,
    PerPixelPremultiplied,
}

impl AlphaMode {
    pub fn flag(self) -> AlphaModes {
        match self {
            AlphaMode::Opaque => AlphaModes::OPAQUE,
            AlphaMode::Global => AlphaModes::GLOBAL,
            AlphaMode::PerPixel => AlphaModes::PER_PIXEL,
            AlphaMode::PerPixelPremultiplied => AlphaModes::PER_PIXEL_PREMULTIPLIED,
        }
    }
}

bitflags! {
    /// Surface pre-transforms
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SurfaceTransforms: u32 {
        const IDENTITY = 0x1;
        const ROTATE_90 = 0x2;
        const ROTATE_180 = 0x4;
        const ROTATE_270 = 0x8;
        const HORIZONTAL_MIRROR = 0x10;
        const HORIZONTAL_MIRROR_ROTATE_90 = 0x20;
        const HORIZONTAL_MIRROR_ROTATE_180 = 0x40;
        const HORIZONTAL_MIRROR_ROTATE_270 = 0x80;
        const INHERIT = 0x100;
    }
}

/// Everything needed to build a surface bound directly to a display output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySurfaceDesc {
    pub display: DisplayId,
    pub mode: DisplayModeId,
    pub plane_index: u32,
    pub plane_stack_index: u32,
    pub transform: SurfaceTransforms,
    pub global_alpha: f32,
    pub alpha_mode: AlphaMode,
    pub image_extent: Extent2D,
}

/// Queue family capabilities relevant to presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub supports_graphics: bool,
    /// Presentation support for the created display surface
    pub supports_present: bool,
}

/// Pixel formats the selection logic cares about
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Wildcard: when it is the only reported format, any format may be used
    UNDEFINED,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    A2B10G10R10_UNORM,
    /// Any other backend format, by raw value
    Other(i32),
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    SRGB_NONLINEAR,
    Other(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub format: PixelFormat,
    pub color_space: ColorSpace,
}

impl Default for SurfaceFormat {
    fn default() -> Self {
        Self {
            format: PixelFormat::B8G8R8A8_UNORM,
            color_space: ColorSpace::SRGB_NONLINEAR,
        }
    }
}

/// Surface capabilities used to size the swapchain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper limit
    pub max_image_count: u32,
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
    pub supported_transforms: SurfaceTransforms,
    pub current_transform: SurfaceTransforms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    Fifo,
    FifoRelaxed,
}

/// Resolved swapchain parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapchainDesc {
    pub image_count: u32,
    pub format: SurfaceFormat,
    pub extent: Extent2D,
    pub transform: SurfaceTransforms,
    pub present_mode: PresentMode,
}
