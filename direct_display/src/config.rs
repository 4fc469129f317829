/// Direct display configuration

use crate::types::{PresentMode, SurfaceFormat};

/// How the display mode is chosen among the modes of the selected output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSelection {
    /// Maximise `width * height`
    Resolution,
    /// Maximise `width * height + refresh_rate` (refresh in millihertz)
    ResolutionAndRefresh,
}

/// Configuration for `DirectDisplay::init`
#[derive(Debug, Clone)]
pub struct Config {
    /// Index of the display output on the selected GPU
    pub display_index: usize,
    /// Display mode scoring
    pub mode_selection: ModeSelection,
    /// Swapchain format used when the surface lists it (or accepts any format)
    pub preferred_format: SurfaceFormat,
    /// Present mode used when available, FIFO otherwise
    pub preferred_present_mode: PresentMode,
    /// Cap on frames in flight; `None` keeps one fence per slot.
    /// Clamped into `1..=slot_count`.
    pub max_frames_in_flight: Option<usize>,
    /// Enable validation layers (needs the backend's validation support)
    pub enable_validation: bool,
    /// Application name reported to the driver
    pub app_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_index: 0,
            mode_selection: ModeSelection::ResolutionAndRefresh,
            preferred_format: SurfaceFormat::default(),
            preferred_present_mode: PresentMode::Mailbox,
            max_frames_in_flight: None,
            enable_validation: cfg!(debug_assertions),
            app_name: "Direct Display Application".to_string(),
        }
    }
}

impl Config {
    /// Number of fences to create for `slot_count` slots
    pub fn fence_count(&self, slot_count: usize) -> usize {
        match self.max_frames_in_flight {
            Some(cap) => cap.clamp(1, slot_count.max(1)),
            None => slot_count,
        }
    }
}
