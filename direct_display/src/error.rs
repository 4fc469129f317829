//! Error types for direct display presentation
//!
//! Every initialization failure (missing extension, no qualifying device,
//! no display, no plane, no queue family, no memory type) maps to one of the
//! variants below and aborts `DirectDisplay::init` as a whole.

use std::fmt;

/// Result type for direct display operations
pub type Result<T> = std::result::Result<T, Error>;

/// Direct display errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A stage of the init sequence failed (generic)
    InitializationFailed(String),

    /// A required instance or device extension is not exposed
    MissingExtension(String),

    /// No physical device exposes a display output and the required extensions
    NoSuitableDevice,

    /// The selected device reports no display (or not at the requested index)
    NoDisplay,

    /// No display plane can drive the selected display
    NoCompatiblePlane,

    /// No queue family supports both graphics and presentation to the surface
    NoSuitableQueueFamily,

    /// No memory type satisfies the interop texture requirements
    NoSuitableMemoryType,

    /// Export or import of a shared handle failed
    InteropFailed(String),

    /// The getTexture/submitTexture contract was violated by the caller
    InvalidState(String),

    /// The presentation engine handed out an image other than the current slot
    ImageIndexMismatch { expected: u32, acquired: u32 },

    /// Backend-specific error (Vulkan, OpenGL)
    BackendError(String),
}

impl Error {
    /// Whether this error belongs to the init-time fatal category
    pub fn is_fatal_init(&self) -> bool {
        !matches!(
            self,
            Error::InvalidState(_) | Error::ImageIndexMismatch { .. } | Error::BackendError(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::MissingExtension(name) => write!(f, "Required extension not found: {}", name),
            Error::NoSuitableDevice => {
                write!(f, "Could not find a GPU with suitable display device")
            }
            Error::NoDisplay => write!(f, "No display available on the selected GPU"),
            Error::NoCompatiblePlane => write!(f, "Could not find a compatible display plane"),
            Error::NoSuitableQueueFamily => write!(f, "Failed to find suitable queue family"),
            Error::NoSuitableMemoryType => write!(f, "Failed to find suitable memory type"),
            Error::InteropFailed(msg) => write!(f, "Interop failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::ImageIndexMismatch { expected, acquired } => write!(
                f,
                "Acquired swapchain image {} does not match frame slot {}",
                acquired, expected
            ),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
