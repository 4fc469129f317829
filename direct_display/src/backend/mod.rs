/// Backend module - the device seam and its GPU-free implementation

pub mod display_backend;
pub mod mock_backend;

pub use display_backend::*;
