/*!
# Direct Display

Presents textures rendered by one graphics API on a display output driven
directly by the GPU, without a window system in between.

The rendering side (an OpenGL context) draws into textures whose memory is
owned by the presentation side (Vulkan `VK_KHR_display`). Memory and
semaphores cross between the two APIs as shared OS handles; each frame the
texture is blitted onto a swapchain image and presented.

## Architecture

- **DisplayBackend**: device seam, implemented by the Vulkan backend crate
  and by `backend::mock_backend::MockBackend` for GPU-free tests
- **selection**: pure device/display/plane/swapchain selection rules
- **DirectDisplay**: staged init plus the `get_texture` / `submit_texture`
  frame protocol
- **log**: replaceable global logger with `dd_*` macros

```no_run
use direct_display::{Config, DirectDisplay};
use direct_display::backend::mock_backend::MockBackend;

let mut display = DirectDisplay::init(MockBackend::new(), Config::default())?;
for _ in 0..3 {
    let texture = display.get_texture()?;
    // render into `texture` ...
    let _ = texture;
    display.submit_texture()?;
}
display.shutdown()?;
# Ok::<(), direct_display::Error>(())
```
*/

mod error;
mod direct_display;
pub mod log;
pub mod config;
pub mod types;
pub mod selection;
pub mod frame_sync;
pub mod backend;

pub use crate::error::{Error, Result};
pub use crate::config::{Config, ModeSelection};
pub use crate::direct_display::DirectDisplay;
pub use crate::backend::DisplayBackend;
pub use crate::frame_sync::SlotState;
pub use crate::types::*;
