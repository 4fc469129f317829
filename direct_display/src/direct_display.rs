/// DirectDisplay - presents externally rendered textures on a direct display
///
/// `init` runs the staged setup against a `DisplayBackend`:
///
/// 1. Instance (extension check)
/// 2. Physical device
/// 3. Display surface (display, mode, plane, alpha mode)
/// 4. Logical device and queue
/// 5. Command pool
/// 6. Swapchain
/// 7. Interop resources (one shared texture + semaphore pair per image)
/// 8. Synchronization objects
/// 9. Blit command buffers
///
/// After that the caller alternates `get_texture` / `submit_texture` once per
/// frame. The frame cursor is the only mutable scheduling state and advances
/// once per presented frame.

use crate::backend::DisplayBackend;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame_sync::{FrameCursor, SlotState, SyncSlot};
use crate::selection;
use crate::types::{
    AlphaMode, DisplayId, DisplayMode, DisplayProperties, DisplaySurfaceDesc, NativeTexture,
    SurfaceTransforms, SwapchainDesc,
};
use crate::{dd_debug, dd_error, dd_info, dd_warn};

const SOURCE: &str = "direct_display::core";

/// Direct display presenter over a backend `B`
pub struct DirectDisplay<B: DisplayBackend> {
    backend: B,
    config: Config,

    display: DisplayProperties,
    mode: DisplayMode,
    plane_index: u32,
    alpha_mode: AlphaMode,
    queue_family: u32,
    swapchain: SwapchainDesc,

    /// Fixed arena, one slot per swapchain image
    slots: Vec<SyncSlot>,
    fence_count: usize,
    cursor: FrameCursor,
    frame_count: u64,
    shut_down: bool,
}

/// State accumulated while the display surface is built
struct SurfaceSelection {
    display: DisplayProperties,
    mode: DisplayMode,
    plane_index: u32,
    alpha_mode: AlphaMode,
}

impl<B: DisplayBackend> DirectDisplay<B> {
    /// Build the whole presentation pipeline on `backend`
    ///
    /// Must be called with the rendering API context current on the calling
    /// thread. Any stage failure aborts the whole sequence; the partially
    /// initialized backend is dropped. The returned error always satisfies
    /// `Error::is_fatal_init`: backend errors raised by a stage are reported
    /// as `Error::InitializationFailed`.
    pub fn init(backend: B, config: Config) -> Result<Self> {
        match Self::build(backend, config) {
            Ok(display) => Ok(display),
            Err(e) => {
                dd_error!(SOURCE, "Direct display initialization failed: {}", e);
                if e.is_fatal_init() {
                    Err(e)
                } else {
                    Err(Error::InitializationFailed(e.to_string()))
                }
            }
        }
    }

    fn build(mut backend: B, config: Config) -> Result<Self> {
        dd_debug!(SOURCE, "Stage 1/9: instance");
        Self::create_instance(&mut backend, &config)?;

        dd_debug!(SOURCE, "Stage 2/9: physical device");
        Self::pick_physical_device(&mut backend)?;

        dd_debug!(SOURCE, "Stage 3/9: display surface");
        let surface = Self::create_surface(&mut backend, &config)?;

        dd_debug!(SOURCE, "Stage 4/9: logical device");
        let queue_family = selection::select_queue_family(&backend.queue_families()?)?;
        backend.create_device(queue_family)?;
        dd_debug!(SOURCE, "Using queue family {}", queue_family);

        dd_debug!(SOURCE, "Stage 5/9: command pool");
        backend.create_command_pool()?;

        dd_debug!(SOURCE, "Stage 6/9: swapchain");
        let (swapchain, image_count) = Self::create_swapchain(&mut backend, &config, &surface)?;

        dd_debug!(SOURCE, "Stage 7/9: interop resources");
        let mut slots = Vec::with_capacity(image_count);
        for slot in 0..image_count {
            let texture = backend.create_interop_slot(slot, swapchain.extent)?;
            slots.push(SyncSlot::new(texture));
        }

        dd_debug!(SOURCE, "Stage 8/9: synchronization objects");
        let fence_count = config.fence_count(image_count);
        backend.create_frame_sync(image_count, fence_count)?;

        dd_debug!(SOURCE, "Stage 9/9: command buffers");
        let recorded = backend.record_blit_commands(image_count)?;
        if recorded != image_count {
            return Err(Error::InitializationFailed(format!(
                "Recorded {} blit command buffers for {} swapchain images",
                recorded, image_count
            )));
        }
        backend.presignal_available(image_count)?;

        dd_info!(
            SOURCE,
            "Direct display ready: {} x {}, {} slots, {} frames in flight",
            swapchain.extent.width,
            swapchain.extent.height,
            image_count,
            fence_count
        );

        Ok(Self {
            backend,
            config,
            display: surface.display,
            mode: surface.mode,
            plane_index: surface.plane_index,
            alpha_mode: surface.alpha_mode,
            queue_family,
            swapchain,
            slots,
            fence_count,
            cursor: FrameCursor::new(image_count),
            frame_count: 0,
            shut_down: false,
        })
    }

    fn create_instance(backend: &mut B, config: &Config) -> Result<()> {
        let available = backend.available_instance_extensions()?;
        selection::check_extensions(&available, &backend.required_instance_extensions())?;
        backend.create_instance(config)
    }

    fn pick_physical_device(backend: &mut B) -> Result<()> {
        let devices = backend.enumerate_physical_devices()?;
        let index =
            selection::select_physical_device(&devices, &backend.required_device_extensions())?;
        dd_info!(SOURCE, "Using GPU: {}", devices[index].name);
        backend.select_physical_device(index)
    }

    fn create_surface(backend: &mut B, config: &Config) -> Result<SurfaceSelection> {
        let display = backend
            .displays()?
            .get(config.display_index)
            .cloned()
            .ok_or(Error::NoDisplay)?;
        dd_info!(
            SOURCE,
            "Using display: {}, physical resolution {} x {}",
            display.name,
            display.physical_resolution.width,
            display.physical_resolution.height
        );

        backend.acquire_display(display.id)?;

        let modes = backend.display_modes(display.id)?;
        let mode = modes[selection::select_display_mode(&modes, config.mode_selection)?];
        dd_info!(
            SOURCE,
            "Display mode: {} x {} @ {}Hz",
            mode.visible_region.width,
            mode.visible_region.height,
            mode.refresh_rate_hz()
        );

        let planes = backend.display_planes()?;
        let supported = (0..planes.len() as u32)
            .map(|index| backend.plane_supported_displays(index))
            .collect::<Result<Vec<Vec<DisplayId>>>>()?;
        let plane_index = selection::select_display_plane(&planes, &supported, display.id)?;
        let alpha_mode =
            selection::select_alpha_mode(backend.plane_supported_alpha(mode.id, plane_index)?);
        dd_debug!(SOURCE, "Using display plane {} with {:?} alpha", plane_index, alpha_mode);

        backend.create_display_surface(&DisplaySurfaceDesc {
            display: display.id,
            mode: mode.id,
            plane_index,
            plane_stack_index: planes[plane_index as usize].current_stack_index,
            transform: SurfaceTransforms::IDENTITY,
            global_alpha: 1.0,
            alpha_mode,
            image_extent: mode.visible_region,
        })?;

        Ok(SurfaceSelection { display, mode, plane_index, alpha_mode })
    }

    fn create_swapchain(
        backend: &mut B,
        config: &Config,
        surface: &SurfaceSelection,
    ) -> Result<(SwapchainDesc, usize)> {
        let caps = backend.surface_capabilities()?;
        let formats = backend.surface_formats()?;
        let present_modes = backend.present_modes()?;

        let desc = SwapchainDesc {
            image_count: selection::swapchain_image_count(&caps),
            format: selection::select_surface_format(&formats, config.preferred_format)?,
            extent: selection::resolve_extent(&caps, surface.mode.visible_region),
            transform: selection::resolve_transform(&caps),
            present_mode: selection::select_present_mode(
                &present_modes,
                config.preferred_present_mode,
            ),
        };
        dd_debug!(
            SOURCE,
            "Swapchain: {} images, {:?}, {:?}",
            desc.image_count,
            desc.format.format,
            desc.present_mode
        );

        let image_count = backend.create_swapchain(&desc)?;
        if image_count == 0 {
            return Err(Error::InitializationFailed(
                "Swapchain has no images".to_string(),
            ));
        }
        Ok((desc, image_count))
    }

    // ===== FRAME API =====

    /// Texture to render the current frame into
    ///
    /// Queues a wait on the slot's "available" signal in the rendering API,
    /// so commands issued after this call never overwrite a texture that is
    /// still being blitted.
    pub fn get_texture(&mut self) -> Result<NativeTexture> {
        self.ensure_running()?;
        let slot = self.cursor.index();
        self.expect_state(slot, SlotState::Available)?;

        self.backend.wait_available(slot)?;
        self.slots[slot].transition(SlotState::Available, SlotState::Rendering)?;
        Ok(self.slots[slot].texture)
    }

    /// Hand the texture returned by `get_texture` to the display
    ///
    /// Must be called exactly once per `get_texture`, after every rendering
    /// command for the texture has been issued.
    pub fn submit_texture(&mut self) -> Result<()> {
        self.ensure_running()?;
        let slot = self.cursor.index();
        self.expect_state(slot, SlotState::Rendering)?;
        let fence = (self.frame_count % self.fence_count as u64) as usize;

        self.backend.wait_frame_fence(fence)?;

        self.backend.signal_finished(slot)?;
        self.slots[slot].transition(SlotState::Rendering, SlotState::BlitPending)?;

        let image_index = self.backend.acquire_next_image(slot)?;
        if image_index as usize != slot {
            let err = Error::ImageIndexMismatch {
                expected: slot as u32,
                acquired: image_index,
            };
            dd_error!(SOURCE, "{}", err);
            return Err(err);
        }

        self.backend.reset_frame_fence(fence)?;
        self.backend.submit_blit(slot, fence)?;
        self.slots[slot].transition(SlotState::BlitPending, SlotState::Presenting)?;

        self.backend.present(slot, image_index)?;

        self.backend.signal_available(slot)?;
        self.slots[slot].transition(SlotState::Presenting, SlotState::Available)?;

        self.cursor.advance();
        self.frame_count += 1;
        Ok(())
    }

    /// Wait for the device to go idle
    ///
    /// Must precede teardown of anything the rendering API still references.
    /// Calling it more than once is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.backend.wait_idle()?;
        self.shut_down = true;
        dd_info!(SOURCE, "Direct display shut down after {} frames", self.frame_count);
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down {
            return Err(Error::InvalidState("direct display is shut down".to_string()));
        }
        Ok(())
    }

    fn expect_state(&self, slot: usize, expected: SlotState) -> Result<()> {
        let state = self.slots[slot].state;
        if state != expected {
            return Err(Error::InvalidState(format!(
                "slot {} is {:?}, expected {:?}",
                slot, state, expected
            )));
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    /// Width of the interop textures
    pub fn width(&self) -> u32 {
        self.swapchain.extent.width
    }

    /// Height of the interop textures
    pub fn height(&self) -> u32 {
        self.swapchain.extent.height
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn current_slot(&self) -> usize {
        self.cursor.index()
    }

    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.slots.get(slot).map(|s| s.state)
    }

    /// Number of frames presented so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fence_count(&self) -> usize {
        self.fence_count
    }

    pub fn display(&self) -> &DisplayProperties {
        &self.display
    }

    pub fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    pub fn plane_index(&self) -> u32 {
        self.plane_index
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub fn swapchain(&self) -> &SwapchainDesc {
        &self.swapchain
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: DisplayBackend> Drop for DirectDisplay<B> {
    fn drop(&mut self) {
        if !self.shut_down {
            if let Err(e) = self.backend.wait_idle() {
                dd_warn!(SOURCE, "wait_idle failed during drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
#[path = "direct_display_tests.rs"]
mod tests;
