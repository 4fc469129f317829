/// Host-side frame scheduling state
///
/// The GPU-side ordering between the renderer and the presentation queue
/// lives entirely in semaphores and fences owned by the backend. This module
/// only tracks which slot is current and what the caller is allowed to do
/// with it.

use crate::error::{Error, Result};
use crate::types::NativeTexture;

/// Lifecycle of one slot within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Free for the renderer (its "available" signal is pending or done)
    Available,
    /// Handed out by `get_texture`, the renderer is drawing into it
    Rendering,
    /// Renderer signalled "finished", blit not yet submitted
    BlitPending,
    /// Blit submitted and queued for present
    Presenting,
}

/// One interop slot as seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSlot {
    /// Texture imported into the rendering API
    pub texture: NativeTexture,
    pub state: SlotState,
}

impl SyncSlot {
    pub fn new(texture: NativeTexture) -> Self {
        Self {
            texture,
            state: SlotState::Available,
        }
    }

    /// Move to `to`, failing if the slot is not in `from`
    pub fn transition(&mut self, from: SlotState, to: SlotState) -> Result<()> {
        if self.state != from {
            return Err(Error::InvalidState(format!(
                "slot is {:?}, expected {:?}",
                self.state, from
            )));
        }
        self.state = to;
        Ok(())
    }
}

/// Cyclic index over a fixed number of slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    index: usize,
    count: usize,
}

impl FrameCursor {
    /// `count` is clamped to at least 1
    pub fn new(count: usize) -> Self {
        Self {
            index: 0,
            count: count.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Step to the next slot, wrapping at `count`
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + 1) % self.count;
        self.index
    }
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;
