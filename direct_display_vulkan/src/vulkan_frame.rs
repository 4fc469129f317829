/// Frame synchronization and the pre-recorded blit command buffers
///
/// Each slot owns an "image acquired" and a "blit finished" semaphore and
/// one command buffer that copies the slot's interop image to the swapchain
/// image with the same index. Fences bound the number of blits in flight.

use ash::vk;
use direct_display::{Error, Result};
use direct_display::{dd_debug, dd_err, dd_error};

use crate::interop_transport::SOURCE;

pub(crate) fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn color_subresource_layers() -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Blit regions copying `src` onto `dst` upside down
///
/// GL textures have their origin at the bottom-left, swapchain images at the
/// top-left.
pub fn flipped_blit_region(src: vk::Extent2D, dst: vk::Extent2D) -> vk::ImageBlit {
    vk::ImageBlit {
        src_subresource: color_subresource_layers(),
        src_offsets: [
            vk::Offset3D { x: 0, y: 0, z: 0 },
            vk::Offset3D {
                x: src.width as i32,
                y: src.height as i32,
                z: 1,
            },
        ],
        dst_subresource: color_subresource_layers(),
        dst_offsets: [
            vk::Offset3D {
                x: 0,
                y: dst.height as i32,
                z: 0,
            },
            vk::Offset3D {
                x: dst.width as i32,
                y: 0,
                z: 1,
            },
        ],
    }
}

fn layout_barrier(
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access_mask: vk::AccessFlags,
    dst_access_mask: vk::AccessFlags,
) -> vk::ImageMemoryBarrier<'static> {
    vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .src_access_mask(src_access_mask)
        .dst_access_mask(dst_access_mask)
}

/// Move a freshly created interop image into the layout GL renders in
pub fn record_initial_transition(device: &ash::Device, cb: vk::CommandBuffer, image: vk::Image) {
    let barrier = layout_barrier(
        image,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        vk::AccessFlags::empty(),
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
    );
    unsafe {
        device.cmd_pipeline_barrier(
            cb,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::DependencyFlags::empty(),
            &[], &[], &[barrier],
        );
    }
}

/// Blit `src` (interop image) onto `dst` (swapchain image)
///
/// `src` is left in COLOR_ATTACHMENT_OPTIMAL for the next GL frame, `dst`
/// ends in PRESENT_SRC_KHR.
pub fn record_flipped_blit(
    device: &ash::Device,
    cb: vk::CommandBuffer,
    src: vk::Image,
    src_extent: vk::Extent2D,
    dst: vk::Image,
    dst_extent: vk::Extent2D,
) {
    // Both waits of the blit submit happen at TRANSFER
    let to_transfer = [
        layout_barrier(
            src,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_READ,
        ),
        layout_barrier(
            dst,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
        ),
    ];

    let after_blit = [
        layout_barrier(
            src,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::AccessFlags::TRANSFER_READ,
            vk::AccessFlags::empty(),
        ),
        layout_barrier(
            dst,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::empty(),
        ),
    ];

    unsafe {
        device.cmd_pipeline_barrier(
            cb,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[], &[], &to_transfer,
        );

        device.cmd_blit_image(
            cb,
            src,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[flipped_blit_region(src_extent, dst_extent)],
            vk::Filter::NEAREST,
        );

        device.cmd_pipeline_barrier(
            cb,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            vk::DependencyFlags::empty(),
            &[], &[], &after_blit,
        );
    }
}

/// Submit a batch with no commands that only signals `semaphores`
pub fn signal_semaphores(device: &ash::Device, queue: vk::Queue, semaphores: &[vk::Semaphore]) -> Result<()> {
    let submit_info = vk::SubmitInfo::default().signal_semaphores(semaphores);
    unsafe {
        device
            .queue_submit(queue, &[submit_info], vk::Fence::null())
            .map_err(|e| dd_err!(SOURCE, "Failed to submit semaphore signal: {:?}", e))
    }
}

pub struct FrameSync {
    pub image_acquired: Vec<vk::Semaphore>,
    pub blit_finished: Vec<vk::Semaphore>,
    pub fences: Vec<vk::Fence>,
    pub command_buffers: Vec<vk::CommandBuffer>,
}

impl FrameSync {
    /// Create `slot_count` semaphore pairs and `fence_count` fences (signalled)
    ///
    /// On failure every object created so far is destroyed.
    pub fn new(device: &ash::Device, slot_count: usize, fence_count: usize) -> Result<Self> {
        let mut sync = Self {
            image_acquired: Vec::with_capacity(slot_count),
            blit_finished: Vec::with_capacity(slot_count),
            fences: Vec::with_capacity(fence_count),
            command_buffers: Vec::new(),
        };

        if let Err(e) = unsafe { sync.create_objects(device, slot_count, fence_count) } {
            unsafe { sync.destroy(device, None) };
            return Err(e);
        }
        Ok(sync)
    }

    unsafe fn create_objects(&mut self, device: &ash::Device, slot_count: usize, fence_count: usize) -> Result<()> {
        let semaphore_create_info = vk::SemaphoreCreateInfo::default();
        for _ in 0..slot_count {
            self.image_acquired.push(
                device.create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to create image-acquired semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?
            );
            self.blit_finished.push(
                device.create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to create blit-finished semaphore: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                    })?
            );
        }

        let fence_create_info = vk::FenceCreateInfo::default()
            .flags(vk::FenceCreateFlags::SIGNALED);
        for _ in 0..fence_count {
            self.fences.push(
                device.create_fence(&fence_create_info, None)
                    .map_err(|e| {
                        dd_error!(SOURCE, "Failed to create frame fence: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                    })?
            );
        }

        dd_debug!(SOURCE, "Frame sync created: {} slots, {} fences", slot_count, fence_count);
        Ok(())
    }

    /// Record one blit per `(source, destination)` pair
    pub fn record_blits(
        &mut self,
        device: &ash::Device,
        command_buffers: Vec<vk::CommandBuffer>,
        pairs: &[(vk::Image, vk::Image)],
        src_extent: vk::Extent2D,
        dst_extent: vk::Extent2D,
    ) -> Result<usize> {
        self.command_buffers = command_buffers;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);

        for (&cb, &(src, dst)) in self.command_buffers.iter().zip(pairs) {
            unsafe {
                device.begin_command_buffer(cb, &begin_info).map_err(|e| {
                    dd_error!(SOURCE, "Failed to begin blit command buffer: {:?}", e);
                    Error::InitializationFailed(format!("Failed to begin command buffer: {:?}", e))
                })?;

                record_flipped_blit(device, cb, src, src_extent, dst, dst_extent);

                device.end_command_buffer(cb).map_err(|e| {
                    dd_error!(SOURCE, "Failed to end blit command buffer: {:?}", e);
                    Error::InitializationFailed(format!("Failed to end command buffer: {:?}", e))
                })?;
            }
        }

        Ok(self.command_buffers.len().min(pairs.len()))
    }

    /// Block on `fence`, leaving it signalled
    pub fn wait_fence(&self, device: &ash::Device, fence: usize) -> Result<()> {
        let fences = [self.fence(fence)?];
        unsafe {
            device
                .wait_for_fences(&fences, true, u64::MAX)
                .map_err(|e| dd_err!(SOURCE, "Failed to wait for frame fence {}: {:?}", fence, e))
        }
    }

    /// Reset `fence` ahead of the submission that signals it
    pub fn reset_fence(&self, device: &ash::Device, fence: usize) -> Result<()> {
        let fences = [self.fence(fence)?];
        unsafe {
            device
                .reset_fences(&fences)
                .map_err(|e| dd_err!(SOURCE, "Failed to reset frame fence {}: {:?}", fence, e))
        }
    }

    /// Submit `slot`'s blit: waits on `rendering_finished` and the acquire,
    /// signals "blit finished" and `fence`
    pub fn submit_blit(
        &self,
        device: &ash::Device,
        queue: vk::Queue,
        slot: usize,
        rendering_finished: vk::Semaphore,
        fence: usize,
    ) -> Result<()> {
        let wait_semaphores = [rendering_finished, self.image_acquired[slot]];
        let wait_stages = [vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER];
        let command_buffers = [self.command_buffers[slot]];
        let signal_semaphores = [self.blit_finished[slot]];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .queue_submit(queue, &[submit_info], self.fence(fence)?)
                .map_err(|e| dd_err!(SOURCE, "Failed to submit blit for slot {}: {:?}", slot, e))
        }
    }

    fn fence(&self, index: usize) -> Result<vk::Fence> {
        self.fences
            .get(index)
            .copied()
            .ok_or_else(|| dd_err!(SOURCE, "Fence index {} out of range ({})", index, self.fences.len()))
    }

    /// # Safety
    ///
    /// The device must be idle. `pool` is the pool the command buffers came from.
    pub unsafe fn destroy(&mut self, device: &ash::Device, pool: Option<vk::CommandPool>) {
        if let Some(pool) = pool {
            if !self.command_buffers.is_empty() {
                device.free_command_buffers(pool, &self.command_buffers);
            }
        }
        self.command_buffers.clear();
        for semaphore in self.image_acquired.drain(..).chain(self.blit_finished.drain(..)) {
            device.destroy_semaphore(semaphore, None);
        }
        for fence in self.fences.drain(..) {
            device.destroy_fence(fence, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flipped_blit_region_inverts_y() {
        let region = flipped_blit_region(
            vk::Extent2D { width: 1920, height: 1080 },
            vk::Extent2D { width: 1920, height: 1080 },
        );
        assert_eq!(region.src_offsets[0], vk::Offset3D { x: 0, y: 0, z: 0 });
        assert_eq!(region.src_offsets[1], vk::Offset3D { x: 1920, y: 1080, z: 1 });
        assert_eq!(region.dst_offsets[0], vk::Offset3D { x: 0, y: 1080, z: 0 });
        assert_eq!(region.dst_offsets[1], vk::Offset3D { x: 1920, y: 0, z: 1 });
    }

    #[test]
    fn test_flipped_blit_region_scales_to_destination() {
        let region = flipped_blit_region(
            vk::Extent2D { width: 800, height: 600 },
            vk::Extent2D { width: 1600, height: 1200 },
        );
        assert_eq!(region.src_offsets[1].x, 800);
        assert_eq!(region.dst_offsets[0].y, 1200);
        assert_eq!(region.dst_offsets[1].x, 1600);
        assert_eq!(region.src_subresource.layer_count, 1);
        assert_eq!(region.dst_subresource.aspect_mask, vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn test_color_subresource_range_single_level() {
        let range = color_subresource_range();
        assert_eq!(range.level_count, 1);
        assert_eq!(range.layer_count, 1);
        assert_eq!(range.aspect_mask, vk::ImageAspectFlags::COLOR);
    }
}
