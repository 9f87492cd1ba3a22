//! Command buffer management
//!
//! The command pool hands out per-frame primary buffers plus one-shot
//! transfer buffers. Recording goes through typed wrappers so begin/end
//! pairing and render pass scoping are enforced by ownership.

use ash::{vk, Device};

use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a command pool whose buffers can be individually reset
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            command_pool,
        })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let command_buffers = unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        Ok(command_buffers)
    }

    /// Begin a one-shot transfer recording on `queue`
    pub fn one_time(&self, queue: vk::Queue) -> VulkanResult<OneTimeCommands> {
        OneTimeCommands::begin(self.device.clone(), self.command_pool, queue)
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // All buffers from this pool must be off the queues first.
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// One-shot command buffer for transfers and layout transitions
///
/// [`Self::finish`] submits, waits for the queue to drain, and frees the
/// buffer. Dropping without finishing frees the buffer unsubmitted.
pub struct OneTimeCommands {
    device: Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
    submitted: bool,
}

impl OneTimeCommands {
    /// Allocate a command buffer and begin recording
    pub fn begin(device: Device, pool: vk::CommandPool, queue: vk::Queue) -> VulkanResult<Self> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?[0]
        };

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if let Err(e) = unsafe { device.begin_command_buffer(command_buffer, &begin_info) } {
            unsafe { device.free_command_buffers(pool, &[command_buffer]) };
            return Err(VulkanError::Api(e));
        }

        Ok(Self {
            device,
            pool,
            queue,
            command_buffer,
            submitted: false,
        })
    }

    /// Record a full-buffer copy
    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.device
                .cmd_copy_buffer(self.command_buffer, src, dst, &[region]);
        }
    }

    /// Record a buffer-to-image copy of one tightly packed mip level
    pub fn copy_buffer_to_image(
        &self,
        buffer: vk::Buffer,
        image: vk::Image,
        width: u32,
        height: u32,
    ) {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D {
                width,
                height,
                depth: 1,
            },
        };
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    /// Record an image memory barrier between two pipeline stages
    pub fn pipeline_barrier(
        &self,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: vk::ImageMemoryBarrier,
    ) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Record an image blit
    pub fn blit_image(
        &self,
        src_image: vk::Image,
        src_layout: vk::ImageLayout,
        dst_image: vk::Image,
        dst_layout: vk::ImageLayout,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        unsafe {
            self.device.cmd_blit_image(
                self.command_buffer,
                src_image,
                src_layout,
                dst_image,
                dst_layout,
                regions,
                filter,
            );
        }
    }

    /// End recording, submit, wait for the queue, and free the buffer
    pub fn finish(mut self) -> VulkanResult<()> {
        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;

            let command_buffers = [self.command_buffer];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
            self.device
                .queue_submit(self.queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)?;
            self.device
                .queue_wait_idle(self.queue)
                .map_err(VulkanError::Api)?;

            self.device
                .free_command_buffers(self.pool, &command_buffers);
        }
        self.submitted = true;
        Ok(())
    }
}

impl Drop for OneTimeCommands {
    fn drop(&mut self) {
        if !self.submitted {
            unsafe {
                self.device
                    .free_command_buffers(self.pool, &[self.command_buffer]);
            }
        }
    }
}

/// Command buffer recorder enforcing begin/end pairing
pub struct CommandRecorder {
    command_buffer: vk::CommandBuffer,
    device: Device,
    recording: bool,
}

impl CommandRecorder {
    /// Wrap an allocated command buffer for recording
    pub fn new(command_buffer: vk::CommandBuffer, device: Device) -> Self {
        Self {
            command_buffer,
            device,
            recording: false,
        }
    }

    /// Reset the buffer, discarding previously recorded commands
    pub fn reset(&mut self) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot reset a command buffer while recording".to_string(),
            });
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
        }
        Ok(self)
    }

    /// Begin command recording
    pub fn begin(&mut self) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info = vk::CommandBufferBeginInfo::builder();

        unsafe {
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.recording = true;
        Ok(self)
    }

    /// Begin a render pass; it ends when the returned scope drops
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_>> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
        }

        Ok(ActiveRenderPass::new(self))
    }

    /// End command recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }
}

/// Render pass scope; ends the pass on drop
pub struct ActiveRenderPass<'a> {
    recorder: &'a mut CommandRecorder,
}

impl<'a> ActiveRenderPass<'a> {
    fn new(recorder: &'a mut CommandRecorder) -> Self {
        Self { recorder }
    }

    /// Set viewport
    pub fn set_viewport(&mut self, viewport: &vk::Viewport) {
        unsafe {
            self.recorder
                .device
                .cmd_set_viewport(self.recorder.command_buffer, 0, &[*viewport]);
        }
    }

    /// Set scissor
    pub fn set_scissor(&mut self, scissor: &vk::Rect2D) {
        unsafe {
            self.recorder
                .device
                .cmd_set_scissor(self.recorder.command_buffer, 0, &[*scissor]);
        }
    }

    /// Bind graphics pipeline
    pub fn cmd_bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder.device.cmd_bind_pipeline(
                self.recorder.command_buffer,
                bind_point,
                pipeline,
            );
        }
    }

    /// Bind vertex buffers
    pub fn cmd_bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.recorder.device.cmd_bind_vertex_buffers(
                self.recorder.command_buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    /// Bind index buffer
    pub fn cmd_bind_index_buffer(
        &mut self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        unsafe {
            self.recorder.device.cmd_bind_index_buffer(
                self.recorder.command_buffer,
                buffer,
                offset,
                index_type,
            );
        }
    }

    /// Bind descriptor sets for the graphics pipeline
    pub fn cmd_bind_descriptor_sets(
        &mut self,
        layout: vk::PipelineLayout,
        first_set: u32,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            self.recorder.device.cmd_bind_descriptor_sets(
                self.recorder.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                first_set,
                descriptor_sets,
                &[],
            );
        }
    }

    /// Draw indexed
    pub fn cmd_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.recorder.device.cmd_draw_indexed(
                self.recorder.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}

impl<'a> Drop for ActiveRenderPass<'a> {
    fn drop(&mut self) {
        unsafe {
            self.recorder
                .device
                .cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
