//! High-level Vulkan renderer
//!
//! Combines the Vulkan subsystems into a complete forward renderer: device
//! setup, swapchain and render target management, mesh and texture upload,
//! per-frame uniform updates, and the synchronized draw loop with swapchain
//! recreation on resize.

use std::path::Path;

use ash::vk;

use crate::assets::ImageData;
use crate::config::RendererConfig;
use crate::render::mesh::MeshData;
use crate::render::uniforms::UniformBufferObject;
use crate::render::vulkan::buffer::{IndexBuffer, UniformBuffer, VertexBuffer};
use crate::render::vulkan::commands::{CommandPool, CommandRecorder};
use crate::render::vulkan::descriptors::{
    write_frame_descriptors, DescriptorPool, DescriptorSetLayout,
};
use crate::render::vulkan::device::{DeviceRequirements, LogicalDevice, PhysicalDeviceSelection};
use crate::render::vulkan::error::{VulkanError, VulkanResult};
use crate::render::vulkan::framebuffer::{DepthTarget, Framebuffers, MsaaColorTarget};
use crate::render::vulkan::image::find_depth_format;
use crate::render::vulkan::instance::VulkanInstance;
use crate::render::vulkan::pipeline::GraphicsPipeline;
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::shader::ShaderModule;
use crate::render::vulkan::surface::Surface;
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::{FrameScheduler, MAX_FRAMES_IN_FLIGHT};
use crate::render::vulkan::texture::{Sampler, Texture};
use crate::render::vulkan::window::Window;

/// Largest supported sample count that is a power of two at most `requested`
pub fn effective_sample_count(
    requested: u32,
    max_supported: vk::SampleCountFlags,
) -> vk::SampleCountFlags {
    const LADDER: [vk::SampleCountFlags; 6] = [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ];

    for candidate in LADDER {
        if candidate.as_raw() <= requested && candidate.as_raw() <= max_supported.as_raw() {
            return candidate;
        }
    }
    vk::SampleCountFlags::TYPE_1
}

/// Complete Vulkan rendering system for a single textured mesh
///
/// Fields are dropped in declaration order, so everything that needs the
/// device for cleanup comes before it, and the instance goes last.
pub struct VulkanRenderer {
    scheduler: FrameScheduler,
    descriptor_sets: Vec<vk::DescriptorSet>,
    #[allow(dead_code)]
    descriptor_pool: DescriptorPool,
    uniform_buffers: Vec<UniformBuffer<UniformBufferObject>>,
    index_buffer: IndexBuffer,
    vertex_buffer: VertexBuffer,
    #[allow(dead_code)]
    sampler: Sampler,
    #[allow(dead_code)]
    texture: Texture,
    framebuffers: Framebuffers,
    msaa_target: Option<MsaaColorTarget>,
    depth_target: DepthTarget,
    pipeline: GraphicsPipeline,
    #[allow(dead_code)]
    descriptor_set_layout: DescriptorSetLayout,
    render_pass: RenderPass,
    swapchain: Swapchain,
    #[allow(dead_code)]
    command_pool: CommandPool,
    device: LogicalDevice,
    selection: PhysicalDeviceSelection,
    surface: Surface,
    #[allow(dead_code)]
    instance: VulkanInstance,

    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
    clear_color: [f32; 4],
}

impl VulkanRenderer {
    /// Create a renderer presenting to `window`, with `mesh` and
    /// `texture_data` uploaded to the GPU
    pub fn new(
        window: &mut Window,
        config: &RendererConfig,
        vertex_shader_path: &Path,
        fragment_shader_path: &Path,
        mesh: &MeshData,
        texture_data: &ImageData,
    ) -> VulkanResult<Self> {
        let required_extensions = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;

        let instance = VulkanInstance::new(
            &config.app_name,
            &required_extensions,
            config.validation_enabled(),
        )?;
        let surface = Surface::new(&instance, window)?;

        let requirements = DeviceRequirements::default();
        let selection = PhysicalDeviceSelection::select(&instance.instance, &surface, &requirements)?;
        let device = LogicalDevice::new(&instance.instance, &selection, &requirements)?;

        let samples = effective_sample_count(config.msaa_samples, selection.max_msaa_samples);
        log::debug!(
            "Rendering with {samples:?} samples ({}x requested)",
            config.msaa_samples
        );

        let command_pool = CommandPool::new(device.device.clone(), device.queue_families.graphics)?;
        let swapchain = Swapchain::new(&device, &surface, &selection, window.framebuffer_extent())?;

        let depth_format = find_depth_format(&instance.instance, selection.device)?;
        let render_pass = RenderPass::new_forward_pass(
            device.device.clone(),
            swapchain.format().format,
            depth_format,
            samples,
        )?;

        let descriptor_set_layout = DescriptorSetLayout::for_mesh_rendering(device.device.clone())?;

        let vertex_shader = ShaderModule::from_file(device.device.clone(), vertex_shader_path)?;
        let fragment_shader = ShaderModule::from_file(device.device.clone(), fragment_shader_path)?;
        let pipeline = GraphicsPipeline::new(
            device.device.clone(),
            render_pass.handle(),
            descriptor_set_layout.handle(),
            &vertex_shader,
            &fragment_shader,
            samples,
        )?;

        let depth_target = DepthTarget::new(
            device.device.clone(),
            &selection.memory_properties,
            swapchain.extent(),
            depth_format,
            samples,
        )?;
        let msaa_target = if samples != vk::SampleCountFlags::TYPE_1 {
            Some(MsaaColorTarget::new(
                device.device.clone(),
                &selection.memory_properties,
                swapchain.extent(),
                swapchain.format().format,
                samples,
            )?)
        } else {
            None
        };
        let framebuffers = Framebuffers::new(
            device.device.clone(),
            render_pass.handle(),
            swapchain.extent(),
            swapchain.image_views(),
            depth_target.view(),
            msaa_target.as_ref().map(|target| target.view()),
        )?;

        let texture = Texture::from_data(
            &instance.instance,
            &device,
            &selection,
            &command_pool,
            texture_data,
        )?;
        let sampler = Sampler::new(
            device.device.clone(),
            selection.properties.limits.max_sampler_anisotropy,
            texture.mip_levels(),
        )?;

        let vertex_buffer = VertexBuffer::new(
            &device,
            &selection.memory_properties,
            &command_pool,
            &mesh.vertices,
        )?;
        let index_buffer = IndexBuffer::new(
            &device,
            &selection.memory_properties,
            &command_pool,
            &mesh.indices,
        )?;

        let mut uniform_buffers = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            uniform_buffers.push(UniformBuffer::new(
                device.device.clone(),
                &selection.memory_properties,
            )?);
        }

        let descriptor_pool =
            DescriptorPool::new(device.device.clone(), MAX_FRAMES_IN_FLIGHT as u32)?;
        let descriptor_sets = descriptor_pool.allocate(
            descriptor_set_layout.handle(),
            MAX_FRAMES_IN_FLIGHT as u32,
        )?;
        for (&set, uniform_buffer) in descriptor_sets.iter().zip(&uniform_buffers) {
            write_frame_descriptors(
                &device.device,
                set,
                uniform_buffer.handle(),
                uniform_buffer.range(),
                texture.view(),
                sampler.handle(),
            );
        }

        let command_buffers = command_pool.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;
        let scheduler = FrameScheduler::new(&device.device, &command_buffers)?;

        log::info!(
            "Vulkan renderer ready: {} swapchain images, {:?}, {} indices",
            swapchain.image_count(),
            swapchain.present_mode(),
            index_buffer.index_count()
        );

        Ok(Self {
            scheduler,
            descriptor_sets,
            descriptor_pool,
            uniform_buffers,
            index_buffer,
            vertex_buffer,
            sampler,
            texture,
            framebuffers,
            msaa_target,
            depth_target,
            pipeline,
            descriptor_set_layout,
            render_pass,
            swapchain,
            command_pool,
            device,
            selection,
            surface,
            instance,
            depth_format,
            samples,
            clear_color: config.clear_color,
        })
    }

    /// Render and present one frame
    ///
    /// `elapsed_secs` drives the model rotation. Swapchain recreation is
    /// handled internally; an out-of-date swapchain at acquire skips the
    /// frame without advancing the scheduler so no sync objects leak state.
    pub fn draw_frame(&mut self, window: &mut Window, elapsed_secs: f32) -> VulkanResult<()> {
        let frame_index = self.scheduler.current_index();
        let frame = self.scheduler.current();
        let image_available = frame.image_available.handle();
        let render_finished = frame.render_finished.handle();
        let in_flight = frame.in_flight.handle();
        let command_buffer = frame.command_buffer;

        frame.in_flight.wait(u64::MAX)?;

        // A suboptimal acquire still renders; only out-of-date skips.
        let (image_index, _suboptimal) = match self.swapchain.acquire_next_image(image_available)? {
            Some(acquired) => acquired,
            None => {
                self.recreate_swapchain(window)?;
                return Ok(());
            }
        };

        let ubo = UniformBufferObject::for_elapsed(elapsed_secs, self.swapchain.aspect_ratio());
        self.uniform_buffers[frame_index].update(&ubo);

        // Reset only after acquire succeeded, or an early return above
        // would leave the fence unsignaled and deadlock the next wait.
        self.scheduler.current().in_flight.reset()?;
        self.record_commands(command_buffer, image_index, frame_index)?;

        let wait_semaphores = [image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .device
                .queue_submit(self.device.graphics_queue, &[submit_info.build()], in_flight)
                .map_err(VulkanError::Api)?;
        }

        let needs_recreate =
            self.swapchain
                .present(self.device.present_queue, image_index, render_finished)?;
        let resized = window.take_resized();
        if needs_recreate || resized {
            self.recreate_swapchain(window)?;
        }

        self.scheduler.advance();
        Ok(())
    }

    /// Record the draw commands for one frame into `command_buffer`
    fn record_commands(
        &self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
        frame_index: usize,
    ) -> VulkanResult<()> {
        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no framebuffer for swapchain image {image_index}"),
            })?;
        let extent = self.swapchain.extent();

        let mut recorder = CommandRecorder::new(command_buffer, self.device.device.clone());
        recorder.reset()?.begin()?;

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        {
            let mut render_pass = recorder.begin_render_pass(
                self.render_pass.handle(),
                framebuffer,
                render_area,
                &clear_values,
            )?;

            render_pass.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());

            let viewport = vk::Viewport::builder()
                .x(0.0)
                .y(0.0)
                .width(extent.width as f32)
                .height(extent.height as f32)
                .min_depth(0.0)
                .max_depth(1.0)
                .build();
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            render_pass.set_viewport(&viewport);
            render_pass.set_scissor(&scissor);

            render_pass.cmd_bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
            render_pass.cmd_bind_index_buffer(self.index_buffer.handle(), 0, vk::IndexType::UINT32);
            render_pass.cmd_bind_descriptor_sets(
                self.pipeline.layout(),
                0,
                &self.descriptor_sets[frame_index..=frame_index],
            );

            render_pass.cmd_draw_indexed(self.index_buffer.index_count(), 1, 0, 0, 0);
        }

        recorder.end()?;
        Ok(())
    }

    /// Tear down and rebuild everything sized to the framebuffer
    ///
    /// Blocks while the window is minimized, then rebuilds the swapchain
    /// followed by the render targets and framebuffers that reference it.
    fn recreate_swapchain(&mut self, window: &mut Window) -> VulkanResult<()> {
        let extent = window.wait_for_valid_extent();
        self.device.wait_idle()?;

        self.framebuffers.clear();
        self.swapchain.recreate(&self.surface, &self.selection, extent)?;

        self.depth_target = DepthTarget::new(
            self.device.device.clone(),
            &self.selection.memory_properties,
            self.swapchain.extent(),
            self.depth_format,
            self.samples,
        )?;
        self.msaa_target = if self.samples != vk::SampleCountFlags::TYPE_1 {
            Some(MsaaColorTarget::new(
                self.device.device.clone(),
                &self.selection.memory_properties,
                self.swapchain.extent(),
                self.swapchain.format().format,
                self.samples,
            )?)
        } else {
            None
        };
        self.framebuffers = Framebuffers::new(
            self.device.device.clone(),
            self.render_pass.handle(),
            self.swapchain.extent(),
            self.swapchain.image_views(),
            self.depth_target.view(),
            self.msaa_target.as_ref().map(|target| target.view()),
        )?;

        let extent = self.swapchain.extent();
        log::debug!("Swapchain recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }

    /// Wait for all GPU work to finish
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.device.wait_idle()
    }

    /// Name of the GPU in use
    pub fn device_name(&self) -> String {
        self.selection.device_name()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            log::warn!("Device wait failed during renderer teardown: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The requested count is used when the device supports it.
    #[test]
    fn requested_sample_count_is_honored() {
        assert_eq!(
            effective_sample_count(8, vk::SampleCountFlags::TYPE_8),
            vk::SampleCountFlags::TYPE_8
        );
    }

    /// Requests above the device limit clamp down to the limit.
    #[test]
    fn sample_count_clamps_to_device_limit() {
        assert_eq!(
            effective_sample_count(64, vk::SampleCountFlags::TYPE_4),
            vk::SampleCountFlags::TYPE_4
        );
    }

    /// Requests below the device limit are not raised.
    #[test]
    fn sample_count_never_exceeds_request() {
        assert_eq!(
            effective_sample_count(2, vk::SampleCountFlags::TYPE_64),
            vk::SampleCountFlags::TYPE_2
        );
    }

    /// A request of one sample disables multisampling entirely.
    #[test]
    fn single_sample_request_disables_msaa() {
        assert_eq!(
            effective_sample_count(1, vk::SampleCountFlags::TYPE_64),
            vk::SampleCountFlags::TYPE_1
        );
    }

    /// A device capped at one sample forces MSAA off.
    #[test]
    fn unsupported_msaa_falls_back_to_single_sample() {
        assert_eq!(
            effective_sample_count(8, vk::SampleCountFlags::TYPE_1),
            vk::SampleCountFlags::TYPE_1
        );
    }
}
