//! Framebuffer management
//!
//! Owns the per-swapchain-image framebuffers and the render target images
//! that back them, following RAII principles. Everything here is rebuilt
//! on swapchain recreation.

use ash::{vk, Device};

use crate::render::vulkan::error::{VulkanError, VulkanResult};
use crate::render::vulkan::image::{Image, ImageView};

/// Depth attachment image with its view
pub struct DepthTarget {
    _image: Image,
    view: ImageView,
}

impl DepthTarget {
    /// Create a depth attachment matching the swapchain extent
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> VulkanResult<Self> {
        let image = Image::new(
            device.clone(),
            memory_properties,
            extent.width,
            extent.height,
            1,
            samples,
            format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        // The render pass transitions it out of UNDEFINED on first use.
        let view = ImageView::new(
            device,
            image.handle(),
            format,
            vk::ImageAspectFlags::DEPTH,
            1,
        )?;

        Ok(Self {
            _image: image,
            view,
        })
    }

    /// Get the attachment view handle
    pub fn view(&self) -> vk::ImageView {
        self.view.handle()
    }
}

/// Multisampled color attachment the frame renders into before resolving
pub struct MsaaColorTarget {
    _image: Image,
    view: ImageView,
}

impl MsaaColorTarget {
    /// Create a multisampled color attachment in the swapchain format
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
        format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> VulkanResult<Self> {
        let image = Image::new(
            device.clone(),
            memory_properties,
            extent.width,
            extent.height,
            1,
            samples,
            format,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::TRANSIENT_ATTACHMENT | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let view = ImageView::new(
            device,
            image.handle(),
            format,
            vk::ImageAspectFlags::COLOR,
            1,
        )?;

        Ok(Self {
            _image: image,
            view,
        })
    }

    /// Get the attachment view handle
    pub fn view(&self) -> vk::ImageView {
        self.view.handle()
    }
}

/// One framebuffer per swapchain image, sharing the depth and MSAA targets
pub struct Framebuffers {
    device: Device,
    framebuffers: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    /// Create framebuffers over `swapchain_views` for `render_pass`
    ///
    /// Attachment order has to match the render pass: with MSAA the
    /// multisampled color target comes first and the swapchain view is
    /// the resolve destination, otherwise the swapchain view is the
    /// color attachment itself.
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        swapchain_views: &[vk::ImageView],
        depth_view: vk::ImageView,
        msaa_view: Option<vk::ImageView>,
    ) -> VulkanResult<Self> {
        let mut framebuffers = Self {
            device: device.clone(),
            framebuffers: Vec::with_capacity(swapchain_views.len()),
        };

        for &swapchain_view in swapchain_views {
            let attachments = match msaa_view {
                Some(msaa_view) => vec![msaa_view, depth_view, swapchain_view],
                None => vec![swapchain_view, depth_view],
            };

            let framebuffer_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe {
                device
                    .create_framebuffer(&framebuffer_info, None)
                    .map_err(VulkanError::Api)?
            };
            framebuffers.framebuffers.push(framebuffer);
        }

        Ok(framebuffers)
    }

    /// Look up the framebuffer for a swapchain image index
    pub fn get(&self, index: usize) -> Option<vk::Framebuffer> {
        self.framebuffers.get(index).copied()
    }

    /// Number of framebuffers
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether the set has been cleared or was created empty
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    /// Destroy all framebuffers ahead of a swapchain rebuild
    pub fn clear(&mut self) {
        for framebuffer in self.framebuffers.drain(..) {
            unsafe {
                self.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        self.clear();
    }
}
