//! Vulkan swapchain management
//!
//! Owns the swapchain handle, its images, and one view per image. The
//! format, present mode, extent, and image count choosers are free functions
//! so the selection rules can be tested without a device.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::render::vulkan::device::{LogicalDevice, PhysicalDeviceSelection};
use crate::render::vulkan::error::{VulkanError, VulkanResult};
use crate::render::vulkan::surface::Surface;

/// Surface capabilities, formats, and present modes for one device
pub struct SwapchainSupport {
    /// Surface capabilities (extent bounds, image count bounds, transform)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported presentation modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query the surface support details of a physical device
    pub fn query(surface: &Surface, physical_device: vk::PhysicalDevice) -> VulkanResult<Self> {
        Ok(Self {
            capabilities: surface.capabilities(physical_device)?,
            formats: surface.formats(physical_device)?,
            present_modes: surface.present_modes(physical_device)?,
        })
    }

    /// Whether a swapchain can be created at all
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Pick the surface format, preferring 8-bit BGRA with nonlinear sRGB
///
/// Falls back to the first reported format. Returns `None` only when the
/// device reports no formats at all.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// Pick the present mode: mailbox, then immediate, then FIFO
///
/// FIFO is the only mode the API guarantees, so it is the final fallback.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else if modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Pick the swapchain extent
///
/// When the surface reports a fixed current extent it is used verbatim. A
/// current width of `u32::MAX` means the surface is flexible and the window's
/// framebuffer size is clamped into the reported bounds instead.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer_extent.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer_extent.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Pick the image count: one above the minimum, clamped to the maximum
///
/// A reported maximum of zero means the surface imposes no upper bound.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

struct SwapchainParts {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

/// Swapchain wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Create a swapchain sized to the window's framebuffer
    pub fn new(
        device: &LogicalDevice,
        surface: &Surface,
        selection: &PhysicalDeviceSelection,
        framebuffer_extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let parts = Self::build_parts(
            &device.device,
            &device.swapchain_loader,
            surface,
            selection,
            framebuffer_extent,
        )?;

        log::debug!(
            "Swapchain created: {}x{}, {} images, {:?}, {:?}",
            parts.extent.width,
            parts.extent.height,
            parts.images.len(),
            parts.format.format,
            parts.present_mode
        );

        Ok(Self {
            device: device.device.clone(),
            swapchain_loader: device.swapchain_loader.clone(),
            swapchain: parts.swapchain,
            images: parts.images,
            image_views: parts.image_views,
            format: parts.format,
            extent: parts.extent,
            present_mode: parts.present_mode,
        })
    }

    /// Tear down and rebuild the swapchain for the current surface state
    ///
    /// The old handle and its views are destroyed before the new ones are
    /// created, so the caller must first wait for the device to go idle and
    /// destroy everything built on top of the old images (framebuffers,
    /// attachment targets).
    pub fn recreate(
        &mut self,
        surface: &Surface,
        selection: &PhysicalDeviceSelection,
        framebuffer_extent: vk::Extent2D,
    ) -> VulkanResult<()> {
        unsafe {
            for image_view in self.image_views.drain(..) {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
        self.swapchain = vk::SwapchainKHR::null();
        self.images.clear();

        let parts = Self::build_parts(
            &self.device,
            &self.swapchain_loader,
            surface,
            selection,
            framebuffer_extent,
        )?;
        self.swapchain = parts.swapchain;
        self.images = parts.images;
        self.image_views = parts.image_views;
        self.format = parts.format;
        self.extent = parts.extent;
        self.present_mode = parts.present_mode;

        log::debug!(
            "Swapchain recreated: {}x{}, {} images",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
        Ok(())
    }

    fn build_parts(
        device: &Device,
        swapchain_loader: &SwapchainLoader,
        surface: &Surface,
        selection: &PhysicalDeviceSelection,
        framebuffer_extent: vk::Extent2D,
    ) -> VulkanResult<SwapchainParts> {
        let support = SwapchainSupport::query(surface, selection.device)?;

        let format = choose_surface_format(&support.formats).ok_or_else(|| {
            VulkanError::UnsupportedFormat("surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, framebuffer_extent);
        let image_count = choose_image_count(&support.capabilities);

        let family_indices = [
            selection.queue_families.graphics,
            selection.queue_families.present,
        ];
        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        // Images are shared across queues only when graphics and present
        // live in different families.
        create_info = if selection.queue_families.shared() {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = unsafe {
            swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        let image_views: Result<Vec<_>, _> = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                unsafe { device.create_image_view(&view_info, None) }
            })
            .collect();
        let image_views = image_views.map_err(VulkanError::Api)?;

        Ok(SwapchainParts {
            swapchain,
            images,
            image_views,
            format,
            extent,
            present_mode,
        })
    }

    /// Acquire the next presentable image, signaling `signal` when ready
    ///
    /// Returns `None` when the swapchain is out of date and must be
    /// recreated before an image can be acquired. The boolean reports a
    /// suboptimal (but still usable) swapchain.
    pub fn acquire_next_image(
        &self,
        signal: vk::Semaphore,
    ) -> VulkanResult<Option<(u32, bool)>> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                signal,
                vk::Fence::null(),
            )
        };
        match result {
            Ok((index, suboptimal)) => Ok(Some((index, suboptimal))),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Queue image `image_index` for presentation after `wait` signals
    ///
    /// Returns true when the swapchain no longer matches the surface and
    /// should be recreated (suboptimal or out of date).
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VulkanResult<bool> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { self.swapchain_loader.queue_present(queue, &present_info) };
        match result {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Width over height of the current extent
    pub fn aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height as f32
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get the active present mode
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Get image count
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    /// BGRA sRGB wins whenever the surface offers it.
    #[test]
    fn format_prefers_bgra_srgb() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[1]));
    }

    /// Without the preferred pair the first reported format is used.
    #[test]
    fn format_falls_back_to_first() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
        assert_eq!(choose_surface_format(&[]), None);
    }

    /// Present mode preference order: mailbox, immediate, FIFO.
    #[test]
    fn present_mode_preference_order() {
        let mailbox = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&mailbox), vk::PresentModeKHR::MAILBOX);

        let immediate = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&immediate), vk::PresentModeKHR::IMMEDIATE);

        let fifo_only = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&fifo_only), vk::PresentModeKHR::FIFO);

        let all = [
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(choose_present_mode(&all), vk::PresentModeKHR::MAILBOX);
    }

    fn capabilities(
        current: vk::Extent2D,
        min: vk::Extent2D,
        max: vk::Extent2D,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: current,
            min_image_extent: min,
            max_image_extent: max,
            ..Default::default()
        }
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    /// A fixed current extent is returned exactly, ignoring the window size.
    #[test]
    fn extent_uses_fixed_current_extent() {
        let caps = capabilities(extent(640, 480), extent(1, 1), extent(4096, 4096));
        assert_eq!(choose_extent(&caps, extent(1920, 1080)), extent(640, 480));
    }

    /// A flexible surface clamps the framebuffer size into the reported bounds.
    #[test]
    fn extent_clamps_when_flexible() {
        let caps = capabilities(
            extent(u32::MAX, u32::MAX),
            extent(200, 100),
            extent(800, 600),
        );

        assert_eq!(choose_extent(&caps, extent(500, 400)), extent(500, 400));
        assert_eq!(choose_extent(&caps, extent(10, 5000)), extent(200, 600));
        assert_eq!(choose_extent(&caps, extent(5000, 10)), extent(800, 100));
    }

    fn capabilities_with_counts(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    /// Image count is one above the minimum, clamped to the maximum.
    #[test]
    fn image_count_is_min_plus_one_clamped() {
        assert_eq!(choose_image_count(&capabilities_with_counts(2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities_with_counts(2, 3)), 3);
        assert_eq!(choose_image_count(&capabilities_with_counts(3, 3)), 3);
    }

    /// A zero maximum means unbounded, so min plus one always fits.
    #[test]
    fn image_count_unbounded_when_max_is_zero() {
        assert_eq!(choose_image_count(&capabilities_with_counts(2, 0)), 3);
        assert_eq!(choose_image_count(&capabilities_with_counts(7, 0)), 8);
    }

    /// Support is adequate only with at least one format and one present mode.
    #[test]
    fn adequacy_requires_formats_and_modes() {
        let adequate = SwapchainSupport {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![format(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(adequate.is_adequate());

        let no_formats = SwapchainSupport {
            formats: vec![],
            ..adequate
        };
        assert!(!no_formats.is_adequate());

        let no_modes = SwapchainSupport {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![format(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![],
        };
        assert!(!no_modes.is_adequate());
    }
}
