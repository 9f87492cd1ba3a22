//! Image and image view management
//!
//! Covers image creation with bound memory, layout transitions, mipmap
//! generation by successive blits, and the format capability probes the
//! depth buffer and mip chain depend on.

use ash::{vk, Device, Instance};

use crate::render::vulkan::buffer::find_memory_type;
use crate::render::vulkan::commands::OneTimeCommands;
use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Number of mip levels for a full chain down to 1x1
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (32 - width.max(height).leading_zeros()).max(1)
}

/// Whether `tiling` supports `features` according to the format properties
pub fn format_supported(
    props: &vk::FormatProperties,
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
) -> bool {
    match tiling {
        vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
        vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
        _ => false,
    }
}

/// Whether an optimal-tiling image of this format can be blitted with
/// linear filtering, which mip generation requires
pub fn supports_linear_blit(props: &vk::FormatProperties) -> bool {
    props
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
}

/// Pick the first depth format usable as an optimal-tiling attachment
pub fn find_depth_format(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
) -> VulkanResult<vk::Format> {
    const CANDIDATES: [vk::Format; 3] = [
        vk::Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT,
    ];

    for format in CANDIDATES {
        let props =
            unsafe { instance.get_physical_device_format_properties(physical_device, format) };
        if format_supported(
            &props,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        ) {
            return Ok(format);
        }
    }

    Err(VulkanError::UnsupportedFormat(
        "no depth attachment format available".to_string(),
    ))
}

/// Image with bound memory and RAII cleanup
pub struct Image {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    format: vk::Format,
    mip_levels: u32,
}

impl Image {
    /// Create a 2D image and bind freshly allocated memory to it
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        width: u32,
        height: u32,
        mip_levels: u32,
        samples: vk::SampleCountFlags,
        format: vk::Format,
        tiling: vk::ImageTiling,
        usage: vk::ImageUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(mip_levels)
            .array_layers(1)
            .format(format)
            .tiling(tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .samples(samples)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let image = unsafe {
            device
                .create_image(&image_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { device.get_image_memory_requirements(image) };

        let memory_type_index = match find_memory_type(
            memory_properties,
            mem_requirements.memory_type_bits,
            properties,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(VulkanError::Api(e));
            }
        };

        unsafe {
            if let Err(e) = device.bind_image_memory(image, memory, 0) {
                device.destroy_image(image, None);
                device.free_memory(memory, None);
                return Err(VulkanError::Api(e));
            }
        }

        Ok(Self {
            device,
            image,
            memory,
            format,
            mip_levels,
        })
    }

    /// Get image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Get image format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Get mip level count
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Image view wrapper with RAII cleanup
pub struct ImageView {
    device: Device,
    view: vk::ImageView,
}

impl ImageView {
    /// Create a 2D view over the first `mip_levels` levels of `image`
    pub fn new(
        device: Device,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
        mip_levels: u32,
    ) -> VulkanResult<Self> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe {
            device
                .create_image_view(&view_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, view })
    }

    /// Get view handle
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.view, None);
        }
    }
}

/// Record a whole-image layout transition into a one-shot command buffer
///
/// Only the two transitions the texture upload path needs are supported.
pub fn transition_image_layout(
    commands: &OneTimeCommands,
    image: vk::Image,
    mip_levels: u32,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> VulkanResult<()> {
    let (src_access, dst_access, src_stage, dst_stage) = match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        _ => {
            return Err(VulkanError::InvalidOperation {
                reason: format!("unsupported layout transition {old_layout:?} to {new_layout:?}"),
            })
        }
    };

    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: mip_levels,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build();

    commands.pipeline_barrier(src_stage, dst_stage, barrier);
    Ok(())
}

fn mip_barrier(
    image: vk::Image,
    mip_level: u32,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
) -> vk::ImageMemoryBarrier {
    vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: mip_level,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .build()
}

/// Fill mip levels 1.. by blitting each level from the one above it
///
/// Expects the whole image in `TRANSFER_DST_OPTIMAL`; leaves every level in
/// `SHADER_READ_ONLY_OPTIMAL`. The caller must have verified the format
/// supports linear-filtered blits.
pub fn generate_mipmaps(
    commands: &OneTimeCommands,
    image: vk::Image,
    width: u32,
    height: u32,
    mip_levels: u32,
) {
    let mut mip_width = width as i32;
    let mut mip_height = height as i32;

    for level in 1..mip_levels {
        commands.pipeline_barrier(
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            mip_barrier(
                image,
                level - 1,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::TRANSFER_READ,
            ),
        );

        let dst_width = if mip_width > 1 { mip_width / 2 } else { 1 };
        let dst_height = if mip_height > 1 { mip_height / 2 } else { 1 };

        let blit = vk::ImageBlit {
            src_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: mip_width,
                    y: mip_height,
                    z: 1,
                },
            ],
            dst_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            },
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: dst_width,
                    y: dst_height,
                    z: 1,
                },
            ],
        };

        commands.blit_image(
            image,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[blit],
            vk::Filter::LINEAR,
        );

        commands.pipeline_barrier(
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            mip_barrier(
                image,
                level - 1,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::AccessFlags::TRANSFER_READ,
                vk::AccessFlags::SHADER_READ,
            ),
        );

        mip_width = dst_width;
        mip_height = dst_height;
    }

    // The last level was only ever a blit destination.
    commands.pipeline_barrier(
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        mip_barrier(
            image,
            mip_levels - 1,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Full mip chains end at 1x1, counting the base level.
    #[test]
    fn mip_chain_lengths() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(512, 512), 10);
        assert_eq!(mip_level_count(1024, 1024), 11);
    }

    /// The longer side drives the chain length for non-square images.
    #[test]
    fn mip_chain_uses_longest_side() {
        assert_eq!(mip_level_count(1024, 1), 11);
        assert_eq!(mip_level_count(3, 513), 10);
    }

    /// A non-power-of-two size rounds the chain length down.
    #[test]
    fn mip_chain_rounds_down() {
        assert_eq!(mip_level_count(1000, 1000), 10);
        assert_eq!(mip_level_count(3, 3), 2);
    }

    /// Linear blit support reads the optimal tiling feature bit.
    #[test]
    fn linear_blit_support_bit() {
        let supported = vk::FormatProperties {
            optimal_tiling_features: vk::FormatFeatureFlags::SAMPLED_IMAGE
                | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR,
            ..Default::default()
        };
        assert!(supports_linear_blit(&supported));

        let unsupported = vk::FormatProperties {
            optimal_tiling_features: vk::FormatFeatureFlags::SAMPLED_IMAGE,
            // Linear tiling support does not help an optimal-tiling image.
            linear_tiling_features: vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR,
            ..Default::default()
        };
        assert!(!supports_linear_blit(&unsupported));
    }

    /// Feature checks look at the tiling-specific feature set.
    #[test]
    fn format_support_follows_tiling() {
        let props = vk::FormatProperties {
            linear_tiling_features: vk::FormatFeatureFlags::TRANSFER_SRC,
            optimal_tiling_features: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        };

        assert!(format_supported(
            &props,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        ));
        assert!(!format_supported(
            &props,
            vk::ImageTiling::LINEAR,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        ));
        assert!(format_supported(
            &props,
            vk::ImageTiling::LINEAR,
            vk::FormatFeatureFlags::TRANSFER_SRC,
        ));
    }
}
