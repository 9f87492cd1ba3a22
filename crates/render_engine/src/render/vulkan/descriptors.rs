//! Descriptor set layout, pool, and per-frame set updates
//!
//! The mesh pipeline sees two bindings: the per-frame uniform buffer at
//! binding 0 (vertex stage) and the combined image sampler at binding 1
//! (fragment stage). One descriptor set exists per frame slot.

use ash::{vk, Device};

use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Descriptor set layout wrapper with RAII cleanup
pub struct DescriptorSetLayout {
    device: Device,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Layout with one uniform buffer and one combined image sampler
    pub fn for_mesh_rendering(device: Device) -> VulkanResult<Self> {
        let bindings = [
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
        ];

        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        let layout = unsafe {
            device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, layout })
    }

    /// Get the layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool wrapper with RAII cleanup
///
/// Dropping the pool releases every set allocated from it.
pub struct DescriptorPool {
    device: Device,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a pool holding `max_sets` uniform-plus-sampler sets
    pub fn new(device: Device, max_sets: u32) -> VulkanResult<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: max_sets,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: max_sets,
            },
        ];

        let create_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets);

        let pool = unsafe {
            device
                .create_descriptor_pool(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, pool })
    }

    /// Allocate `count` sets of the same layout
    pub fn allocate(
        &self,
        layout: vk::DescriptorSetLayout,
        count: u32,
    ) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout; count as usize];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        unsafe {
            self.device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Point `set` at a uniform buffer range and a sampled texture
pub fn write_frame_descriptors(
    device: &Device,
    set: vk::DescriptorSet,
    uniform_buffer: vk::Buffer,
    uniform_range: vk::DeviceSize,
    texture_view: vk::ImageView,
    sampler: vk::Sampler,
) {
    let buffer_info = [vk::DescriptorBufferInfo {
        buffer: uniform_buffer,
        offset: 0,
        range: uniform_range,
    }];
    let image_info = [vk::DescriptorImageInfo {
        sampler,
        image_view: texture_view,
        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }];

    let writes = [
        vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info)
            .build(),
        vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(1)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info)
            .build(),
    ];

    unsafe { device.update_descriptor_sets(&writes, &[]) };
}
