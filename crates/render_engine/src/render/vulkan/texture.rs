//! Sampled textures
//!
//! Uploads decoded RGBA pixels into a device-local mipmapped image and
//! pairs it with the sampler the fragment shader reads through.

use ash::{vk, Device, Instance};

use crate::assets::ImageData;
use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::device::{LogicalDevice, PhysicalDeviceSelection};
use crate::render::vulkan::error::{VulkanError, VulkanResult};
use crate::render::vulkan::image::{
    generate_mipmaps, mip_level_count, supports_linear_blit, transition_image_layout, Image,
    ImageView,
};

const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Device-local texture with a full mip chain and a sampling view
pub struct Texture {
    image: Image,
    view: ImageView,
}

impl Texture {
    /// Upload `data` through a staging buffer and generate its mip chain
    pub fn from_data(
        instance: &Instance,
        device: &LogicalDevice,
        selection: &PhysicalDeviceSelection,
        command_pool: &CommandPool,
        data: &ImageData,
    ) -> VulkanResult<Self> {
        let format_props = unsafe {
            instance.get_physical_device_format_properties(selection.device, TEXTURE_FORMAT)
        };
        if !supports_linear_blit(&format_props) {
            return Err(VulkanError::UnsupportedFormat(format!(
                "{TEXTURE_FORMAT:?} does not support linear blits for mip generation"
            )));
        }

        let mip_levels = mip_level_count(data.width, data.height);

        let staging = Buffer::new(
            device.device.clone(),
            &selection.memory_properties,
            data.byte_size(),
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_data(&data.pixels)?;

        let image = Image::new(
            device.device.clone(),
            &selection.memory_properties,
            data.width,
            data.height,
            mip_levels,
            vk::SampleCountFlags::TYPE_1,
            TEXTURE_FORMAT,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::SAMPLED,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let commands = command_pool.one_time(device.graphics_queue)?;
        transition_image_layout(
            &commands,
            image.handle(),
            mip_levels,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;
        commands.copy_buffer_to_image(staging.handle(), image.handle(), data.width, data.height);
        generate_mipmaps(&commands, image.handle(), data.width, data.height, mip_levels);
        commands.finish()?;

        let view = ImageView::new(
            device.device.clone(),
            image.handle(),
            TEXTURE_FORMAT,
            vk::ImageAspectFlags::COLOR,
            mip_levels,
        )?;

        log::debug!(
            "Uploaded {}x{} texture with {} mip levels",
            data.width,
            data.height,
            mip_levels
        );

        Ok(Self { image, view })
    }

    /// Get the sampling view handle
    pub fn view(&self) -> vk::ImageView {
        self.view.handle()
    }

    /// Get mip level count
    pub fn mip_levels(&self) -> u32 {
        self.image.mip_levels()
    }
}

/// Texture sampler with RAII cleanup
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Create a linear-filtering repeat sampler covering `mip_levels` levels
    ///
    /// Anisotropy is enabled whenever the device offers more than 1x.
    pub fn new(device: Device, max_anisotropy: f32, mip_levels: u32) -> VulkanResult<Self> {
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(max_anisotropy > 1.0)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(mip_levels as f32);

        let sampler = unsafe {
            device
                .create_sampler(&sampler_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, sampler })
    }

    /// Get sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}
