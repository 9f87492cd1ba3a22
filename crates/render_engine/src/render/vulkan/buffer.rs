//! Buffer management for vertex, index, and uniform data
//!
//! Every buffer is created in two phases: the handle first, then memory
//! selected by [`find_memory_type`], allocated and bound. Mesh data is
//! uploaded through a throwaway staging buffer into device-local memory;
//! uniform buffers stay host visible with a persistent mapping.

use std::mem;

use ash::{vk, Device};

use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::device::LogicalDevice;
use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Select a memory type index matching the requirement mask and properties
///
/// `type_filter` is the bitmask from the resource's memory requirements,
/// bit `i` allowing memory type `i`.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    for i in 0..memory_properties.memory_type_count {
        if (type_filter & (1 << i)) != 0
            && memory_properties.memory_types[i as usize]
                .property_flags
                .contains(properties)
        {
            return Ok(i);
        }
    }

    Err(VulkanError::NoSuitableMemoryType)
}

/// Buffer with bound memory and RAII cleanup
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory to it
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory_type_index = match find_memory_type(
            memory_properties,
            mem_requirements.memory_type_bits,
            properties,
        ) {
            Ok(index) => index,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(VulkanError::Api(e));
            }
        };

        unsafe {
            if let Err(e) = device.bind_buffer_memory(buffer, memory, 0) {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
                return Err(VulkanError::Api(e));
            }
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Upload `data` into a device-local buffer through a staging copy
    pub fn new_device_local<T>(
        device: &LogicalDevice,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        if data.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "cannot upload an empty buffer".to_string(),
            });
        }
        let size = mem::size_of_val(data) as vk::DeviceSize;

        let staging = Self::new(
            device.device.clone(),
            memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_data(data)?;

        let buffer = Self::new(
            device.device.clone(),
            memory_properties,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let commands = command_pool.one_time(device.graphics_queue)?;
        commands.copy_buffer(staging.handle(), buffer.handle(), size);
        commands.finish()?;

        Ok(buffer)
    }

    /// Map the whole buffer for host writes
    pub fn map_memory(&self) -> VulkanResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Release a mapping created by [`Self::map_memory`]
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Map, copy `data` in, and unmap again
    pub fn write_data<T>(&self, data: &[T]) -> VulkanResult<()> {
        let data_ptr = self.map_memory()?;

        unsafe {
            let src_ptr = data.as_ptr().cast::<std::ffi::c_void>();
            let size = mem::size_of_val(data);
            std::ptr::copy_nonoverlapping(src_ptr, data_ptr, size);
        }

        self.unmap_memory();
        Ok(())
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Device-local vertex buffer
pub struct VertexBuffer {
    buffer: Buffer,
}

impl VertexBuffer {
    /// Upload vertex data into device-local memory
    pub fn new<T>(
        device: &LogicalDevice,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        vertices: &[T],
    ) -> VulkanResult<Self> {
        let buffer = Buffer::new_device_local(
            device,
            memory_properties,
            command_pool,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            vertices,
        )?;

        Ok(Self { buffer })
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}

/// Device-local index buffer
pub struct IndexBuffer {
    buffer: Buffer,
    index_count: u32,
}

impl IndexBuffer {
    /// Upload index data into device-local memory
    pub fn new(
        device: &LogicalDevice,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        indices: &[u32],
    ) -> VulkanResult<Self> {
        let buffer = Buffer::new_device_local(
            device,
            memory_properties,
            command_pool,
            vk::BufferUsageFlags::INDEX_BUFFER,
            indices,
        )?;

        Ok(Self {
            buffer,
            index_count: indices.len() as u32,
        })
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Get index count
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Host-visible uniform buffer with a persistent mapping
///
/// The mapping lives for the buffer's whole lifetime, so a frame can write
/// its uniforms without a map call. The caller is responsible for only
/// writing while the GPU is not reading, which the frame fence guarantees.
pub struct UniformBuffer<T> {
    buffer: Buffer,
    mapped: *mut T,
}

impl<T> UniformBuffer<T> {
    /// Create one uniform slot of `T` and map it
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
    ) -> VulkanResult<Self> {
        let size = mem::size_of::<T>() as vk::DeviceSize;

        let buffer = Buffer::new(
            device,
            memory_properties,
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let mapped = buffer.map_memory()?.cast::<T>();

        Ok(Self { buffer, mapped })
    }

    /// Write new uniform contents through the persistent mapping
    pub fn update(&mut self, data: &T) {
        unsafe {
            std::ptr::copy_nonoverlapping(data, self.mapped, 1);
        }
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Size of the uniform range in bytes
    pub fn range(&self) -> vk::DeviceSize {
        self.buffer.size()
    }
}

impl<T> Drop for UniformBuffer<T> {
    fn drop(&mut self) {
        self.buffer.unmap_memory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &property_flags) in flags.iter().enumerate() {
            properties.memory_types[i] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        properties
    }

    /// The first memory type satisfying mask and properties wins.
    #[test]
    fn picks_first_matching_type() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let index = find_memory_type(
            &properties,
            0b111,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap();
        assert_eq!(index, 1);
    }

    /// A type excluded by the requirement bitmask is skipped even if its
    /// properties match.
    #[test]
    fn respects_type_filter_mask() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);

        let index = find_memory_type(&properties, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .unwrap();
        assert_eq!(index, 1);
    }

    /// A type carrying extra flags still satisfies a subset request.
    #[test]
    fn superset_flags_match() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL
                | vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let index =
            find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
        assert_eq!(index, 0);
    }

    /// No matching type is a hard error.
    #[test]
    fn no_match_is_an_error() {
        let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);

        let result = find_memory_type(&properties, 0b1, vk::MemoryPropertyFlags::HOST_VISIBLE);
        assert!(matches!(result, Err(VulkanError::NoSuitableMemoryType)));

        let masked_out = find_memory_type(&properties, 0, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert!(matches!(masked_out, Err(VulkanError::NoSuitableMemoryType)));
    }
}
