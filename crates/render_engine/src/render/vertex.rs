//! Vertex format shared between mesh loading and the Vulkan pipeline

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// A single mesh vertex: position, color, and texture coordinates
///
/// The layout is `#[repr(C)]` so the struct can be uploaded to vertex buffers
/// as raw bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Per-vertex color
    pub color: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Vertex input binding description for a tightly packed vertex stream
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Attribute descriptions matching the shader input locations
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            // Position (location = 0)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            // Color (location = 1)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12, // 3 * sizeof(f32) after position
            },
            // Texture coordinates (location = 2)
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: 24, // 6 * sizeof(f32) after position and color
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The binding stride matches the packed struct size.
    #[test]
    fn binding_stride_matches_struct_size() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 32);
        assert_eq!(binding.stride as usize, std::mem::size_of::<Vertex>());
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    /// Attribute offsets and formats match the field layout.
    #[test]
    fn attribute_layout_matches_fields() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[2].offset, 24);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
        assert!(attrs.iter().all(|a| a.binding == 0));
    }

    /// Vertices can be viewed as plain bytes for buffer uploads.
    #[test]
    fn vertices_cast_to_bytes() {
        let vertices = [Vertex {
            position: [1.0, 2.0, 3.0],
            color: [1.0, 1.0, 1.0],
            tex_coord: [0.5, 0.5],
        }];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 32);
    }
}
