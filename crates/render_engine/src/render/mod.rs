//! Rendering system
//!
//! Mesh geometry types, shader uniform layouts, and the Vulkan backend.

pub mod mesh;
pub mod uniforms;
pub mod vertex;
pub mod vulkan;

pub use mesh::MeshData;
pub use uniforms::UniformBufferObject;
pub use vertex::Vertex;
pub use vulkan::{VulkanError, VulkanRenderer, VulkanResult};
