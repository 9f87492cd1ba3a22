//! Vulkan rendering backend
//!
//! Low-level Vulkan wrappers with RAII ownership, composed into a forward
//! renderer by [`renderer::VulkanRenderer`].

pub mod buffer;
pub mod commands;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod image;
pub mod instance;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod window;

pub use buffer::{Buffer, IndexBuffer, UniformBuffer, VertexBuffer};
pub use commands::{CommandPool, CommandRecorder, OneTimeCommands};
pub use descriptors::{DescriptorPool, DescriptorSetLayout};
pub use device::{DeviceRequirements, LogicalDevice, PhysicalDeviceSelection, QueueFamilyIndices};
pub use error::{VulkanError, VulkanResult};
pub use framebuffer::{DepthTarget, Framebuffers, MsaaColorTarget};
pub use image::{Image, ImageView};
pub use instance::VulkanInstance;
pub use pipeline::GraphicsPipeline;
pub use render_pass::RenderPass;
pub use renderer::VulkanRenderer;
pub use shader::ShaderModule;
pub use surface::Surface;
pub use swapchain::{Swapchain, SwapchainSupport};
pub use sync::{Fence, FrameScheduler, FrameSync, Semaphore, MAX_FRAMES_IN_FLIGHT};
pub use texture::{Sampler, Texture};
pub use window::{Window, WindowError, WindowResult};
