//! # Render Engine
//!
//! A Vulkan renderer built around explicit GPU resource lifecycles: device
//! and swapchain management, a double-buffered frame loop, and asset upload
//! for textured mesh rendering.
//!
//! ## Features
//!
//! - **Vulkan Rendering**: Forward pass with depth testing and MSAA
//! - **Frame Pacing**: Two frames in flight with per-frame sync objects
//! - **Resize Handling**: Automatic swapchain recreation, minimize-safe
//! - **Asset Loading**: Wavefront OBJ models and PNG textures
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_engine::config::{AssetConfig, RendererConfig, ShaderConfig};
//! use render_engine::foundation::{self, time::Timer};
//! use render_engine::render::vulkan::{VulkanRenderer, Window};
//! use render_engine::assets;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     foundation::logging::init();
//!
//!     let config = RendererConfig::new("Demo");
//!     let shaders = ShaderConfig::default();
//!     let asset_paths = AssetConfig::default();
//!
//!     let mesh = assets::load_obj(asset_paths.model_path())?;
//!     let texture = assets::ImageData::load(asset_paths.texture_path())?;
//!
//!     let mut window = Window::new(
//!         &config.window_title,
//!         config.window_width,
//!         config.window_height,
//!     )?;
//!     let mut renderer = VulkanRenderer::new(
//!         &mut window,
//!         &config,
//!         &shaders.resolve_vertex()?,
//!         &shaders.resolve_fragment()?,
//!         &mesh,
//!         &texture,
//!     )?;
//!
//!     let mut timer = Timer::new();
//!     while !window.should_close() {
//!         window.poll_events();
//!         timer.update();
//!         renderer.draw_frame(&mut window, timer.total_time())?;
//!     }
//!     renderer.wait_idle()?;
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::assets::{load_obj, AssetError, ImageData};
    pub use crate::config::{AssetConfig, Config, ConfigError, RendererConfig, ShaderConfig};
    pub use crate::foundation::time::Timer;
    pub use crate::render::vulkan::{Window, WindowError};
    pub use crate::render::{
        MeshData, UniformBufferObject, Vertex, VulkanError, VulkanRenderer, VulkanResult,
    };
}
