//! Model viewer application
//!
//! Loads a textured OBJ model and renders it spinning in a resizable
//! window until the user closes it.

use std::path::Path;

use render_engine::assets::{self, AssetError, ImageData};
use render_engine::config::{AssetConfig, Config, ConfigError, RendererConfig, ShaderConfig};
use render_engine::foundation::{self, time::Timer};
use render_engine::render::vulkan::{VulkanRenderer, Window, WindowError};
use render_engine::render::VulkanError;
use thiserror::Error;

/// Path checked for an optional user-provided configuration file
const CONFIG_PATH: &str = "viewer.toml";

/// Top-level application errors
#[derive(Error, Debug)]
enum ViewerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("window error: {0}")]
    Window(#[from] WindowError),

    #[error("render error: {0}")]
    Render(#[from] VulkanError),
}

/// Load the renderer configuration, falling back to defaults
fn load_config() -> Result<RendererConfig, ViewerError> {
    let config = if Path::new(CONFIG_PATH).exists() {
        log::info!("Loading configuration from {CONFIG_PATH}");
        RendererConfig::load_from_file(CONFIG_PATH)?
    } else {
        RendererConfig::new("Model Viewer").with_title("Vulkan Model Viewer")
    };
    config.validate()?;
    Ok(config)
}

fn run() -> Result<(), ViewerError> {
    let config = load_config()?;
    let shaders = ShaderConfig::default();
    let asset_paths = AssetConfig::default();

    let mesh = assets::load_obj(asset_paths.model_path())?;
    let texture = ImageData::load(asset_paths.texture_path())?;
    log::info!(
        "Loaded model: {} vertices, {} indices, {}x{} texture",
        mesh.vertex_count(),
        mesh.index_count(),
        texture.width,
        texture.height
    );

    let mut window = Window::new(
        &config.window_title,
        config.window_width,
        config.window_height,
    )?;
    let mut renderer = VulkanRenderer::new(
        &mut window,
        &config,
        &shaders.resolve_vertex()?,
        &shaders.resolve_fragment()?,
        &mesh,
        &texture,
    )?;
    log::info!("Rendering on {}", renderer.device_name());

    let mut timer = Timer::new();
    while !window.should_close() {
        window.poll_events();
        timer.update();
        renderer.draw_frame(&mut window, timer.total_time())?;
    }

    renderer.wait_idle()?;
    log::info!(
        "Rendered {} frames, {:.1} fps average",
        timer.frame_count(),
        timer.average_fps()
    );
    Ok(())
}

fn main() {
    foundation::logging::init_with_default("info");
    log::info!("Starting model viewer");

    if let Err(e) = run() {
        log::error!("Fatal: {e}");
        std::process::exit(1);
    }
}
