//! Configuration system
//!
//! Serde-backed configuration structs with builder methods plus a small trait
//! for loading and saving TOML or RON files.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported file format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A required file was not found in any of the searched locations
    #[error("File not found: {0}")]
    NotFound(String),

    /// A configuration value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration trait for file-backed settings
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Renderer and window configuration
///
/// Validation-layer enablement is a runtime choice: `None` enables validation
/// in debug builds and disables it in release builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan driver
    pub app_name: String,
    /// Initial window width in pixels
    pub window_width: u32,
    /// Initial window height in pixels
    pub window_height: u32,
    /// Window title
    pub window_title: String,
    /// Validation layer enablement; `None` resolves from the build profile
    pub enable_validation: Option<bool>,
    /// Preferred MSAA sample count (power of two, clamped to device support)
    pub msaa_samples: u32,
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Create a configuration with the given application name
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            window_title: app_name.clone(),
            app_name,
            window_width: 800,
            window_height: 600,
            enable_validation: None,
            msaa_samples: 8,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Set the initial window size
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    /// Explicitly enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Set the preferred MSAA sample count
    pub fn with_msaa_samples(mut self, samples: u32) -> Self {
        self.msaa_samples = samples;
        self
    }

    /// Set the framebuffer clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Resolve the effective validation setting for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.is_empty() {
            return Err(ConfigError::Invalid(
                "Application name cannot be empty".to_string(),
            ));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window size must be non-zero, got {}x{}",
                self.window_width, self.window_height
            )));
        }
        if !self.msaa_samples.is_power_of_two() || self.msaa_samples > 64 {
            return Err(ConfigError::Invalid(format!(
                "MSAA sample count must be a power of two between 1 and 64, got {}",
                self.msaa_samples
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Hello Vulkan")
    }
}

impl Config for RendererConfig {}

/// Shader file locations with search-path resolution
///
/// Applications may run from the workspace root, a crate directory, or next
/// to the compiled binary, so shader names are resolved against a small list
/// of candidate directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// File name of the vertex shader SPIR-V binary
    pub vertex_shader: String,
    /// File name of the fragment shader SPIR-V binary
    pub fragment_shader: String,
    /// Directories searched in order when resolving shader names
    pub search_paths: Vec<String>,
}

impl ShaderConfig {
    /// Create a configuration for the given shader file names
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex.into(),
            fragment_shader: fragment.into(),
            search_paths: vec![
                "target/shaders".to_string(),
                "shaders".to_string(),
                "resources/shaders".to_string(),
                "../shaders".to_string(),
                ".".to_string(),
            ],
        }
    }

    /// Resolve a shader file name against the search paths
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ConfigError> {
        for dir in &self.search_paths {
            let candidate = Path::new(dir).join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(ConfigError::NotFound(format!(
            "{name} (searched {:?})",
            self.search_paths
        )))
    }

    /// Resolve the vertex shader path
    pub fn resolve_vertex(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.vertex_shader)
    }

    /// Resolve the fragment shader path
    pub fn resolve_fragment(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.fragment_shader)
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::new("model.vert.spv", "model.frag.spv")
    }
}

impl Config for ShaderConfig {}

/// Asset locations for the model and texture rendered by the viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Root directory for bundled resources
    pub resources_dir: String,
    /// Model file path relative to the resources directory
    pub model: String,
    /// Texture file path relative to the resources directory
    pub texture: String,
}

impl AssetConfig {
    /// Set the resources directory
    pub fn with_resources_dir(mut self, dir: impl Into<String>) -> Self {
        self.resources_dir = dir.into();
        self
    }

    /// Full path to the model file
    pub fn model_path(&self) -> PathBuf {
        Path::new(&self.resources_dir).join(&self.model)
    }

    /// Full path to the texture file
    pub fn texture_path(&self) -> PathBuf {
        Path::new(&self.resources_dir).join(&self.texture)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            resources_dir: "resources".to_string(),
            model: "models/viking_room.obj".to_string(),
            texture: "textures/viking_room.png".to_string(),
        }
    }
}

impl Config for AssetConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Default renderer configuration passes validation.
    #[test]
    fn default_renderer_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_width, 800);
        assert_eq!(config.window_height, 600);
    }

    /// Zero-sized windows are rejected.
    #[test]
    fn zero_window_size_is_rejected() {
        let config = RendererConfig::default().with_window_size(0, 600);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    /// Sample counts must be powers of two no larger than 64.
    #[test]
    fn msaa_sample_count_is_validated() {
        assert!(RendererConfig::default().with_msaa_samples(3).validate().is_err());
        assert!(RendererConfig::default().with_msaa_samples(128).validate().is_err());
        assert!(RendererConfig::default().with_msaa_samples(1).validate().is_ok());
        assert!(RendererConfig::default().with_msaa_samples(64).validate().is_ok());
    }

    /// `None` defers validation enablement to the build profile.
    #[test]
    fn validation_auto_resolves_from_build_profile() {
        let config = RendererConfig::default();
        assert_eq!(config.validation_enabled(), cfg!(debug_assertions));
        assert!(RendererConfig::default().with_validation(true).validation_enabled());
        assert!(!RendererConfig::default().with_validation(false).validation_enabled());
    }

    /// Renderer configuration survives a TOML round trip.
    #[test]
    fn renderer_config_toml_round_trip() {
        let config = RendererConfig::new("demo")
            .with_window_size(1280, 720)
            .with_msaa_samples(4)
            .with_validation(true);

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: RendererConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.app_name, "demo");
        assert_eq!(parsed.window_width, 1280);
        assert_eq!(parsed.msaa_samples, 4);
        assert_eq!(parsed.enable_validation, Some(true));
    }

    /// Renderer configuration survives a RON round trip.
    #[test]
    fn renderer_config_ron_round_trip() {
        let config = RendererConfig::new("demo").with_clear_color([0.1, 0.2, 0.3, 1.0]);
        let text = ron::to_string(&config).unwrap();
        let parsed: RendererConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed.clear_color, [0.1, 0.2, 0.3, 1.0]);
    }

    /// Shader resolution returns the first search path containing the file.
    #[test]
    fn shader_resolution_finds_existing_file() {
        let dir = std::env::temp_dir().join("render_engine_shader_resolution_test");
        std::fs::create_dir_all(&dir).unwrap();
        let shader = dir.join("test.vert.spv");
        std::fs::write(&shader, [0u8; 4]).unwrap();

        let mut config = ShaderConfig::new("test.vert.spv", "test.frag.spv");
        config.search_paths = vec![
            "does/not/exist".to_string(),
            dir.to_string_lossy().into_owned(),
        ];

        let resolved = config.resolve_vertex().unwrap();
        assert_eq!(resolved, shader);

        std::fs::remove_file(&shader).ok();
        std::fs::remove_dir(&dir).ok();
    }

    /// Resolution of a missing shader reports the searched locations.
    #[test]
    fn shader_resolution_reports_missing_file() {
        let mut config = ShaderConfig::default();
        config.search_paths = vec!["does/not/exist".to_string()];
        assert!(matches!(
            config.resolve("nope.spv"),
            Err(ConfigError::NotFound(_))
        ));
    }

    /// Asset paths join the resources directory with the relative entries.
    #[test]
    fn asset_paths_join_resources_dir() {
        let config = AssetConfig::default().with_resources_dir("data");
        assert_eq!(
            config.model_path(),
            Path::new("data").join("models/viking_room.obj")
        );
        assert_eq!(
            config.texture_path(),
            Path::new("data").join("textures/viking_room.png")
        );
    }
}
