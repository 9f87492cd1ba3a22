//! Asset loading for models and textures
//!
//! File parsing is delegated to format-specific crates (`tobj` for Wavefront
//! OBJ, `image` for PNG); this module adapts their output into the engine's
//! mesh and texel types.

pub mod image;
pub mod model;

pub use self::image::ImageData;
pub use self::model::load_obj;

/// Asset loading errors
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    /// IO error while reading an asset file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// OBJ parsing failed
    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),

    /// Image decoding failed
    #[error("Image decode error: {0}")]
    Decode(#[from] ::image::ImageError),

    /// The file parsed but its contents are unusable
    #[error("Invalid asset data: {0}")]
    InvalidData(String),
}
