//! Vulkan error types
//!
//! Every fallible Vulkan operation in this crate returns [`VulkanResult`] so
//! callers can propagate failures with `?` instead of panicking.

use ash::vk;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Vulkan initialization failed before a device existed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No physical device satisfied the renderer's requirements
    #[error("No suitable GPU found: {0}")]
    NoSuitableDevice(String),

    /// No memory type matched the requested properties
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// A required format or format feature is missing on this device
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

impl From<vk::Result> for VulkanError {
    fn from(result: vk::Result) -> Self {
        Self::Api(result)
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;
