//! SPIR-V shader module loading
//!
//! Shader stages arrive as precompiled SPIR-V blobs. The wrapper owns the
//! module handle and hands out stage create infos for pipeline assembly.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ash::{vk, Device};

use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from SPIR-V bytecode
    pub fn from_bytes(device: Device, bytes: &[u8]) -> VulkanResult<Self> {
        // SPIR-V is a stream of u32 words.
        let (prefix, words, suffix) = unsafe { bytes.align_to::<u32>() };
        if !prefix.is_empty() || !suffix.is_empty() {
            return Err(VulkanError::InitializationFailed(
                "SPIR-V bytecode is not u32 aligned".to_string(),
            ));
        }

        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);

        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, module })
    }

    /// Load shader from a SPIR-V file
    pub fn from_file<P: AsRef<Path>>(device: Device, path: P) -> VulkanResult<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            VulkanError::InitializationFailed(format!(
                "Failed to open shader file {}: {e}",
                path.display()
            ))
        })?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            VulkanError::InitializationFailed(format!(
                "Failed to read shader file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_bytes(device, &bytes)
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Create the stage info binding this module at `stage`
    pub fn create_stage_info(
        &self,
        stage: vk::ShaderStageFlags,
        entry_point: &std::ffi::CStr,
    ) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
