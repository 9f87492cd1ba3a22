//! Vulkan surface management
//!
//! Wraps the window surface handle together with the extension loader that
//! owns the query and destroy entry points.

use ash::extensions::khr;
use ash::vk;

use crate::render::vulkan::error::{VulkanError, VulkanResult};
use crate::render::vulkan::instance::VulkanInstance;
use crate::render::vulkan::window::Window;

/// Vulkan surface wrapper for presentation
pub struct Surface {
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
}

impl Surface {
    /// Create a surface for the given window
    pub fn new(instance: &VulkanInstance, window: &mut Window) -> VulkanResult<Self> {
        let surface_loader = khr::Surface::new(&instance.entry, &instance.instance);

        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| {
                VulkanError::InitializationFailed(format!("Failed to create surface: {e}"))
            })?;

        Ok(Self {
            surface_loader,
            surface,
        })
    }

    /// Get the underlying surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface loader
    pub fn loader(&self) -> &khr::Surface {
        &self.surface_loader
    }

    /// Get surface capabilities for a physical device
    pub fn capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VulkanResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Get surface formats for a physical device
    pub fn formats(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VulkanResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Get surface present modes for a physical device
    pub fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VulkanResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Check if a queue family supports presentation to this surface
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> VulkanResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family_index, self.surface)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
