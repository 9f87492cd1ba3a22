//! Physical device selection and logical device creation
//!
//! A candidate GPU is accepted when it satisfies a declarative
//! [`DeviceRequirements`] set: graphics and present queue families, required
//! device extensions, a non-empty surface format/present-mode list, and the
//! requested feature flags. The first suitable device wins.

use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::c_char;

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device, Instance};

use crate::render::vulkan::error::{VulkanError, VulkanResult};
use crate::render::vulkan::instance::fixed_name_to_string;
use crate::render::vulkan::surface::Surface;
use crate::render::vulkan::swapchain::SwapchainSupport;

/// Requirements every candidate physical device must satisfy
pub struct DeviceRequirements {
    /// Device extensions that must be available and get enabled
    pub extensions: Vec<&'static CStr>,
    /// Whether anisotropic sampling must be supported
    pub sampler_anisotropy: bool,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            extensions: vec![SwapchainLoader::name()],
            sampler_anisotropy: true,
        }
    }
}

/// Resolved queue family indices for a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Index of the graphics-capable queue family
    pub graphics: u32,
    /// Index of the family that can present to the surface
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Whether graphics and present use the same family
    pub fn shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Both indices, deduplicated
    pub fn unique(&self) -> HashSet<u32> {
        [self.graphics, self.present].into_iter().collect()
    }
}

/// Find the first graphics family and the first present-capable family
///
/// `present_support[i]` reports whether family `i` can present to the target
/// surface. The two indices may coincide.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    present_support: &[bool],
) -> Option<QueueFamilyIndices> {
    let graphics = families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?;
    let present = present_support.iter().position(|&supported| supported)?;
    Some(QueueFamilyIndices {
        graphics: graphics as u32,
        present: present as u32,
    })
}

/// Whether every required extension appears in an enumerated extension list
pub fn extensions_supported(
    available: &[vk::ExtensionProperties],
    required: &[&CStr],
) -> bool {
    required.iter().all(|req| {
        available
            .iter()
            .any(|ext| fixed_name_to_string(&ext.extension_name).as_bytes() == req.to_bytes())
    })
}

/// Highest sample count usable for both color and depth attachments
pub fn max_usable_sample_count(
    properties: &vk::PhysicalDeviceProperties,
) -> vk::SampleCountFlags {
    let counts = properties.limits.framebuffer_color_sample_counts
        & properties.limits.framebuffer_depth_sample_counts;

    for candidate in [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ] {
        if counts.contains(candidate) {
            return candidate;
        }
    }
    vk::SampleCountFlags::TYPE_1
}

/// A physical device that passed the suitability check
pub struct PhysicalDeviceSelection {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory heaps and types for allocation decisions
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Resolved graphics/present queue families
    pub queue_families: QueueFamilyIndices,
    /// Highest sample count usable for MSAA on this device
    pub max_msaa_samples: vk::SampleCountFlags,
}

impl PhysicalDeviceSelection {
    /// Select the first physical device satisfying `requirements`
    pub fn select(
        instance: &Instance,
        surface: &Surface,
        requirements: &DeviceRequirements,
    ) -> VulkanResult<Self> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        for device in devices {
            match Self::evaluate(instance, device, surface, requirements) {
                Ok(selection) => {
                    log::info!(
                        "Selected GPU: {} (max MSAA {:?})",
                        selection.device_name(),
                        selection.max_msaa_samples
                    );
                    return Ok(selection);
                }
                Err(reason) => {
                    log::debug!("Skipping physical device: {reason}");
                }
            }
        }

        Err(VulkanError::NoSuitableDevice(
            "no physical device satisfies the renderer requirements".to_string(),
        ))
    }

    fn evaluate(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: &Surface,
        requirements: &DeviceRequirements,
    ) -> VulkanResult<Self> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(device) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let mut present_support = Vec::with_capacity(families.len());
        for index in 0..families.len() as u32 {
            present_support.push(surface.supports_present(device, index)?);
        }

        let queue_families = find_queue_families(&families, &present_support).ok_or_else(|| {
            VulkanError::NoSuitableDevice(
                "missing graphics or present queue family".to_string(),
            )
        })?;

        let available_extensions = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };
        if !extensions_supported(&available_extensions, &requirements.extensions) {
            return Err(VulkanError::NoSuitableDevice(
                "required device extensions not supported".to_string(),
            ));
        }

        // With the swapchain extension present the surface must still report
        // at least one format and one present mode.
        if !SwapchainSupport::query(surface, device)?.is_adequate() {
            return Err(VulkanError::NoSuitableDevice(
                "surface reports no formats or present modes".to_string(),
            ));
        }

        if requirements.sampler_anisotropy && features.sampler_anisotropy != vk::TRUE {
            return Err(VulkanError::NoSuitableDevice(
                "sampler anisotropy not supported".to_string(),
            ));
        }

        let max_msaa_samples = max_usable_sample_count(&properties);

        Ok(Self {
            device,
            properties,
            features,
            memory_properties,
            queue_families,
            max_msaa_samples,
        })
    }

    /// Human-readable device name from the driver
    pub fn device_name(&self) -> String {
        fixed_name_to_string(&self.properties.device_name)
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Queue families the queues were created from
    pub queue_families: QueueFamilyIndices,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create a logical device with one graphics and one present queue
    pub fn new(
        instance: &Instance,
        selection: &PhysicalDeviceSelection,
        requirements: &DeviceRequirements,
    ) -> VulkanResult<Self> {
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = selection
            .queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&[1.0])
                    .build()
            })
            .collect();

        let extension_ptrs: Vec<*const c_char> = requirements
            .extensions
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();

        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(requirements.sampler_anisotropy)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&device_features);

        let device = unsafe {
            instance
                .create_device(selection.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let graphics_queue =
            unsafe { device.get_device_queue(selection.queue_families.graphics, 0) };
        let present_queue =
            unsafe { device.get_device_queue(selection.queue_families.present, 0) };

        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            queue_families: selection.queue_families,
            swapchain_loader,
        })
    }

    /// Block until all queues on this device finish their work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle().map_err(VulkanError::Api) }
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn extension(name: &str) -> vk::ExtensionProperties {
        let mut props = vk::ExtensionProperties::default();
        for (i, byte) in name.bytes().enumerate() {
            props.extension_name[i] = byte as c_char;
        }
        props
    }

    /// Graphics and present resolve to the same family when it offers both.
    #[test]
    fn shared_family_resolves_both_roles() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let indices = find_queue_families(&families, &[true]).unwrap();
        assert_eq!(indices.graphics, 0);
        assert_eq!(indices.present, 0);
        assert!(indices.shared());
        assert_eq!(indices.unique().len(), 1);
    }

    /// Split graphics/present families resolve to distinct indices.
    #[test]
    fn split_families_resolve_independently() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        // Only the transfer-only family can present.
        let indices = find_queue_families(&families, &[true, false, false]).unwrap();
        assert_eq!(indices.graphics, 1);
        assert_eq!(indices.present, 0);
        assert!(!indices.shared());
        assert_eq!(indices.unique().len(), 2);
    }

    /// A device without a graphics family or without present support fails.
    #[test]
    fn missing_role_yields_none() {
        let no_graphics = [family(vk::QueueFlags::COMPUTE)];
        assert!(find_queue_families(&no_graphics, &[true]).is_none());

        let no_present = [family(vk::QueueFlags::GRAPHICS)];
        assert!(find_queue_families(&no_present, &[false]).is_none());
    }

    /// Extension matching requires every required name to be present.
    #[test]
    fn extension_check_requires_all() {
        let available = [extension("VK_KHR_swapchain"), extension("VK_KHR_maintenance1")];
        let swapchain = [SwapchainLoader::name()];
        assert!(extensions_supported(&available, &swapchain));

        let missing = [extension("VK_KHR_maintenance1")];
        assert!(!extensions_supported(&missing, &swapchain));
        assert!(extensions_supported(&missing, &[]));
    }

    fn properties_with_samples(
        color: vk::SampleCountFlags,
        depth: vk::SampleCountFlags,
    ) -> vk::PhysicalDeviceProperties {
        let mut properties = vk::PhysicalDeviceProperties::default();
        properties.limits.framebuffer_color_sample_counts = color;
        properties.limits.framebuffer_depth_sample_counts = depth;
        properties
    }

    /// The usable MSAA count is the highest supported by both color and depth.
    #[test]
    fn msaa_count_is_limited_by_both_attachments() {
        let all = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8;
        let depth_limited = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4;

        let properties = properties_with_samples(all, depth_limited);
        assert_eq!(
            max_usable_sample_count(&properties),
            vk::SampleCountFlags::TYPE_4
        );
    }

    /// A device with no common multisample support falls back to one sample.
    #[test]
    fn msaa_count_falls_back_to_single_sample() {
        let properties = properties_with_samples(
            vk::SampleCountFlags::TYPE_1,
            vk::SampleCountFlags::TYPE_1,
        );
        assert_eq!(
            max_usable_sample_count(&properties),
            vk::SampleCountFlags::TYPE_1
        );
    }
}
