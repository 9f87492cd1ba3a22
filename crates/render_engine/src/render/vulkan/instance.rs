//! Vulkan instance creation and validation tooling
//!
//! Owns the loaded Vulkan entry point, the instance handle, and the optional
//! debug messenger. Validation layers are a runtime choice: when requested
//! but not installed, the instance is created without them and a warning is
//! logged.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};

use crate::render::vulkan::error::{VulkanError, VulkanResult};

/// Name of the Khronos validation layer
pub const VALIDATION_LAYER_NAME: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<DebugUtils>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    /// Create a Vulkan instance with the given surface extensions
    ///
    /// `required_extensions` is the windowing library's surface extension
    /// list. The debug-utils extension and the Khronos validation layer are
    /// added on top when `enable_validation` is set and the layer is
    /// actually installed.
    pub fn new(
        app_name: &str,
        required_extensions: &[String],
        enable_validation: bool,
    ) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e:?}"))
        })?;

        let validation_active = if enable_validation {
            let available = entry
                .enumerate_instance_layer_properties()
                .map_err(VulkanError::Api)?;
            if layer_supported(&available, VALIDATION_LAYER_NAME) {
                log::info!("Validation layers enabled");
                true
            } else {
                log::warn!(
                    "Validation layers requested but {VALIDATION_LAYER_NAME} is not installed; continuing without them"
                );
                false
            }
        } else {
            false
        };

        let app_name_cstr = CString::new(app_name).map_err(|_| {
            VulkanError::InitializationFailed("application name contains a NUL byte".to_string())
        })?;
        let engine_name_cstr = CString::new("render_engine").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let cstr_extensions: Vec<CString> = required_extensions
            .iter()
            .map(|ext| {
                CString::new(ext.as_str()).map_err(|_| {
                    VulkanError::InitializationFailed(format!(
                        "extension name {ext:?} contains a NUL byte"
                    ))
                })
            })
            .collect::<VulkanResult<_>>()?;
        let mut extensions: Vec<*const c_char> =
            cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();
        if validation_active {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if validation_active {
            vec![CString::new(VALIDATION_LAYER_NAME).unwrap()]
        } else {
            vec![]
        };
        let layer_names_ptrs: Vec<*const c_char> =
            layer_names.iter().map(|name| name.as_ptr()).collect();

        let mut validation_features = vk::ValidationFeaturesEXT::builder()
            .enabled_validation_features(&[
                vk::ValidationFeatureEnableEXT::SYNCHRONIZATION_VALIDATION,
                vk::ValidationFeatureEnableEXT::BEST_PRACTICES,
            ]);

        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names_ptrs);
        if validation_active {
            create_info = create_info.push_next(&mut validation_features);
        }

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let (debug_utils, debug_messenger) = if validation_active {
            let debug_utils = DebugUtils::new(&entry, &instance);
            let debug_messenger = Self::setup_debug_messenger(&debug_utils)?;
            (Some(debug_utils), Some(debug_messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Whether the debug messenger was installed
    pub fn validation_active(&self) -> bool {
        self.debug_messenger.is_some()
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(debug_messenger)) =
                (&self.debug_utils, &self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(*debug_messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let callback_data = *callback_data;
    let message = CStr::from_ptr(callback_data.p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Convert a fixed-size NUL-terminated name field to an owned string
///
/// Vulkan property structs store names as fixed `[c_char; N]` arrays.
pub(crate) fn fixed_name_to_string(raw: &[c_char]) -> String {
    raw.iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8 as char)
        .collect()
}

/// Whether `name` appears in an enumerated layer list
pub fn layer_supported(available: &[vk::LayerProperties], name: &str) -> bool {
    available
        .iter()
        .any(|layer| fixed_name_to_string(&layer.layer_name) == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (i, byte) in name.bytes().enumerate() {
            props.layer_name[i] = byte as c_char;
        }
        props
    }

    /// The validation layer is recognized when present in the layer list.
    #[test]
    fn finds_layer_by_name() {
        let available = [layer("VK_LAYER_MESA_overlay"), layer(VALIDATION_LAYER_NAME)];
        assert!(layer_supported(&available, VALIDATION_LAYER_NAME));
    }

    /// An absent layer and an empty list both report unsupported.
    #[test]
    fn rejects_missing_layer() {
        let available = [layer("VK_LAYER_MESA_overlay")];
        assert!(!layer_supported(&available, VALIDATION_LAYER_NAME));
        assert!(!layer_supported(&[], VALIDATION_LAYER_NAME));
    }

    /// A layer name that merely shares a prefix does not match.
    #[test]
    fn prefix_does_not_match() {
        let available = [layer("VK_LAYER_KHRONOS_validation_extra")];
        assert!(!layer_supported(&available, VALIDATION_LAYER_NAME));
    }

    /// Name conversion stops at the first NUL and drops the padding.
    #[test]
    fn fixed_name_conversion_strips_padding() {
        let props = layer("short");
        assert_eq!(fixed_name_to_string(&props.layer_name), "short");
        assert_eq!(fixed_name_to_string(&[0; 8]), "");
    }
}
