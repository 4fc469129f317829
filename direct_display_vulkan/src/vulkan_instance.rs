/// VulkanInstance - entry, instance, instance-level loaders and validation

use ash::vk;
use direct_display::{Config, Error, PhysicalDeviceInfo, Result};
use direct_display::{dd_debug, dd_error, dd_warn};
use std::ffi::{CStr, CString};

use crate::interop_transport::SOURCE;
use crate::vulkan_convert::name_from_array;

/// Instance extensions every transport needs
pub fn base_instance_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        ash::khr::display::NAME,
        ash::khr::external_memory_capabilities::NAME,
        ash::khr::external_semaphore_capabilities::NAME,
    ]
}

/// Load the Vulkan library
pub fn load_entry() -> Result<ash::Entry> {
    unsafe {
        ash::Entry::load().map_err(|e| {
            dd_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })
    }
}

/// Names of all instance extensions the loader exposes
pub fn available_extensions(entry: &ash::Entry) -> Result<Vec<String>> {
    unsafe {
        let properties = entry.enumerate_instance_extension_properties(None).map_err(|e| {
            dd_error!(SOURCE, "Failed to enumerate instance extensions: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate instance extensions: {:?}", e))
        })?;
        Ok(properties.iter().map(|p| name_from_array(&p.extension_name)).collect())
    }
}

pub struct VulkanInstance {
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub display_loader: ash::khr::display::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create the instance with `extensions` enabled
    ///
    /// Validation is only compiled in with the `vulkan-validation` feature;
    /// `config.enable_validation` without it logs a warning.
    pub fn new(entry: &ash::Entry, config: &Config, extensions: &[&CStr]) -> Result<Self> {
        let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
            dd_error!(SOURCE, "Invalid application name: {}", e);
            Error::InitializationFailed(format!("Invalid application name: {}", e))
        })?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"DirectDisplay")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let mut extension_names: Vec<*const std::os::raw::c_char> =
            extensions.iter().map(|name| name.as_ptr()).collect();

        let validation = Self::validation_enabled(config);
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_names = if validation {
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        unsafe {
            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                dd_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let debug_utils = if validation {
                match Self::create_debug_messenger(entry, &instance) {
                    Ok(pair) => Some(pair),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            dd_debug!(SOURCE, "Vulkan instance created ({} extensions, validation: {})",
                extension_names.len(), validation);

            Ok(Self {
                surface_loader: ash::khr::surface::Instance::new(entry, &instance),
                display_loader: ash::khr::display::Instance::new(entry, &instance),
                instance,
                debug_utils,
            })
        }
    }

    fn validation_enabled(config: &Config) -> bool {
        if config.enable_validation && !cfg!(feature = "vulkan-validation") {
            dd_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
        }
        config.enable_validation && cfg!(feature = "vulkan-validation")
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::reset_validation_stats();

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                dd_error!(SOURCE, "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        Ok((debug_utils, messenger))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        Err(Error::InitializationFailed("vulkan-validation feature is disabled".to_string()))
    }

    /// Physical devices in enumeration order
    pub fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        unsafe {
            self.instance.enumerate_physical_devices().map_err(|e| {
                dd_error!(SOURCE, "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })
        }
    }

    /// Name, attached display count and device extensions of `physical_device`
    pub fn physical_device_info(&self, physical_device: vk::PhysicalDevice) -> Result<PhysicalDeviceInfo> {
        unsafe {
            let properties = self.instance.get_physical_device_properties(physical_device);
            let name = name_from_array(&properties.device_name);

            // A device whose display query fails drives no display
            let display_count = self
                .display_loader
                .get_physical_device_display_properties(physical_device)
                .map(|displays| displays.len())
                .unwrap_or(0);

            let extensions = self
                .instance
                .enumerate_device_extension_properties(physical_device)
                .map_err(|e| {
                    dd_error!(SOURCE, "Failed to enumerate device extensions for {}: {:?}", name, e);
                    Error::InitializationFailed(format!("Failed to enumerate device extensions: {:?}", e))
                })?
                .iter()
                .map(|p| name_from_array(&p.extension_name))
                .collect();

            Ok(PhysicalDeviceInfo {
                name,
                display_count,
                extensions,
            })
        }
    }

    /// Destroy the debug messenger and the instance
    ///
    /// # Safety
    ///
    /// Every object created from this instance must already be destroyed.
    pub unsafe fn destroy(&mut self) {
        if let Some((debug_utils, messenger)) = self.debug_utils.take() {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        self.instance.destroy_instance(None);
    }
}
