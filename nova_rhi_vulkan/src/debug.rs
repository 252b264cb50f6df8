/// Vulkan Debug Messenger - Handles validation layer messages with colored output
///
/// This module provides a debug messenger callback for Vulkan validation
/// layers with colored console output and a severity filter taken from the
/// renderer configuration.

use ash::vk;
use colored::*;
use nova_rhi::nova::rhi::DebugSeverity;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Global debug configuration (shared across callbacks; the callback has no
/// user-data channel back into safe code worth the plumbing)
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Count of validation errors seen since init (tests assert on this)
static ERROR_COUNT: AtomicU32 = AtomicU32::new(0);

/// Debug configuration for the callback
#[derive(Clone)]
pub struct Config {
    pub severity: DebugSeverity,
}

/// Initialize debug configuration
pub fn init_debug_config(config: Config) {
    ERROR_COUNT.store(0, Ordering::Relaxed);
    *DEBUG_CONFIG.lock().unwrap() = Some(config);
}

/// Number of validation errors reported since `init_debug_config`
pub fn validation_error_count() -> u32 {
    ERROR_COUNT.load(Ordering::Relaxed)
}

/// Severity flags matching the configured filter
pub fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Debug messenger callback routed through the validation layers
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }

    // The messenger is created with matching severity flags; the config
    // check also covers messengers created before a severity change
    let configured = DEBUG_CONFIG
        .lock()
        .ok()
        .and_then(|config| config.as_ref().map(|c| c.severity));
    if let Some(severity) = configured {
        if !severity_flags(severity).contains(message_severity) {
            return vk::FALSE;
        }
    }

    let data = &*callback_data;
    let message = if data.p_message.is_null() {
        String::from("<no message>")
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy().into_owned()
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "general",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "performance",
        _ => "unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
            eprintln!("{} [{}] {}", "[VULKAN ERROR]".red().bold(), type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            eprintln!("{} [{}] {}", "[VULKAN WARN ]".yellow(), type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            println!("{} [{}] {}", "[VULKAN INFO ]".green(), type_str, message);
        }
        _ => {
            println!("{} [{}] {}", "[VULKAN TRACE]".bright_black(), type_str, message);
        }
    }

    // Returning FALSE tells the layers not to abort the triggering call
    vk::FALSE
}
