/// Tests for renderer configuration and the backend registry

use super::*;

#[test]
fn test_config_defaults() {
    let config = RendererConfig::default();
    assert_eq!(config.app_name, "Nova Application");
    assert_eq!(config.frames_in_flight, 2);
    assert!(config.staging_heap_size > 0);
}

#[test]
fn test_registry_unknown_backend_is_configuration_error() {
    let registry = BackendRegistry {
        backends: HashMap::new(),
    };
    // No window is needed to observe the lookup failure path
    let result = registry.backends.get("NoSuchBackend");
    assert!(result.is_none());
}

#[test]
fn test_global_registry_initializes() {
    let registry = backend_registry();
    let guard = registry.lock().unwrap();
    assert!(guard.is_some());
}

#[test]
fn test_stats_default_is_zeroed() {
    let stats = RendererStats::default();
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.command_buffers_submitted, 0);
    assert_eq!(stats.gpu_memory_used, 0);
}
