/// Tests for Error display and classification

use super::*;

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("device lost".to_string());
    assert_eq!(format!("{}", err), "Backend error: device lost");
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("bad format".to_string());
    assert_eq!(format!("{}", err), "Invalid resource: bad format");
}

#[test]
fn test_invalid_operation_display() {
    let err = Error::InvalidOperation("not recording".to_string());
    assert_eq!(format!("{}", err), "Invalid operation: not recording");
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no backend".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no backend");
}

#[test]
fn test_error_is_std_error() {
    fn assert_std_error<E: std::error::Error>(_: &E) {}
    assert_std_error(&Error::OutOfMemory);
}

#[test]
fn test_error_clone() {
    let err = Error::BackendError("oops".to_string());
    let cloned = err.clone();
    assert_eq!(format!("{}", err), format!("{}", cloned));
}
