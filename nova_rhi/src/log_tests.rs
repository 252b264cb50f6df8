/// Tests for log severity ordering and entry construction

use super::*;

#[test]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_entry_clone() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "nova::test".to_string(),
        message: "hello".to_string(),
        file: None,
        line: None,
    };
    let cloned = entry.clone();
    assert_eq!(cloned.severity, LogSeverity::Info);
    assert_eq!(cloned.source, "nova::test");
    assert_eq!(cloned.message, "hello");
}

#[test]
fn test_dispatch_does_not_panic() {
    // Routed through the global slot (DefaultLogger on first use)
    dispatch(LogSeverity::Debug, "nova::test", "dispatch smoke test".to_string());
    dispatch_detailed(
        LogSeverity::Error,
        "nova::test",
        "detailed dispatch smoke test".to_string(),
        Some(file!()),
        Some(line!()),
    );
}

#[test]
fn test_rhi_err_produces_backend_error() {
    let err = crate::rhi_err!("nova::test", "reason code {}", 42);
    match err {
        crate::nova::Error::BackendError(msg) => assert_eq!(msg, "reason code 42"),
        other => panic!("Expected BackendError, got {:?}", other),
    }
}

#[test]
fn test_rhi_bail_returns_err() {
    fn failing() -> crate::nova::Result<()> {
        crate::rhi_bail!("nova::test", "bailed with {}", "detail");
    }
    let result = failing();
    match result {
        Err(crate::nova::Error::BackendError(msg)) => assert!(msg.contains("bailed")),
        _ => panic!("Expected BackendError"),
    }
}
