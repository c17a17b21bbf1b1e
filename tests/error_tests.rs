// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use ai_completion::error::CompletionError;
use ai_completion::network::classify_error;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        CompletionError::ContextLengthExceeded("too long".to_string()),
        CompletionError::Unknown("boom".to_string()),
        CompletionError::Config("no token".to_string()),
        CompletionError::InvalidUrl("ftp://x".to_string()),
        CompletionError::InvalidNamespace("a/b".to_string()),
        CompletionError::InvalidState("receive before send".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_provider_errors_are_distinguishable() {
    let length = CompletionError::ContextLengthExceeded("m".to_string());
    let other = CompletionError::Unknown("m".to_string());
    let local = CompletionError::Config("m".to_string());

    assert!(length.is_context_length_exceeded());
    assert!(!other.is_context_length_exceeded());

    assert!(length.is_provider_error());
    assert!(other.is_provider_error());
    assert!(!local.is_provider_error());
}

#[test]
fn test_context_length_error_carries_message() {
    let error = classify_error(
        400,
        r#"{"error":{"code":"context_length_exceeded","message":"This model's maximum context length is 8192 tokens"}}"#,
    );
    assert!(error.is_context_length_exceeded());
    assert!(format!("{}", error).contains("maximum context length is 8192"));
}

#[test]
fn test_server_error_is_unknown() {
    let error = classify_error(500, r#"{"error":{"message":"The server had an error"}}"#);
    assert!(matches!(error, CompletionError::Unknown(ref m) if m == "The server had an error"));
}

#[test]
fn test_error_without_message_keeps_body() {
    let error = classify_error(429, r#"{"error":{"code":"rate_limit"}}"#);
    assert!(
        matches!(error, CompletionError::Unknown(ref m) if m == r#"HTTP 429: {"error":{"code":"rate_limit"}}"#)
    );
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: CompletionError = io.into();
    assert!(matches!(error, CompletionError::Io(_)));
    assert!(format!("{}", error).contains("read-only"));
}
