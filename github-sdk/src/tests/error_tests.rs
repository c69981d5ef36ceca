//! Tests for error handling functionality
//!
//! These tests verify that the error system in the SDK works correctly.

#[cfg(test)]
mod tests {
    use crate::error::{ErrorContext, ServiceError};

    #[test]
    fn test_service_error_creation() {
        let network_err = ServiceError::network("Connection failed");
        let auth_err = ServiceError::authentication("Invalid credentials");
        let cancelled = ServiceError::cancelled("shutdown");

        assert_eq!(network_err.to_string(), "Network error: Connection failed");
        assert_eq!(auth_err.to_string(), "Authentication error: Invalid credentials");
        assert_eq!(cancelled.to_string(), "Cancelled: shutdown");
        assert!(cancelled.is_cancelled());
        assert!(!network_err.is_cancelled());
    }

    #[test]
    fn test_error_context() {
        let err = ServiceError::not_found("Not Found").with_context(
            ErrorContext::for_service("github")
                .status_code(404)
                .endpoint("repos/octo/widgets/contents/go.mod"),
        );

        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.endpoint(), Some("repos/octo/widgets/contents/go.mod"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: Not Found");
    }

    #[test]
    fn test_nested_context_keeps_root() {
        let err = ServiceError::timeout("slow")
            .with_context(ErrorContext::new())
            .with_context(ErrorContext::new().status_code(504));

        assert!(matches!(err.root(), ServiceError::Timeout(_)));
        assert_eq!(err.status_code(), Some(504));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ServiceError = parse.into();
        assert!(matches!(err.root(), ServiceError::Parsing(_)));
    }
}
