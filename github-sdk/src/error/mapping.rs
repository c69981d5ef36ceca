//! Error mapping for GitHub API responses
//!
//! GitHub reports failures as `{"message": "...", "documentation_url": "..."}`.
//! These helpers normalize such responses into `ServiceError` variants.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map a GitHub error response to a ServiceError
pub fn map_github_error(status: StatusCode, json: &Value, context: &mut ErrorContext) -> ServiceError {
    context.service = "github".to_string();

    if let Some(doc) = json.get("documentation_url").and_then(|d| d.as_str()) {
        context.add("documentation_url", doc);
    }

    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown GitHub error");

    // GitHub signals primary rate limit exhaustion with 403 as well as 429
    if status == StatusCode::FORBIDDEN && message.to_lowercase().contains("rate limit") {
        return ServiceError::rate_limit(message);
    }

    by_status(status, message.to_string())
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        return map_github_error(status, &json, context);
    }

    let message = if body.is_empty() {
        status.to_string()
    } else if body.chars().count() > 100 {
        let head: String = body.chars().take(100).collect();
        format!("{}: {}...", status, head)
    } else {
        format!("{}: {}", status, body)
    };

    by_status(status, message)
}

fn by_status(status: StatusCode, message: String) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::NOT_FOUND | StatusCode::GONE => ServiceError::not_found(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::validation(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ServiceError::timeout(message),
        _ => ServiceError::service(message),
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 | 422 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 | 410 => "not_found",
        408 | 504 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_message_is_extracted() {
        let mut context = ErrorContext::new();
        let body = r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#;
        let err = map_http_error(StatusCode::NOT_FOUND, body, &mut context);

        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "Not Found"));
        assert_eq!(
            context.data.get("documentation_url").map(String::as_str),
            Some("https://docs.github.com/rest")
        );
    }

    #[test]
    fn test_forbidden_rate_limit_maps_to_rate_limit() {
        let mut context = ErrorContext::new();
        let body = r#"{"message":"API rate limit exceeded for installation ID 1."}"#;
        let err = map_http_error(StatusCode::FORBIDDEN, body, &mut context);
        assert!(matches!(err, ServiceError::RateLimit(_)));
    }

    #[test]
    fn test_plain_text_body_is_truncated() {
        let mut context = ErrorContext::new();
        let body = "x".repeat(300);
        let err = map_http_error(StatusCode::BAD_GATEWAY, &body, &mut context);
        match err {
            ServiceError::Service(message) => assert!(message.len() < 150),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_http_error() {
        assert_eq!(classify_http_error(StatusCode::NOT_FOUND), "not_found");
        assert_eq!(classify_http_error(StatusCode::TOO_MANY_REQUESTS), "rate_limit");
        assert_eq!(classify_http_error(StatusCode::INTERNAL_SERVER_ERROR), "server");
    }
}
