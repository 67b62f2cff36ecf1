use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::error::ProvideErrorMetadata;
use tracing::debug;

/// Load AWS SDK configuration pinned to an explicit region
///
/// Credentials come from the default chain (env vars, profile, instance role, ...).
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    debug!("Loading AWS SDK config for region {}", region);
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Service error as `<code>: <message>`, the way the AWS CLI reports a rejected call
///
/// Falls back to the bare message when the error carries no code (timeouts,
/// dispatch failures, ...).
pub fn format_service_error<E>(err: &E) -> String
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    let message = format_sdk_error(err);
    match err.code() {
        Some(code) => format!("{}: {}", code, message),
        None => message,
    }
}

/// Message of an STS or CloudFormation error, taken from its Debug output
///
/// `Display` on SDK errors only says "service error"; the service's own text
/// sits in the `message: Some("...")` field of the error metadata.
pub fn format_sdk_error<E: std::fmt::Debug>(err: &E) -> String {
    let debug_str = format!("{:?}", err);

    // Pattern: message: Some("actual error message")
    if let Some(start) = debug_str.find("message: Some(\"") {
        let start = start + 15; // length of 'message: Some("'
        if let Some(end) = debug_str[start..].find("\")") {
            return debug_str[start..start + end].to_string();
        }
    }

    // Fallback: a Message field as in a raw JSON/XML response body
    if let Some(start) = debug_str.find("\"Message\":\"") {
        let start = start + 11; // length of '"Message":"'
        if let Some(end) = debug_str[start..].find('"') {
            return debug_str[start..start + end].to_string();
        }
    }

    if debug_str.len() > 200 {
        let cut = (0..=200)
            .rev()
            .find(|i| debug_str.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &debug_str[..cut])
    } else {
        debug_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    #[allow(dead_code)]
    struct FakeServiceError {
        code: Option<String>,
        message: Option<String>,
    }

    #[test]
    fn test_format_sdk_error_extracts_message() {
        let err = FakeServiceError {
            code: Some("AccessDenied".to_string()),
            message: Some("User is not authorized to perform: sts:AssumeRole".to_string()),
        };
        assert_eq!(
            format_sdk_error(&err),
            "User is not authorized to perform: sts:AssumeRole"
        );
    }

    #[test]
    fn test_format_sdk_error_without_message_keeps_debug_output() {
        let err = FakeServiceError {
            code: Some("Throttling".to_string()),
            message: None,
        };
        let formatted = format_sdk_error(&err);
        assert!(formatted.contains("Throttling"));
        assert!(formatted.contains("message: None"));
    }

    #[test]
    fn test_format_service_error_prefixes_code() {
        use aws_sdk_sts::error::ErrorMetadata;
        use aws_sdk_sts::operation::assume_role::AssumeRoleError;

        let err = AssumeRoleError::generic(
            ErrorMetadata::builder()
                .code("AccessDenied")
                .message("User is not authorized to perform: sts:AssumeRole")
                .build(),
        );
        assert_eq!(
            format_service_error(&err),
            "AccessDenied: User is not authorized to perform: sts:AssumeRole"
        );
    }

    #[test]
    fn test_format_service_error_without_code() {
        use aws_sdk_sts::error::ErrorMetadata;
        use aws_sdk_sts::operation::assume_role::AssumeRoleError;

        let err = AssumeRoleError::generic(
            ErrorMetadata::builder().message("Rate exceeded").build(),
        );
        assert_eq!(format_service_error(&err), "Rate exceeded");
    }

    #[test]
    fn test_format_sdk_error_truncates_long_output() {
        let err = "x".repeat(500);
        let formatted = format_sdk_error(&err);
        assert!(formatted.ends_with("..."));
        assert_eq!(formatted.len(), 203);
    }
}
