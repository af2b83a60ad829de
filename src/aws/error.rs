//! AWS error classification.
//!
//! Uses `ProvideErrorMetadata` to read the provider's error `.code()`
//! instead of string matching on the Debug format, with a debug-string
//! fallback for errors that reach us already stringified.

use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::operation::authorize_security_group_ingress::AuthorizeSecurityGroupIngressError;
use aws_sdk_ec2::operation::create_security_group::CreateSecurityGroupError;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesError;
use aws_sdk_ec2::operation::describe_security_groups::DescribeSecurityGroupsError;
use aws_sdk_ec2::operation::run_instances::RunInstancesError;
use aws_sdk_ec2::operation::terminate_instances::TerminateInstancesError;
use thiserror::Error;

/// Provider error categories this service reacts to.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (safe to ignore on redundant teardown)
    #[error("resource not found: {message}")]
    NotFound { message: String },

    /// Resource already exists (lost a creation race; re-query instead)
    #[error("resource already exists")]
    AlreadyExists,

    /// Generic provider error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists)
    }
}

/// Known provider error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidPermission.NotFound",
];

/// Known provider error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &["InvalidGroup.Duplicate", "InvalidPermission.Duplicate"];

/// Classify a provider error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => AwsError::AlreadyExists,
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an error from an `anyhow::Error` by extracting the provider
/// error code.
///
/// Walks the error chain looking for any EC2 operation error and reads its
/// metadata; falls back to scanning the Debug representation.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    for cause in error.chain() {
        let classified = classify_cause::<RunInstancesError>(cause)
            .or_else(|| classify_cause::<DescribeInstancesError>(cause))
            .or_else(|| classify_cause::<TerminateInstancesError>(cause))
            .or_else(|| classify_cause::<CreateSecurityGroupError>(cause))
            .or_else(|| classify_cause::<DescribeSecurityGroupsError>(cause))
            .or_else(|| classify_cause::<AuthorizeSecurityGroupIngressError>(cause));
        if let Some(err) = classified {
            return err;
        }
    }

    // Fallback: extract the code from the debug representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_aws_error(Some(&code), Some(&debug_str));
    }

    AwsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

fn classify_cause<E>(cause: &(dyn std::error::Error + 'static)) -> Option<AwsError>
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    cause.downcast_ref::<SdkError<E>>().map(|e| {
        let meta = ProvideErrorMetadata::meta(e);
        classify_aws_error(meta.code(), meta.message())
    })
}

/// Extract a known provider error code from a debug string.
fn extract_error_code(debug_str: &str) -> Option<String> {
    for code in NOT_FOUND_CODES.iter().chain(ALREADY_EXISTS_CODES) {
        if debug_str.contains(code) {
            return Some((*code).to_string());
        }
    }

    // Try to extract any code from a `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}
