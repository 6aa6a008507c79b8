use emcsign_core::{ErrorKind, VendorError};
use http::StatusCode;

use super::constants::*;

/// Classify an S3 fault.
///
/// S3 reports expired presigned urls as `AccessDenied` with "Request has expired".
pub fn classify(vendor: &VendorError) -> ErrorKind {
    match vendor.code.as_deref() {
        Some(CODE_ACCESS_DENIED)
            if vendor.status == StatusCode::FORBIDDEN
                && vendor.message.to_ascii_lowercase().contains("expired") =>
        {
            ErrorKind::RequestExpired
        }
        Some(CODE_SIGNATURE_DOES_NOT_MATCH) => ErrorKind::SignatureInvalid,
        _ => ErrorKind::Vendor,
    }
}
