use emcsign_core::{ErrorKind, VendorError};
use http::StatusCode;

use super::constants::*;

/// Classify an Atmos fault.
///
/// Expired presigned requests come back as `403` with an "expired" message, this is
/// checked before the signature code because the server may report both.
pub fn classify(vendor: &VendorError) -> ErrorKind {
    if vendor.status == StatusCode::FORBIDDEN
        && vendor.message.to_ascii_lowercase().contains("expired")
    {
        return ErrorKind::RequestExpired;
    }
    match vendor.code_as_u32() {
        Some(CODE_SIGNATURE_MISMATCH) => ErrorKind::SignatureInvalid,
        _ => ErrorKind::Vendor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(403, Some("1032"), "The request signature we calculated does not match the signature you provided.", ErrorKind::SignatureInvalid; "signature")]
    #[test_case(403, Some("1032"), "Request has Expired", ErrorKind::RequestExpired; "expired")]
    #[test_case(404, Some("1003"), "The requested object was not found.", ErrorKind::Vendor; "not found")]
    #[test_case(500, Some("1040"), "The server is busy. Please try again", ErrorKind::Vendor; "busy")]
    #[test_case(502, None, "Bad Gateway", ErrorKind::Vendor; "proxy")]
    fn test_classify(status: u16, code: Option<&str>, message: &str, expected: ErrorKind) {
        let vendor = VendorError {
            status: StatusCode::from_u16(status).unwrap(),
            code: code.map(str::to_string),
            message: message.to_string(),
        };
        assert_eq!(classify(&vendor), expected);
    }
}
