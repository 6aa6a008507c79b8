use std::fmt;

use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// The error type for emcsign operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    vendor: Option<VendorError>,
    body: Option<Bytes>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration error (missing secret key, invalid values)
    ConfigInvalid,

    /// Credentials exist but are invalid/malformed
    CredentialInvalid,

    /// Request cannot be signed or sent (missing required fields, etc.)
    RequestInvalid,

    /// Header bytes are not valid visible ASCII / UTF-8
    Encoding,

    /// Server rejected the signature we computed
    SignatureInvalid,

    /// Content digest does not match the expected checksum
    ChecksumMismatch,

    /// Checksum is anchored to a different offset than the bytes seen
    ChecksumOffsetMismatch,

    /// Application level fault returned by the storage service
    Vendor,

    /// Fault document exists but could not be parsed
    ResponseInvalid,

    /// Server refused a time-boxed request because it expired
    RequestExpired,

    /// I/O or connection failure while talking to the service
    Transport,

    /// Operation was cancelled by the caller
    Cancelled,

    /// Unexpected errors
    Unexpected,
}

/// VendorError is the structured fault reported by the storage service.
///
/// `code` is `None` when the failure did not come from the vendor's application
/// layer, for example a proxy answering `502` with an html page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorError {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Vendor error code, if the body carried one.
    pub code: Option<String>,
    /// Vendor message, or the status reason phrase.
    pub message: String,
}

impl VendorError {
    /// Parse the vendor code as an integer.
    ///
    /// Atmos uses numeric codes like `1003`.
    pub fn code_as_u32(&self) -> Option<u32> {
        self.code.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

impl fmt::Display for VendorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (code {}): {}", self.status, code, self.message),
            None => write!(f, "{}: {}", self.status, self.message),
        }
    }
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            vendor: None,
            body: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the vendor fault this error was built from.
    pub fn with_vendor(mut self, vendor: VendorError) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Attach the raw response body for diagnosis.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the vendor fault, if any.
    pub fn vendor(&self) -> Option<&VendorError> {
        self.vendor.as_ref()
    }

    /// Get the http status of the failed response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.vendor.as_ref().map(|v| v.status)
    }

    /// Get the raw response body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Check if the failure can be retried by the transport.
    ///
    /// Only I/O failures and server side (5xx) vendor errors are retryable.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Transport => true,
            ErrorKind::Vendor => self.status().is_some_and(|s| s.is_server_error()),
            _ => false,
        }
    }
}

// Convenience constructors
impl Error {
    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encoding, message)
    }

    /// Create a checksum mismatch error
    pub fn checksum_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChecksumMismatch, message)
    }

    /// Create a checksum offset mismatch error
    pub fn checksum_offset_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChecksumOffsetMismatch, message)
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Create an error of `kind` from a vendor fault.
    pub fn from_vendor(kind: ErrorKind, vendor: VendorError) -> Self {
        Self::new(kind, vendor.to_string()).with_vendor(vendor)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::Encoding => write!(f, "invalid encoding"),
            ErrorKind::SignatureInvalid => write!(f, "signature rejected"),
            ErrorKind::ChecksumMismatch => write!(f, "checksum mismatch"),
            ErrorKind::ChecksumOffsetMismatch => write!(f, "checksum offset mismatch"),
            ErrorKind::Vendor => write!(f, "service error"),
            ErrorKind::ResponseInvalid => write!(f, "invalid response"),
            ErrorKind::RequestExpired => write!(f, "request expired"),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Cancelled => write!(f, "operation cancelled"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::encoding(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::encoding(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::encoding(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::transport(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor(status: StatusCode) -> Error {
        Error::from_vendor(
            ErrorKind::Vendor,
            VendorError {
                status,
                code: Some("1001".to_string()),
                message: "server error".to_string(),
            },
        )
    }

    #[test]
    fn test_retryable() {
        assert!(Error::transport("connection reset").is_retryable());
        assert!(vendor(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(!vendor(StatusCode::NOT_FOUND).is_retryable());
        assert!(!Error::config_invalid("missing secret").is_retryable());
        assert!(!Error::checksum_mismatch("bad digest").is_retryable());
    }

    #[test]
    fn test_vendor_code_as_u32() {
        let err = vendor(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.vendor().and_then(|v| v.code_as_u32()), Some(1001));
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(
            err.to_string(),
            "500 Internal Server Error (code 1001): server error"
        );
    }

    #[test]
    fn test_io_error_is_transport() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }
}
