use std::io::Read;

use bytes::Bytes;
use http::StatusCode;
use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{Body, Error, ErrorKind, Layer, Next, Result, VendorError};

/// Max bytes read from an error response body.
const MAX_FAULT_BODY: u64 = 64 * 1024;

/// Classifier picks the [`ErrorKind`] for a vendor fault.
///
/// Services use it to tell signature and expiry failures apart from other faults.
pub type Classifier = fn(&VendorError) -> ErrorKind;

/// Classify every fault as a plain `Vendor` error.
pub fn classify_vendor(_: &VendorError) -> ErrorKind {
    ErrorKind::Vendor
}

/// Turn a response status and body into `Ok` or a `Vendor` error.
pub fn translate(status: StatusCode, body: &[u8]) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let vendor = parse_vendor_error(status, body)?;
    Err(Error::from_vendor(ErrorKind::Vendor, vendor).with_body(Bytes::copy_from_slice(body)))
}

/// Build a [`VendorError`] from a failed response.
///
/// A body whose root element is `Error` is a fault document and its `Code` and
/// `Message` children are used; namespaces are ignored. Anything else (empty,
/// html from a proxy, plain text) yields a fault without code and with the reason
/// phrase as message. A fault document that can't be parsed is a `ResponseInvalid`
/// error carrying the raw body.
pub fn parse_vendor_error(status: StatusCode, body: &[u8]) -> Result<VendorError> {
    let reason = status.canonical_reason().unwrap_or("Unknown Status");

    let (code, message) = match parse_fault(body) {
        Ok(Some(fault)) => fault,
        Ok(None) => (None, None),
        Err(err) => {
            return Err(Error::new(
                ErrorKind::ResponseInvalid,
                format!("failed to parse fault document of {status} response"),
            )
            .with_source(err)
            .with_vendor(VendorError {
                status,
                code: None,
                message: reason.to_string(),
            })
            .with_body(Bytes::copy_from_slice(body)));
        }
    };

    Ok(VendorError {
        status,
        code,
        message: message.unwrap_or_else(|| reason.to_string()),
    })
}

#[derive(Clone, Copy)]
enum Field {
    Code,
    Message,
}

type Fault = (Option<String>, Option<String>);

/// Returns `None` if the body is not a fault document.
fn parse_fault(body: &[u8]) -> anyhow::Result<Option<Fault>> {
    if !body.trim_ascii_start().starts_with(b"<") {
        return Ok(None);
    }

    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut seen_root = false;
    let mut depth = 0usize;
    let mut field = None;
    let mut code: Option<String> = None;
    let mut message: Option<String> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            // Garbage before any element is not a fault document, unless the body
            // announced itself as xml or opened an `Error` root.
            Err(_) if !seen_root && !looks_like_fault(body) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    if e.local_name().as_ref() != b"Error" {
                        return Ok(None);
                    }
                    seen_root = true;
                } else if depth == 2 {
                    field = match e.local_name().as_ref() {
                        b"Code" => Some(Field::Code),
                        b"Message" => Some(Field::Message),
                        _ => None,
                    };
                }
            }
            // `<Error/>` carries neither code nor message.
            Event::Empty(_) if depth == 0 => return Ok(None),
            Event::Text(t) if depth == 2 => {
                let text = t.unescape()?;
                push_text(field, &text, &mut code, &mut message);
            }
            Event::CData(t) if depth == 2 => {
                let text = String::from_utf8(t.into_inner().into_owned())?;
                push_text(field, &text, &mut code, &mut message);
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    field = None;
                }
                if depth == 0 && seen_root {
                    break;
                }
            }
            Event::Eof => {
                if depth > 0 {
                    anyhow::bail!("fault document ends inside an element");
                }
                if !seen_root {
                    return Ok(None);
                }
                break;
            }
            _ => {}
        }
    }

    let code = code.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let message = message
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if code.is_none() && message.is_none() {
        return Ok(None);
    }
    Ok(Some((code, message)))
}

/// Whether the body starts with an xml prolog or an `Error` root tag.
fn looks_like_fault(body: &[u8]) -> bool {
    let body = body.trim_ascii_start();
    if body.starts_with(b"<?xml") {
        return true;
    }
    let Some(tag) = body.strip_prefix(b"<") else {
        return false;
    };
    let end = tag
        .iter()
        .position(|b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/'))
        .unwrap_or(tag.len());
    let name = &tag[..end];
    let local = name.rsplit(|b| *b == b':').next().unwrap_or(name);
    local == b"Error"
}

fn push_text(
    field: Option<Field>,
    text: &str,
    code: &mut Option<String>,
    message: &mut Option<String>,
) {
    let target = match field {
        Some(Field::Code) => code,
        Some(Field::Message) => message,
        None => return,
    };
    target.get_or_insert_with(String::new).push_str(text);
}

/// ErrorLayer turns non 2xx responses into errors.
///
/// Successful responses pass through untouched. For failures the body is read,
/// parsed with [`parse_vendor_error`] and classified.
///
/// At most 64 KiB of a fault body is read. A fault document longer than that is
/// cut off and surfaces as `ResponseInvalid` carrying the truncated body.
#[derive(Clone, Copy, Debug)]
pub struct ErrorLayer {
    classify: Classifier,
}

impl Default for ErrorLayer {
    fn default() -> Self {
        Self::new(classify_vendor)
    }
}

impl ErrorLayer {
    /// Create an error layer with a service specific classifier.
    pub fn new(classify: Classifier) -> Self {
        Self { classify }
    }
}

impl Layer for ErrorLayer {
    fn call(&self, req: http::Request<Body>, next: Next<'_>) -> Result<http::Response<Body>> {
        let resp = next.run(req)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let mut body = Vec::new();
        resp.into_body()
            .into_reader()
            .take(MAX_FAULT_BODY)
            .read_to_end(&mut body)
            .map_err(crate::checksum::from_io_error)?;

        let vendor = parse_vendor_error(status, &body)?;
        let kind = (self.classify)(&vendor);
        debug!("request failed with {vendor}, classified as {kind}");
        Err(Error::from_vendor(kind, vendor).with_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpSend, Pipeline};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_atmos_fault() {
        let body = b"<Error><Code>1003</Code><Message>Not Found</Message></Error>";
        let v = parse_vendor_error(StatusCode::NOT_FOUND, body).unwrap();
        assert_eq!(
            v,
            VendorError {
                status: StatusCode::NOT_FOUND,
                code: Some("1003".to_string()),
                message: "Not Found".to_string(),
            }
        );
        assert_eq!(v.code_as_u32(), Some(1003));
    }

    #[test]
    fn test_html_body_is_not_a_fault() {
        let body = b"<!DOCTYPE html>\n<html><body><h1>Bad Gateway</h1><br></body></html>";
        let v = parse_vendor_error(StatusCode::BAD_GATEWAY, body).unwrap();
        assert_eq!(v.status, StatusCode::BAD_GATEWAY);
        assert_eq!(v.code, None);
        assert_eq!(v.message, "Bad Gateway");
    }

    #[test]
    fn test_empty_and_text_bodies() {
        let v = parse_vendor_error(StatusCode::SERVICE_UNAVAILABLE, b"").unwrap();
        assert_eq!(v.code, None);
        assert_eq!(v.message, "Service Unavailable");

        let v = parse_vendor_error(StatusCode::FORBIDDEN, b"go away").unwrap();
        assert_eq!(v.code, None);
        assert_eq!(v.message, "Forbidden");
    }

    #[test]
    fn test_namespaced_fault() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<s3:Error xmlns:s3="http://s3.amazonaws.com/doc/2006-03-01/">
  <s3:Code>NoSuchKey</s3:Code>
  <s3:Message>The specified key does not exist.</s3:Message>
  <s3:Key>photos/puppy.jpg</s3:Key>
</s3:Error>"#;
        let v = parse_vendor_error(StatusCode::NOT_FOUND, body).unwrap();
        assert_eq!(v.code.as_deref(), Some("NoSuchKey"));
        assert_eq!(v.message, "The specified key does not exist.");
    }

    #[test]
    fn test_escaped_message() {
        let body = b"<Error><Code>1032</Code><Message>sig &amp; date mismatch</Message></Error>";
        let v = parse_vendor_error(StatusCode::FORBIDDEN, body).unwrap();
        assert_eq!(v.message, "sig & date mismatch");
    }

    #[test]
    fn test_malformed_fault() {
        let body = b"<Error><Code>1003</Code><Message>Not Found</Code></Error>";
        let err = parse_vendor_error(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.body().unwrap().as_ref(), body.as_slice());
    }

    #[test]
    fn test_malformed_fault_root() {
        let body = b"<?xml version=\"1.0\"?>\n<Error xmlns=\"urn:x><Code>1003</Code><Message>Not Found</Message></Error>";
        let err = parse_vendor_error(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
        assert_eq!(err.body().unwrap().as_ref(), body.as_slice());

        let body = b"<s3:Error xmlns:s3=\"urn:x><s3:Code>NoSuchKey</s3:Code></s3:Error>";
        let err = parse_vendor_error(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
    }

    #[test]
    fn test_truncated_fault() {
        let body = b"<Error><Code>1003</Code><Message>Not Fo";
        let err = parse_vendor_error(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
    }

    #[test]
    fn test_translate() {
        assert!(translate(StatusCode::OK, b"").is_ok());

        let err = translate(
            StatusCode::NOT_FOUND,
            b"<Error><Code>1003</Code><Message>Not Found</Message></Error>",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Vendor);
        assert_eq!(err.vendor().unwrap().code.as_deref(), Some("1003"));
        assert!(!err.is_retryable());
    }

    #[derive(Debug)]
    struct Fixed(StatusCode, &'static str);

    impl HttpSend for Fixed {
        fn http_send(&self, _: http::Request<Body>) -> Result<http::Response<Body>> {
            let mut resp = http::Response::new(Body::from(self.1));
            *resp.status_mut() = self.0;
            Ok(resp)
        }
    }

    fn get() -> http::Request<Body> {
        http::Request::get("http://localhost/rest/namespace/foo.txt")
            .body(Body::Empty)
            .unwrap()
    }

    #[test]
    fn test_layer_passes_success() {
        let pipeline = Pipeline::new(Fixed(StatusCode::OK, "content")).layer(ErrorLayer::default());
        let resp = pipeline.send(get()).unwrap();
        assert_eq!(resp.into_body().collect().unwrap(), "content");
    }

    #[test]
    fn test_layer_classifies_faults() {
        fn classify(v: &VendorError) -> ErrorKind {
            match v.code_as_u32() {
                Some(1032) => ErrorKind::SignatureInvalid,
                _ => ErrorKind::Vendor,
            }
        }

        let pipeline = Pipeline::new(Fixed(
            StatusCode::FORBIDDEN,
            "<Error><Code>1032</Code><Message>There was a mismatch between the signature in the request and the signature computed by the server.</Message></Error>",
        ))
        .layer(ErrorLayer::new(classify));

        let err = pipeline.send(get()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.body().is_some());
    }

    #[derive(Debug)]
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(crate::checksum::into_io_error(Error::checksum_mismatch(
                "fault body checksum mismatch",
            )))
        }
    }

    /// Responds with the given body, or a body whose read fails when `None`.
    #[derive(Debug)]
    struct Owned(StatusCode, Option<Bytes>);

    impl HttpSend for Owned {
        fn http_send(&self, _: http::Request<Body>) -> Result<http::Response<Body>> {
            let body = match &self.1 {
                Some(bs) => Body::Bytes(bs.clone()),
                None => Body::from_reader(Broken, None),
            };
            let mut resp = http::Response::new(body);
            *resp.status_mut() = self.0;
            Ok(resp)
        }
    }

    #[test]
    fn test_layer_keeps_body_read_error_kind() {
        let pipeline = Pipeline::new(Owned(StatusCode::NOT_FOUND, None))
            .layer(ErrorLayer::default());
        let err = pipeline.send(get()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_layer_oversized_fault_is_invalid() {
        let message = "x".repeat(MAX_FAULT_BODY as usize);
        let body = format!("<Error><Code>1003</Code><Message>{message}</Message></Error>");
        let pipeline = Pipeline::new(Owned(StatusCode::NOT_FOUND, Some(Bytes::from(body))))
            .layer(ErrorLayer::default());

        let err = pipeline.send(get()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
        assert_eq!(err.body().unwrap().len() as u64, MAX_FAULT_BODY);
    }

    #[test]
    fn test_layer_marks_5xx_retryable() {
        let pipeline = Pipeline::new(Fixed(StatusCode::BAD_GATEWAY, "<html>proxy</html>"))
            .layer(ErrorLayer::default());
        let err = pipeline.send(get()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Vendor);
        assert!(err.is_retryable());
        assert_eq!(err.vendor().unwrap().code, None);
    }
}
