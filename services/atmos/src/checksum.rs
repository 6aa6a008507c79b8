//! Write-side checksums and response validation.
use emcsign_core::checksum::{ChecksumReader, ChecksumValue, RunningChecksum};
use emcsign_core::{Body, Error, ErrorKind, Layer, Next, NonRetryable, Result};
use http::header::RANGE;
use http::{HeaderValue, Method, StatusCode};
use log::debug;

use super::constants::*;

/// Attach a write-side checksum to an upload.
///
/// The server verifies the uploaded range against `checksum`, so the caller must
/// have fed every byte of this request (via [`RunningChecksum::append_at`]) before
/// calling. The request is marked non retryable: a partial upload can't be sent
/// again without checking what the server stored first.
pub fn attach_write_checksum(
    req: &mut http::Request<Body>,
    checksum: &RunningChecksum,
) -> Result<()> {
    let value = checksum.value().to_string();
    req.headers_mut()
        .insert(X_EMC_WSCHECKSUM, HeaderValue::from_str(&value)?);
    req.extensions_mut()
        .insert(NonRetryable("write-side checksum in flight"));
    Ok(())
}

/// ChecksumLayer validates downloaded content against the checksum the server reports.
///
/// Full `GET` responses carrying `x-emc-wschecksum` or `x-emc-content-checksum` get
/// their body wrapped, reading it fails with `ChecksumMismatch` as soon as the digest
/// disagrees. Ranged reads are passed through, a partial body can't match the
/// object checksum.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChecksumLayer;

impl Layer for ChecksumLayer {
    fn call(&self, req: http::Request<Body>, next: Next<'_>) -> Result<http::Response<Body>> {
        let validate = req.method() == Method::GET && !req.headers().contains_key(RANGE);
        let resp = next.run(req)?;
        if !validate || resp.status() != StatusCode::OK {
            return Ok(resp);
        }

        let Some(value) = resp
            .headers()
            .get(X_EMC_WSCHECKSUM)
            .or_else(|| resp.headers().get(X_EMC_CONTENT_CHECKSUM))
        else {
            return Ok(resp);
        };
        let expected: ChecksumValue = value
            .to_str()
            .map_err(Error::from)
            .and_then(|v| v.parse::<ChecksumValue>())
            .map_err(|err| {
                Error::new(
                    ErrorKind::ResponseInvalid,
                    format!("response carries an invalid checksum {value:?}"),
                )
                .with_source(err)
            })?;
        debug!("validating response body against {expected}");

        let (parts, body) = resp.into_parts();
        let len = body.content_length();
        let body = Body::from_reader(ChecksumReader::new(body.into_reader(), expected), len);
        Ok(http::Response::from_parts(parts, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emcsign_core::checksum::Algorithm;
    use emcsign_core::{HttpSend, Pipeline};
    use pretty_assertions::assert_eq;

    const CONTENT: &[u8] = b"hello world";

    #[derive(Debug)]
    struct Fixed {
        status: StatusCode,
        checksum: Option<String>,
    }

    impl HttpSend for Fixed {
        fn http_send(&self, _: http::Request<Body>) -> Result<http::Response<Body>> {
            let mut resp = http::Response::builder().status(self.status);
            if let Some(v) = &self.checksum {
                resp = resp.header(X_EMC_WSCHECKSUM, v.as_str());
            }
            Ok(resp.body(Body::from_reader(CONTENT, Some(CONTENT.len() as u64)))?)
        }
    }

    fn pipeline(status: StatusCode, checksum: Option<&str>) -> Pipeline {
        Pipeline::new(Fixed {
            status,
            checksum: checksum.map(str::to_string),
        })
        .layer(ChecksumLayer)
    }

    fn get() -> http::Request<Body> {
        http::Request::get("http://atmos.example.com/rest/namespace/foo.txt")
            .body(Body::Empty)
            .unwrap()
    }

    #[test]
    fn test_valid_checksum_passes_content() {
        let checksum = ChecksumValue::compute(CONTENT, Algorithm::Sha0).to_string();

        let resp = pipeline(StatusCode::OK, Some(&checksum)).send(get()).unwrap();
        assert_eq!(resp.into_body().collect().unwrap(), CONTENT);
    }

    #[test]
    fn test_mismatch_fails_read() {
        let resp = pipeline(
            StatusCode::OK,
            Some("SHA0/11/0000000000000000000000000000000000000000"),
        )
        .send(get())
        .unwrap();
        let err = resp.into_body().collect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }

    #[test]
    fn test_ranged_read_not_validated() {
        let mut req = get();
        req.headers_mut()
            .insert(RANGE, HeaderValue::from_static("bytes=0-10"));
        let resp = pipeline(
            StatusCode::OK,
            Some("SHA0/11/0000000000000000000000000000000000000000"),
        )
        .send(req)
        .unwrap();
        assert_eq!(resp.into_body().collect().unwrap(), CONTENT);

        let resp = pipeline(
            StatusCode::PARTIAL_CONTENT,
            Some("SHA0/11/0000000000000000000000000000000000000000"),
        )
        .send(get())
        .unwrap();
        assert_eq!(resp.into_body().collect().unwrap(), CONTENT);
    }

    #[test]
    fn test_invalid_checksum_header() {
        let err = pipeline(StatusCode::OK, Some("CRC32/abc"))
            .send(get())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
    }

    #[test]
    fn test_attach_write_checksum() {
        let mut checksum = RunningChecksum::new(Algorithm::Sha0);
        checksum.append_at(0, b"hello ").unwrap();
        checksum.append_at(6, b"world").unwrap();
        let err = checksum.append_at(6, b"again").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumOffsetMismatch);

        let mut req = http::Request::put("http://atmos.example.com/rest/namespace/foo.txt")
            .body(Body::from("world"))
            .unwrap();
        attach_write_checksum(&mut req, &checksum).unwrap();

        assert_eq!(
            req.headers()[X_EMC_WSCHECKSUM],
            "SHA0/11/9fce82c34887c1953b40b3a2883e18850c4fa8a6"
        );
        assert!(req.extensions().get::<NonRetryable>().is_some());
    }
}
