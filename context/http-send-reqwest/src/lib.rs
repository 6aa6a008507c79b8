//! Blocking reqwest implementation of [`HttpSend`].
//!
//! ## Example
//!
//! ```no_run
//! use emcsign_core::{Body, ErrorLayer, Pipeline, RetryConfig, RetryLayer};
//! use emcsign_http_send_reqwest::ReqwestHttpSend;
//!
//! # fn example() -> emcsign_core::Result<()> {
//! let pipeline = Pipeline::new(ReqwestHttpSend::default())
//!     .layer(RetryLayer::new(RetryConfig::default()))
//!     .layer(ErrorLayer::default());
//!
//! let req = http::Request::get("http://127.0.0.1:9022/rest/service")
//!     .body(Body::Empty)?;
//! let resp = pipeline.send(req)?;
//! println!("server date: {:?}", resp.headers().get(http::header::DATE));
//! # Ok(())
//! # }
//! ```

use emcsign_core::{Body, Error, HttpSend, Result};
use log::debug;
use reqwest::blocking::Client;

/// ReqwestHttpSend sends requests with a blocking [`reqwest`] client.
///
/// Non 2xx responses are returned as `Ok`; only connection level failures become
/// `Transport` errors.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::blocking::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl HttpSend for ReqwestHttpSend {
    fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Body>> {
        let (parts, body) = req.into_parts();

        let body = match body {
            Body::Empty => reqwest::blocking::Body::from(Vec::new()),
            Body::Bytes(bs) => reqwest::blocking::Body::from(bs.to_vec()),
            Body::Stream(s) => match s.len() {
                Some(len) => reqwest::blocking::Body::sized(s, len),
                None => reqwest::blocking::Body::new(s),
            },
        };

        debug!("sending {} {}", parts.method, parts.uri);
        let resp = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .map_err(map_reqwest_error)?;

        let mut builder = http::Response::builder()
            .status(resp.status())
            .version(resp.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(resp.headers().clone());
        }
        let len = resp.content_length();
        Ok(builder.body(Body::from_reader(resp, len))?)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::request_invalid("failed to build http request").with_source(err);
    }
    Error::transport(format!("failed to send http request: {err}")).with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emcsign_core::ErrorKind;

    #[test]
    fn test_connection_refused_is_transport() {
        let _ = env_logger::builder().is_test(true).try_init();

        // Port 9 (discard) is almost never listening.
        let req = http::Request::get("http://127.0.0.1:9/rest/service")
            .body(Body::Empty)
            .unwrap();
        let err = ReqwestHttpSend::default().http_send(req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_retryable());
    }
}
