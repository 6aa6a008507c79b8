use std::fmt::Debug;

use crate::{Body, Result};

/// HttpSend sends one http request and returns the response.
///
/// Implementations must not retry or interpret the status code; a non 2xx response is
/// still `Ok`. Only failures below http (connect, I/O, timeout) should be returned as
/// `Transport` errors. Retry and error translation happen in the [`Pipeline`](crate::Pipeline).
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Body>>;
}
