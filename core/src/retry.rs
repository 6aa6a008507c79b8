use std::thread;
use std::time::Duration;

use http::request::Parts;
use log::debug;
use log::warn;

use crate::{Body, CancellationToken, Error, Layer, Next, Result};

/// RetryConfig controls how [`RetryLayer`] retries failed attempts.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Delay used instead of `delay` when the server reports it is busy.
    pub busy_delay: Duration,
    /// Vendor codes that mean "server busy".
    pub busy_codes: Vec<String>,
    /// Max bytes of a streaming body kept around to replay it.
    pub buffer_budget: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(500),
            busy_delay: Duration::from_millis(300),
            busy_codes: Vec::new(),
            buffer_budget: 128 * 1024,
        }
    }
}

impl RetryConfig {
    /// Set max retries.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the delay used when the server is busy.
    pub fn with_busy_delay(mut self, delay: Duration) -> Self {
        self.busy_delay = delay;
        self
    }

    /// Add a vendor code that means "server busy".
    pub fn with_busy_code(mut self, code: impl Into<String>) -> Self {
        self.busy_codes.push(code.into());
        self
    }

    /// Set the replay buffer budget for streaming bodies.
    pub fn with_buffer_budget(mut self, budget: usize) -> Self {
        self.buffer_budget = budget;
        self
    }
}

/// NonRetryable marks a request that must never be sent twice.
///
/// Insert it into the request extensions, for example when a write-side checksum
/// is in flight and a partial upload can't be resent safely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonRetryable(pub &'static str);

/// RetryLayer retries transport failures and 5xx responses.
///
/// It must sit outside the layer that turns responses into errors, so that 5xx
/// responses arrive here as `Vendor` errors.
#[derive(Clone, Debug, Default)]
pub struct RetryLayer {
    config: RetryConfig,
}

impl RetryLayer {
    /// Create a retry layer.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn is_busy(&self, err: &Error) -> bool {
        err.vendor()
            .and_then(|v| v.code.as_deref())
            .is_some_and(|code| self.config.busy_codes.iter().any(|c| c == code))
    }
}

impl Layer for RetryLayer {
    fn call(&self, req: http::Request<Body>, next: Next<'_>) -> Result<http::Response<Body>> {
        let (parts, body) = req.into_parts();
        let cancel = parts.extensions.get::<CancellationToken>().cloned();
        let non_retryable = parts.extensions.get::<NonRetryable>().copied();

        if let Body::Stream(stream) = &body {
            stream.mark(self.config.buffer_budget);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(token) = &cancel {
                token.check()?;
            }

            let err = match next.run(rebuild(&parts, body.clone())) {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if let Some(NonRetryable(reason)) = non_retryable {
                debug!("attempt {attempt} failed but request is not retryable ({reason}): {err}");
                return Err(err);
            }
            if attempt > self.config.max_retries {
                debug!("giving up after {attempt} attempts: {err}");
                return Err(err);
            }

            if let Body::Stream(stream) = &body {
                if stream.read_since_mark() > 0 {
                    if let Err(reset_err) = stream.reset() {
                        warn!("attempt {attempt} failed and body can't be replayed: {reset_err}");
                        return Err(err);
                    }
                }
            }

            let delay = if self.is_busy(&err) {
                self.config.busy_delay
            } else {
                self.config.delay
            };
            warn!("attempt {attempt} failed, retrying in {delay:?}: {err}");

            if let Some(token) = &cancel {
                token.check()?;
            }
            thread::sleep(delay);
        }
    }
}

/// Build a fresh request for one attempt.
fn rebuild(parts: &Parts, body: Body) -> http::Request<Body> {
    let mut req = http::Request::new(body);
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    *req.version_mut() = parts.version;
    *req.headers_mut() = parts.headers.clone();
    *req.extensions_mut() = parts.extensions.clone();
    req
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, HttpSend, Pipeline, VendorError};
    use http::StatusCode;
    use std::io::Cursor;
    use std::io::Read;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Scripted outcome of one send.
    #[derive(Debug, Clone)]
    enum Outcome {
        Ok,
        Status(StatusCode, Option<&'static str>),
        Io,
    }

    #[derive(Debug, Default)]
    struct Script {
        outcomes: Mutex<Vec<Outcome>>,
        attempts: Mutex<usize>,
        bodies: Mutex<Vec<Vec<u8>>>,
    }

    /// Stub transport that plays outcomes in order and reads the whole body every time.
    #[derive(Debug, Clone)]
    struct Stub(Arc<Script>);

    impl Stub {
        fn new(outcomes: Vec<Outcome>) -> Self {
            Stub(Arc::new(Script {
                outcomes: Mutex::new(outcomes),
                ..Default::default()
            }))
        }

        fn attempts(&self) -> usize {
            *self.0.attempts.lock().unwrap()
        }
    }

    impl HttpSend for Stub {
        fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Body>> {
            *self.0.attempts.lock().unwrap() += 1;
            let mut buf = Vec::new();
            req.into_body().into_reader().read_to_end(&mut buf)?;
            self.0.bodies.lock().unwrap().push(buf);

            let outcome = self.0.outcomes.lock().unwrap().remove(0);
            match outcome {
                Outcome::Ok => Ok(http::Response::new(Body::from("done"))),
                Outcome::Status(status, code) => Err(Error::from_vendor(
                    ErrorKind::Vendor,
                    VendorError {
                        status,
                        code: code.map(|v| v.to_string()),
                        message: format!("attempt {}", self.attempts()),
                    },
                )),
                Outcome::Io => Err(Error::transport("connection reset")),
            }
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::default()
            .with_delay(Duration::ZERO)
            .with_busy_delay(Duration::ZERO)
    }

    fn put(body: Body) -> http::Request<Body> {
        http::Request::put("http://localhost/rest/objects")
            .body(body)
            .unwrap()
    }

    #[test]
    fn test_retry_then_success() {
        let _ = env_logger::builder().is_test(true).try_init();

        let stub = Stub::new(vec![
            Outcome::Status(StatusCode::SERVICE_UNAVAILABLE, None),
            Outcome::Status(StatusCode::SERVICE_UNAVAILABLE, None),
            Outcome::Ok,
        ]);
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config()));

        let resp = pipeline.send(put(Body::from("payload"))).unwrap();
        assert_eq!(resp.into_body().collect().unwrap(), "done");
        assert_eq!(stub.attempts(), 3);
    }

    #[test]
    fn test_retry_exhausted_returns_last_error() {
        let stub = Stub::new(vec![
            Outcome::Status(StatusCode::SERVICE_UNAVAILABLE, None),
            Outcome::Status(StatusCode::BAD_GATEWAY, None),
            Outcome::Ok,
        ]);
        let pipeline =
            Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config().with_max_retries(1)));

        let err = pipeline.send(put(Body::Empty)).unwrap_err();
        assert_eq!(stub.attempts(), 2);
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.vendor().unwrap().message, "attempt 2");
    }

    #[test]
    fn test_io_errors_are_retried() {
        let stub = Stub::new(vec![Outcome::Io, Outcome::Ok]);
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config()));

        pipeline.send(put(Body::Empty)).unwrap();
        assert_eq!(stub.attempts(), 2);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let stub = Stub::new(vec![Outcome::Status(StatusCode::NOT_FOUND, Some("1003"))]);
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config()));

        let err = pipeline.send(put(Body::Empty)).unwrap_err();
        assert_eq!(stub.attempts(), 1);
        assert_eq!(err.kind(), ErrorKind::Vendor);
    }

    #[test]
    fn test_non_retryable_request() {
        let stub = Stub::new(vec![
            Outcome::Status(StatusCode::SERVICE_UNAVAILABLE, None),
            Outcome::Ok,
        ]);
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config()));

        let mut req = put(Body::from("chunk"));
        req.extensions_mut()
            .insert(NonRetryable("write-side checksum"));
        let err = pipeline.send(req).unwrap_err();
        assert_eq!(stub.attempts(), 1);
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_stream_body_is_replayed() {
        let stub = Stub::new(vec![Outcome::Io, Outcome::Ok]);
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config()));

        let body = Body::from_reader(Cursor::new(b"streamed payload".to_vec()), Some(16));
        pipeline.send(put(body)).unwrap();

        let bodies = stub.0.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], b"streamed payload");
        assert_eq!(bodies[1], b"streamed payload");
    }

    #[test]
    fn test_stream_over_budget_is_fatal() {
        let stub = Stub::new(vec![Outcome::Io, Outcome::Ok]);
        let pipeline = Pipeline::new(stub.clone())
            .layer(RetryLayer::new(fast_config().with_buffer_budget(4)));

        let body = Body::from_reader(Cursor::new(b"streamed payload".to_vec()), Some(16));
        let err = pipeline.send(put(body)).unwrap_err();
        assert_eq!(stub.attempts(), 1);
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_busy_uses_busy_delay() {
        let stub = Stub::new(vec![
            Outcome::Status(StatusCode::INTERNAL_SERVER_ERROR, Some("1040")),
            Outcome::Ok,
        ]);
        let config = RetryConfig::default()
            .with_delay(Duration::from_secs(30))
            .with_busy_delay(Duration::from_millis(20))
            .with_busy_code("1040");
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(config));

        let start = Instant::now();
        pipeline.send(put(Body::Empty)).unwrap();
        let elapsed = start.elapsed();
        assert_eq!(stub.attempts(), 2);
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_secs(30));
    }

    #[test]
    fn test_cancelled_before_send() {
        let stub = Stub::new(vec![Outcome::Ok]);
        let pipeline = Pipeline::new(stub.clone()).layer(RetryLayer::new(fast_config()));

        let token = CancellationToken::new();
        token.cancel();
        let mut req = put(Body::Empty);
        req.extensions_mut().insert(token);

        let err = pipeline.send(req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(stub.attempts(), 0);
    }

    #[test]
    fn test_cancelled_between_attempts() {
        #[derive(Debug)]
        struct CancelOnFailure {
            token: CancellationToken,
            inner: Stub,
        }

        impl HttpSend for CancelOnFailure {
            fn http_send(&self, req: http::Request<Body>) -> Result<http::Response<Body>> {
                self.token.cancel();
                self.inner.http_send(req)
            }
        }

        let token = CancellationToken::new();
        let stub = Stub::new(vec![Outcome::Io, Outcome::Ok]);
        let pipeline = Pipeline::new(CancelOnFailure {
            token: token.clone(),
            inner: stub.clone(),
        })
        .layer(RetryLayer::new(fast_config()));

        let mut req = put(Body::Empty);
        req.extensions_mut().insert(token);
        let err = pipeline.send(req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(stub.attempts(), 1);
    }
}
