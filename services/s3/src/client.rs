use std::sync::Arc;

use emcsign_core::time::{now, parse_http_date, DateTime};
use emcsign_core::{Body, ClockSkew, Context, Error, ErrorKind, ErrorLayer, HttpSend};
use emcsign_core::{Pipeline, PreSignedRequest, ProvideCredential, Result, RetryConfig};
use emcsign_core::{RetryLayer, Signer, SigningMethod};
use http::header::DATE;
use http::Uri;
use log::debug;

use super::config::Config;
use super::constants::*;
use super::credential::Credential;
use super::fault::classify;
use super::provide_credential::{ConfigCredentialProvider, DefaultCredentialProvider};
use super::sign_request::RequestSigner;

/// Client sends signed requests to one ECS S3 endpoint, buckets path style.
///
/// Requests pass the signer, then retries, then fault translation.
#[derive(Clone, Debug)]
pub struct Client {
    endpoint: Uri,
    namespace: Option<String>,
    skew: ClockSkew,
    signer: Signer<Credential>,
    retry: RetryConfig,
    send: Arc<dyn HttpSend>,
}

impl Client {
    /// Create a client from config, completed by env. The endpoint is required.
    pub fn new(ctx: Context, config: Config, send: impl HttpSend) -> Result<Self> {
        let config = config.from_env(&ctx);
        let endpoint = parse_endpoint(config.endpoint.as_deref())?;
        let namespace = config.namespace.clone();

        let skew = ClockSkew::new();
        let loader = DefaultCredentialProvider::new()
            .push_front(ConfigCredentialProvider::new(Arc::new(config)));
        let signer = Signer::new(
            ctx,
            loader,
            RequestSigner::new()
                .with_namespace(namespace.clone())
                .with_clock_skew(skew.clone()),
        );

        Ok(Self {
            endpoint,
            namespace,
            skew,
            signer,
            retry: RetryConfig::default().with_busy_code(CODE_SLOW_DOWN),
            send: Arc::new(send),
        })
    }

    /// Load credentials from the given provider instead of config and env.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.signer = Signer::new(
            self.signer.context().clone(),
            provider,
            RequestSigner::new()
                .with_namespace(self.namespace.clone())
                .with_clock_skew(self.skew.clone()),
        );
        self
    }

    /// Use a custom retry config. `SlowDown` is always retried.
    pub fn with_retry(mut self, mut retry: RetryConfig) -> Self {
        if !retry.busy_codes.iter().any(|c| c == CODE_SLOW_DOWN) {
            retry = retry.with_busy_code(CODE_SLOW_DOWN);
        }
        self.retry = retry;
        self
    }

    /// Endpoint of this client.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Clock skew applied to every signature.
    pub fn clock_skew(&self) -> &ClockSkew {
        &self.skew
    }

    /// Sign and send a request, a uri without host is resolved against the endpoint.
    pub fn execute(&self, mut req: http::Request<Body>) -> Result<http::Response<Body>> {
        *req.uri_mut() = self.resolve(req.uri())?;
        self.pipeline(true).send(req)
    }

    /// Send a presigned request, no credential is involved.
    pub fn execute_presigned(
        &self,
        req: &PreSignedRequest,
        body: Body,
    ) -> Result<http::Response<Body>> {
        self.pipeline(false).send(req.to_request(body)?)
    }

    /// Presign a request valid until `expiration`.
    ///
    /// The signature travels in the `AWSAccessKeyId`, `Expires` and `Signature` query.
    pub fn presign(
        &self,
        req: http::Request<()>,
        expiration: DateTime,
    ) -> Result<PreSignedRequest> {
        let (mut parts, _) = req.into_parts();
        parts.uri = self.resolve(&parts.uri)?;
        self.signer
            .sign(&mut parts, SigningMethod::Query(expiration))?;
        PreSignedRequest::from_parts(&parts, expiration)
    }

    /// Measure the offset between the local clock and the server clock with a
    /// signed `HEAD /`. Returns the new offset in milliseconds.
    pub fn calibrate_clock(&self) -> Result<i64> {
        let req = http::Request::head(self.resolve(&Uri::from_static("/"))?).body(Body::Empty)?;

        let before = now();
        let resp = Pipeline::from_arc(self.send.clone())
            .layer(self.signer.clone())
            .send(req)?;
        let after = now();

        let date = resp.headers().get(DATE).ok_or_else(|| {
            Error::new(ErrorKind::ResponseInvalid, "response has no Date header")
        })?;
        let server = parse_http_date(date.to_str()?).map_err(|err| {
            Error::new(ErrorKind::ResponseInvalid, "server sent an invalid Date").with_source(err)
        })?;
        debug!("server clock reads {server}, local clock {before} .. {after}");

        Ok(self.skew.calibrate(before, server, after))
    }

    fn pipeline(&self, sign: bool) -> Pipeline {
        let mut pipeline = Pipeline::from_arc(self.send.clone());
        if sign {
            pipeline = pipeline.layer(self.signer.clone());
        }
        pipeline
            .layer(RetryLayer::new(self.retry.clone()))
            .layer(ErrorLayer::new(classify))
    }

    fn resolve(&self, uri: &Uri) -> Result<Uri> {
        if uri.authority().is_some() {
            return Ok(uri.clone());
        }
        let mut parts = self.endpoint.clone().into_parts();
        parts.path_and_query = uri.path_and_query().cloned();
        Ok(Uri::from_parts(parts)?)
    }
}

fn parse_endpoint(endpoint: Option<&str>) -> Result<Uri> {
    let endpoint = endpoint.ok_or_else(|| {
        Error::config_invalid(format!("s3 endpoint is required, set {ECS_S3_ENDPOINT}"))
    })?;
    let uri = endpoint.trim_end_matches('/').parse::<Uri>().map_err(|err| {
        Error::config_invalid(format!("s3 endpoint {endpoint:?} is invalid")).with_source(err)
    })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::config_invalid(format!(
            "s3 endpoint {endpoint:?} must look like http://host:port"
        )));
    }
    Ok(uri)
}
