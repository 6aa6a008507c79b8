use std::sync::Arc;

use emcsign_core::time::{now, parse_http_date, DateTime};
use emcsign_core::{Body, ClockSkew, Context, Error, ErrorKind, ErrorLayer, HttpSend};
use emcsign_core::{Pipeline, PreSignedRequest, ProvideCredential, Result, RetryConfig};
use emcsign_core::{RetryLayer, Signer};
use http::header::DATE;
use http::Uri;
use log::debug;

use super::checksum::ChecksumLayer;
use super::config::Config;
use super::constants::*;
use super::credential::Credential;
use super::fault::classify;
use super::presign;
use super::provide_credential::{ConfigCredentialProvider, DefaultCredentialProvider};
use super::sign_request::RequestSigner;

/// Client sends signed requests to one Atmos endpoint.
///
/// Every request goes through, outermost first:
///
/// 1. the signer, which sets the date, uid and signature headers
/// 2. retries of transport failures and 5xx responses
/// 3. translation of failed responses into errors
/// 4. checksum validation of downloaded content
///
/// The client is cheap to clone, clones share the credential cache and the clock skew.
#[derive(Clone, Debug)]
pub struct Client {
    endpoint: Uri,
    utf8: bool,
    skew: ClockSkew,
    signer: Signer<Credential>,
    retry: RetryConfig,
    send: Arc<dyn HttpSend>,
}

impl Client {
    /// Create a client from config, completed by env.
    ///
    /// The endpoint is required. Credentials are loaded on the first signed request,
    /// from config first and env after that.
    pub fn new(ctx: Context, config: Config, send: impl HttpSend) -> Result<Self> {
        let config = config.from_env(&ctx);
        let endpoint = parse_endpoint(config.endpoint.as_deref())?;
        let utf8 = config.utf8.unwrap_or_default();

        let skew = ClockSkew::new();
        let loader = DefaultCredentialProvider::new()
            .push_front(ConfigCredentialProvider::new(Arc::new(config)));
        let signer = Signer::new(
            ctx,
            loader,
            RequestSigner::new()
                .with_clock_skew(skew.clone())
                .with_utf8(utf8),
        );

        Ok(Self {
            endpoint,
            utf8,
            skew,
            signer,
            retry: RetryConfig::default().with_busy_code(CODE_SERVER_BUSY),
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
                .with_clock_skew(self.skew.clone())
                .with_utf8(self.utf8),
        );
        self
    }

    /// Use a custom retry config. The Atmos "server busy" code is always added.
    pub fn with_retry(mut self, mut retry: RetryConfig) -> Self {
        if !retry.busy_codes.iter().any(|c| c == CODE_SERVER_BUSY) {
            retry = retry.with_busy_code(CODE_SERVER_BUSY);
        }
        self.retry = retry;
        self
    }

    /// Endpoint of this client.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Whether `x-emc-utf8` is sent, metadata must then be percent encoded.
    pub fn utf8(&self) -> bool {
        self.utf8
    }

    /// Clock skew applied to every signature.
    pub fn clock_skew(&self) -> &ClockSkew {
        &self.skew
    }

    /// Signer used by this client.
    pub fn signer(&self) -> &Signer<Credential> {
        &self.signer
    }

    /// Sign and send a request.
    ///
    /// A uri without host, like `/rest/namespace/foo.txt`, is resolved against the
    /// endpoint. Put a [`CancellationToken`](emcsign_core::CancellationToken) in the
    /// request extensions to stop retrying.
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
    pub fn presign(
        &self,
        req: http::Request<()>,
        expiration: DateTime,
    ) -> Result<PreSignedRequest> {
        let (mut parts, _) = req.into_parts();
        parts.uri = self.resolve(&parts.uri)?;
        presign::presign(&self.signer, parts, expiration)
    }

    /// Build a shareable url for anonymous download of `path` until `expires`.
    pub fn shareable_url(
        &self,
        path: &str,
        expires: DateTime,
        disposition: Option<&str>,
    ) -> Result<Uri> {
        let cred = self.signer.credential()?.ok_or_else(|| {
            Error::config_invalid("atmos uid and secret are required to share objects")
        })?;
        presign::shareable_url(&self.endpoint, path, &cred, expires, disposition)
    }

    /// Measure the offset between the local clock and the server clock.
    ///
    /// Sends a signed `GET /rest/service` and reads the server `Date`. The response
    /// is used even if the server rejected it, a skewed clock is the usual reason
    /// for a rejection. Returns the new offset in milliseconds.
    pub fn calibrate_clock(&self) -> Result<i64> {
        let req = http::Request::get(self.resolve(&Uri::from_static(SERVICE_PATH))?)
            .body(Body::Empty)?;

        let before = now();
        let resp = Pipeline::from_arc(self.send.clone())
            .layer(self.signer.clone())
            .send(req)?;
        let after = now();

        let date = resp.headers().get(DATE).ok_or_else(|| {
            Error::new(
                ErrorKind::ResponseInvalid,
                format!("{SERVICE_PATH} response has no Date header"),
            )
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
            .layer(ChecksumLayer)
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
        Error::config_invalid(format!("atmos endpoint is required, set {ATMOS_ENDPOINT}"))
    })?;
    let uri = endpoint.trim_end_matches('/').parse::<Uri>().map_err(|err| {
        Error::config_invalid(format!("atmos endpoint {endpoint:?} is invalid")).with_source(err)
    })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::config_invalid(format!(
            "atmos endpoint {endpoint:?} must look like http://host:port"
        )));
    }
    Ok(uri)
}
