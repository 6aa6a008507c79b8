//! S3 signature v2 request signer with ECS extension headers.
use std::collections::HashSet;
use std::fmt::Write;

use emcsign_core::hash::base64_hmac_sha1;
use emcsign_core::time::{format_http_date, now, DateTime};
use emcsign_core::{ClockSkew, Context, Error, Result};
use emcsign_core::{SignRequest, SigningMethod, SigningRequest};
use http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE, DATE};
use http::HeaderValue;
use log::debug;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use super::constants::*;
use super::credential::Credential;

/// RequestSigner implements S3 signature v2 as accepted by ECS.
///
/// Buckets are addressed path style by default, the bucket is then part of the
/// path and already covered by the signature. Use [`RequestSigner::with_bucket`]
/// for virtual hosted style requests.
#[derive(Debug, Clone, Default)]
pub struct RequestSigner {
    bucket: Option<String>,
    namespace: Option<String>,
    skew: ClockSkew,
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a path style signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign for a virtual hosted bucket, `bucket.host/key`.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Send and sign `x-emc-namespace` with every request.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Share a clock skew with the client that calibrates it.
    pub fn with_clock_skew(mut self, skew: ClockSkew) -> Self {
        self.skew = skew;
        self
    }

    /// Specify the local signing time, the clock skew still applies.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

impl SignRequest for RequestSigner {
    type Credential = Credential;

    fn sign_request(
        &self,
        _: &Context,
        parts: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        method: SigningMethod,
    ) -> Result<()> {
        let k = credential.ok_or_else(|| {
            Error::config_invalid("access key id and secret access key are required")
        })?;
        if k.secret_access_key.is_empty() {
            return Err(Error::config_invalid("secret access key is empty"));
        }
        let now = self.skew.adjust(self.time.unwrap_or_else(now));

        let mut ctx = SigningRequest::build(parts)?;
        if let Some(namespace) = &self.namespace {
            ctx.headers.insert(X_EMC_NAMESPACE, namespace.parse()?);
        }

        match method {
            SigningMethod::Header => {
                ctx.headers.insert(DATE, format_http_date(now).parse()?);
                let string_to_sign = string_to_sign(&ctx, self.bucket.as_deref(), None)?;
                let signature =
                    base64_hmac_sha1(k.secret_access_key.as_bytes(), string_to_sign.as_bytes());

                let mut value: HeaderValue =
                    format!("AWS {}:{}", k.access_key_id, signature).parse()?;
                value.set_sensitive(true);
                ctx.headers.insert(AUTHORIZATION, value);
            }
            SigningMethod::Query(expires) => {
                ctx.query
                    .retain(|(k, _)| ![AWS_ACCESS_KEY_ID, EXPIRES, SIGNATURE].contains(&k.as_str()));
                let string_to_sign = string_to_sign(&ctx, self.bucket.as_deref(), Some(expires))?;
                let signature =
                    base64_hmac_sha1(k.secret_access_key.as_bytes(), string_to_sign.as_bytes());

                ctx.query_push(
                    AWS_ACCESS_KEY_ID,
                    utf8_percent_encode(&k.access_key_id, NON_ALPHANUMERIC).to_string(),
                );
                ctx.query_push(EXPIRES, expires.timestamp().to_string());
                ctx.query_push(
                    SIGNATURE,
                    utf8_percent_encode(&signature, NON_ALPHANUMERIC).to_string(),
                );
            }
        }

        ctx.apply(parts)
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// (Date | Expires) + "\n" +
/// CanonicalizedAmzHeaders +
/// CanonicalizedResource;
/// ```
///
/// `CanonicalizedAmzHeaders` covers `x-amz-*` and `x-emc-*` headers sorted by name,
/// each as `name:value\n`, values of one name joined by `,` in caller order. The
/// date line is empty when `x-amz-date` is sent, the header carries the date then.
///
/// ## Reference
///
/// - [Signing and authenticating REST requests](https://docs.aws.amazon.com/AmazonS3/latest/userguide/RESTAuthentication.html)
pub fn string_to_sign(
    ctx: &SigningRequest,
    bucket: Option<&str>,
    expires: Option<DateTime>,
) -> Result<String> {
    let mut s = String::new();
    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&HeaderName::from_static(CONTENT_MD5))?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&CONTENT_TYPE)?)?;
    match expires {
        Some(expires) => writeln!(&mut s, "{}", expires.timestamp())?,
        None if ctx.headers.contains_key("x-amz-date") => s.push('\n'),
        None => writeln!(&mut s, "{}", ctx.header_get_or_default(&DATE)?)?,
    }

    let headers = ctx.header_values_with_prefix(&[X_AMZ_PREFIX, X_EMC_PREFIX])?;
    if !headers.is_empty() {
        writeln!(
            &mut s,
            "{}",
            SigningRequest::header_to_string(&headers, ":", "\n")
        )?;
    }
    s.push_str(&canonicalize_resource(ctx, bucket));

    debug!("string to sign: {}", &s);
    Ok(s)
}

fn canonicalize_resource(ctx: &SigningRequest, bucket: Option<&str>) -> String {
    let params = ctx.query_to_vec_with_filter(is_sub_resource);
    let params_str = SigningRequest::query_to_string(params, "=", "&");

    let bucket = bucket.map(|b| format!("/{b}")).unwrap_or_default();
    if params_str.is_empty() {
        format!("{bucket}{}", ctx.path)
    } else {
        format!("{bucket}{}?{params_str}", ctx.path)
    }
}

fn is_sub_resource(param: &str) -> bool {
    SUBRESOURCES.contains(param)
}

// Sub resources are case sensitive.
static SUBRESOURCES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "accesspoint",
        "acl",
        "cors",
        "delete",
        "endpoint",
        "fileaccess",
        "isstaleallowed",
        "lifecycle",
        "location",
        "logging",
        "notification",
        "partNumber",
        "policy",
        "query",
        "requestPayment",
        "response-cache-control",
        "response-content-disposition",
        "response-content-encoding",
        "response-content-language",
        "response-content-type",
        "response-expires",
        "restore",
        "searchmetadata",
        "tagging",
        "torrent",
        "uploadId",
        "uploads",
        "versionId",
        "versioning",
        "versions",
        "website",
    ])
});
