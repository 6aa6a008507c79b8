//! Atmos REST request signer.
use std::fmt::Write;

use emcsign_core::hash::base64_hmac_sha1;
use emcsign_core::time::{format_http_date, now, DateTime};
use emcsign_core::{ClockSkew, Context, Error, Result};
use emcsign_core::{SignRequest, SigningMethod, SigningRequest};
use http::header::{CONTENT_TYPE, DATE, RANGE};
use http::HeaderValue;
use log::debug;

use super::constants::*;
use super::credential::Credential;

/// RequestSigner implements Atmos REST authentication.
///
/// It sets `Date`, `x-emc-date`, `x-emc-uid` (and `x-emc-utf8` when enabled) from
/// the skew adjusted clock, then signs every `x-emc-*` header and writes
/// `x-emc-signature`. Nothing may touch the headers after it ran.
#[derive(Debug, Clone, Default)]
pub struct RequestSigner {
    skew: ClockSkew,
    utf8: bool,
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a signer with zero clock skew.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share a clock skew with the client that calibrates it.
    pub fn with_clock_skew(mut self, skew: ClockSkew) -> Self {
        self.skew = skew;
        self
    }

    /// Send `x-emc-utf8: true` with every request.
    pub fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
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
        let cred = credential.ok_or_else(|| {
            Error::config_invalid("atmos uid and secret are required to sign requests")
        })?;
        if cred.secret.is_empty() {
            return Err(Error::config_invalid("atmos secret is empty"));
        }
        let now = self.skew.adjust(self.time.unwrap_or_else(now));

        let mut ctx = SigningRequest::build(parts)?;

        let date: HeaderValue = format_http_date(now).parse()?;
        ctx.headers.insert(DATE, date.clone());
        ctx.headers.insert(X_EMC_DATE, date);
        ctx.headers.insert(X_EMC_UID, cred.uid.parse()?);
        if self.utf8 {
            ctx.headers
                .insert(X_EMC_UTF8, HeaderValue::from_static("true"));
        }
        if let SigningMethod::Query(expires) = method {
            ctx.headers
                .insert(X_EMC_EXPIRES, expires.timestamp().to_string().parse()?);
        }
        ctx.headers.remove(X_EMC_SIGNATURE);

        let string_to_sign = string_to_sign(&ctx)?;
        let signature = base64_hmac_sha1(&cred.secret, string_to_sign.as_bytes());

        let mut value: HeaderValue = signature.parse()?;
        value.set_sensitive(true);
        ctx.headers.insert(X_EMC_SIGNATURE, value);

        ctx.apply(parts)
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Type + "\n" +
/// Range + "\n" +
/// Date + "\n" +
/// lowercase(path) [+ "?" + query] + "\n" +
/// CanonicalizedEmcHeaders
/// ```
///
/// `CanonicalizedEmcHeaders` are all `x-emc-*` headers except the signature, sorted
/// by name, one `name:value` per line. Values of a repeated header are joined by `,`
/// in the order they were added.
pub fn string_to_sign(ctx: &SigningRequest) -> Result<String> {
    let mut s = String::new();
    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&CONTENT_TYPE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&RANGE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&DATE)?)?;

    s.push_str(&ctx.path.to_lowercase());
    if let Some(query) = ctx.query_string() {
        s.push('?');
        s.push_str(&query);
    }
    s.push('\n');

    let mut headers = ctx.header_values_with_prefix(&[X_EMC_PREFIX])?;
    headers.remove(X_EMC_SIGNATURE);
    s.push_str(&SigningRequest::header_to_string(&headers, ":", "\n"));

    debug!("string to sign: {}", &s);
    Ok(s)
}
