//! Presigned requests and shareable urls.
use emcsign_core::hash::base64_hmac_sha1;
use emcsign_core::time::DateTime;
use emcsign_core::{Error, PreSignedRequest, Result, Signer, SigningMethod};
use http::Uri;
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::credential::Credential;

/// Characters escaped in query values, everything but the RFC 3986 unreserved set.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters escaped in path segments.
const PATH_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

/// Sign a request with an embedded `x-emc-expires` and capture it.
///
/// The result can be executed later, by anyone, without the credential.
pub fn presign(
    signer: &Signer<Credential>,
    mut parts: http::request::Parts,
    expiration: DateTime,
) -> Result<PreSignedRequest> {
    signer.sign(&mut parts, SigningMethod::Query(expiration))?;
    PreSignedRequest::from_parts(&parts, expiration)
}

/// Build a shareable url granting anonymous `GET` of `path` until `expires`.
///
/// `path` is the unencoded namespace path, for example `/rest/namespace/foo.txt`.
/// With `disposition` set, the server sends it back as `Content-Disposition`.
///
/// ## Format
///
/// ```text
/// GET + "\n" +
/// lowercase(path) + "\n" +
/// uid + "\n" +
/// expires [+ "\n" + disposition]
/// ```
pub fn shareable_url(
    base: &Uri,
    path: &str,
    cred: &Credential,
    expires: DateTime,
    disposition: Option<&str>,
) -> Result<Uri> {
    if !path.starts_with('/') {
        return Err(Error::request_invalid(format!(
            "shareable url path must be absolute, got {path:?}"
        )));
    }
    if cred.secret.is_empty() {
        return Err(Error::config_invalid("atmos secret is empty"));
    }
    let scheme = base.scheme_str().unwrap_or("http");
    let authority = base
        .authority()
        .ok_or_else(|| Error::config_invalid(format!("endpoint {base} has no host")))?;

    let expires = expires.timestamp();
    let mut string_to_sign = format!("GET\n{}\n{}\n{}", path.to_lowercase(), cred.uid, expires);
    if let Some(disposition) = disposition {
        string_to_sign.push('\n');
        string_to_sign.push_str(disposition);
    }
    debug!("string to sign: {}", &string_to_sign);
    let signature = base64_hmac_sha1(&cred.secret, string_to_sign.as_bytes());

    // base64 may end with '=', which must be escaped or it reads as a delimiter.
    let mut url = format!(
        "{scheme}://{authority}{}?uid={}&expires={expires}&signature={}",
        utf8_percent_encode(path, PATH_ENCODE_SET),
        utf8_percent_encode(&cred.uid, QUERY_ENCODE_SET),
        utf8_percent_encode(&signature, QUERY_ENCODE_SET),
    );
    if let Some(disposition) = disposition {
        url.push_str("&disposition=");
        url.extend(utf8_percent_encode(disposition, QUERY_ENCODE_SET));
    }

    Ok(url.parse()?)
}
