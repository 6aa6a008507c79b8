use std::collections::BTreeMap;

use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};

use crate::time::DateTime;
use crate::{Body, Result};

/// PreSignedRequest holds everything needed to execute one signed call later.
///
/// It carries no credential. Whoever holds it may perform exactly this call until
/// `expiration`; the server enforces the deadline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreSignedRequest {
    /// HTTP method.
    #[serde(with = "method_serde")]
    pub method: Method,
    /// Full url including any signing query.
    pub url: String,
    /// Content type that was signed, if any.
    pub content_type: Option<String>,
    /// Headers to send, including the signature and expiration headers.
    pub headers: BTreeMap<String, Vec<String>>,
    /// When the server stops accepting this request.
    pub expiration: DateTime,
}

impl PreSignedRequest {
    /// Capture a signed request.
    pub fn from_parts(parts: &http::request::Parts, expiration: DateTime) -> Result<Self> {
        let mut headers = BTreeMap::<String, Vec<String>>::new();
        for (name, value) in parts.headers.iter() {
            if name == CONTENT_TYPE {
                continue;
            }
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.to_str()?.to_string());
        }

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().map(str::to_string))
            .transpose()?;

        Ok(Self {
            method: parts.method.clone(),
            url: parts.uri.to_string(),
            content_type,
            headers,
            expiration,
        })
    }

    /// Check whether the request already expired at `now`.
    pub fn is_expired(&self, now: DateTime) -> bool {
        now >= self.expiration
    }

    /// Build a request ready to go through a pipeline without signing.
    pub fn to_request(&self, body: Body) -> Result<http::Request<Body>> {
        let mut req = http::Request::builder()
            .method(self.method.clone())
            .uri(&self.url)
            .body(body)?;

        let headers = req.headers_mut();
        if let Some(ct) = &self.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct)?);
        }
        for (name, values) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            for v in values {
                headers.append(name.clone(), HeaderValue::from_str(v)?);
            }
        }
        Ok(req)
    }
}

mod method_serde {
    use http::Method;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(method: &Method, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Method, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::from_timestamp;
    use pretty_assertions::assert_eq;

    fn signed_parts() -> http::request::Parts {
        let mut parts = http::Request::put("http://localhost:9022/rest/namespace/foo.txt")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts
            .headers
            .insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        parts
            .headers
            .insert("x-emc-expires", "1420074000".parse().unwrap());
        parts
            .headers
            .append("x-emc-meta", "a=1".parse().unwrap());
        parts
            .headers
            .append("x-emc-meta", "b=2".parse().unwrap());
        parts
            .headers
            .insert("x-emc-signature", "sig=".parse().unwrap());
        parts
    }

    #[test]
    fn test_from_parts_and_back() {
        let exp = from_timestamp(1420074000).unwrap();
        let p = PreSignedRequest::from_parts(&signed_parts(), exp).unwrap();
        assert_eq!(p.content_type.as_deref(), Some("text/plain"));
        assert_eq!(p.headers["x-emc-meta"], vec!["a=1", "b=2"]);
        assert!(!p.headers.contains_key("content-type"));

        let req = p.to_request(Body::from("hello")).unwrap();
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.uri(), "http://localhost:9022/rest/namespace/foo.txt");
        assert_eq!(req.headers()[CONTENT_TYPE], "text/plain");
        let metas: Vec<_> = req.headers().get_all("x-emc-meta").iter().collect();
        assert_eq!(metas, vec!["a=1", "b=2"]);
        assert_eq!(req.headers()["x-emc-signature"], "sig=");
    }

    #[test]
    fn test_expiry() {
        let exp = from_timestamp(1420074000).unwrap();
        let p = PreSignedRequest::from_parts(&signed_parts(), exp).unwrap();
        assert!(!p.is_expired(from_timestamp(1420073999).unwrap()));
        assert!(p.is_expired(exp));
    }

    #[test]
    fn test_json_shape() {
        let exp = from_timestamp(1420074000).unwrap();
        let p = PreSignedRequest::from_parts(&signed_parts(), exp).unwrap();

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["method"], "PUT");
        assert_eq!(json["expiration"], "2015-01-01T01:00:00Z");

        let back: PreSignedRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
