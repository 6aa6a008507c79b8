//! ACL and metadata headers.
//!
//! Entries are written in the order the caller gives them, the server and the
//! signature both see that order.
use std::fmt::{self, Display};
use std::str::FromStr;

use emcsign_core::{Error, Result};
use http::{HeaderMap, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::constants::*;

/// Characters escaped in metadata when `x-emc-utf8` is on.
const META_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ')
    .remove(b'/')
    .remove(b':');

/// Permission granted to a user or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// No access.
    None,
    /// Read only.
    Read,
    /// Read and write.
    Write,
    /// Read, write and ACL changes.
    FullControl,
}

impl Permission {
    /// Wire name of the permission.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::None => "NONE",
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::FullControl => "FULL_CONTROL",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(Permission::None),
            "READ" => Ok(Permission::Read),
            "WRITE" => Ok(Permission::Write),
            "FULL_CONTROL" => Ok(Permission::FullControl),
            v => Err(Error::request_invalid(format!("unknown permission {v:?}"))),
        }
    }
}

/// One ACL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// User or group name. The only group Atmos knows is `other`.
    pub grantee: String,
    /// Permission granted.
    pub permission: Permission,
}

impl Grant {
    /// Create a grant.
    pub fn new(grantee: impl Into<String>, permission: Permission) -> Self {
        Self {
            grantee: grantee.into(),
            permission,
        }
    }
}

impl Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.grantee, self.permission)
    }
}

/// Acl of an object, sent as `x-emc-useracl` and `x-emc-groupacl`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    /// Grants to users.
    pub users: Vec<Grant>,
    /// Grants to groups.
    pub groups: Vec<Grant>,
}

impl Acl {
    /// Create an empty acl.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a permission to a user.
    pub fn with_user(mut self, user: impl Into<String>, permission: Permission) -> Self {
        self.users.push(Grant::new(user, permission));
        self
    }

    /// Grant a permission to a group.
    pub fn with_group(mut self, group: impl Into<String>, permission: Permission) -> Self {
        self.groups.push(Grant::new(group, permission));
        self
    }

    /// Write the acl headers, replacing existing ones.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        for (name, grants) in [(X_EMC_USER_ACL, &self.users), (X_EMC_GROUP_ACL, &self.groups)] {
            headers.remove(name);
            if grants.is_empty() {
                continue;
            }
            let value = grants
                .iter()
                .map(Grant::to_string)
                .collect::<Vec<_>>()
                .join(",");
            headers.insert(name, HeaderValue::from_str(&value)?);
        }
        Ok(())
    }

    /// Read the acl returned by the server.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        Ok(Self {
            users: parse_grants(headers, X_EMC_USER_ACL)?,
            groups: parse_grants(headers, X_EMC_GROUP_ACL)?,
        })
    }
}

fn parse_grants(headers: &HeaderMap, name: &str) -> Result<Vec<Grant>> {
    let mut grants = Vec::new();
    for value in headers.get_all(name) {
        for entry in value.to_str()?.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (grantee, permission) = entry.split_once('=').ok_or_else(|| {
                Error::new(
                    emcsign_core::ErrorKind::ResponseInvalid,
                    format!("malformed acl entry {entry:?} in {name}"),
                )
            })?;
            grants.push(Grant::new(grantee.trim(), permission.parse()?));
        }
    }
    Ok(grants)
}

/// A user metadata entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Metadata name.
    pub name: String,
    /// Metadata value.
    pub value: String,
    /// Listable metadata is indexed by the server and sent as `x-emc-listable-meta`.
    pub listable: bool,
}

impl Metadata {
    /// Create a regular metadata entry.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            listable: false,
        }
    }

    /// Create a listable metadata entry.
    pub fn listable(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            listable: true,
            ..Self::new(name, value)
        }
    }

    fn encode(&self, utf8: bool) -> Result<String> {
        if utf8 {
            return Ok(format!(
                "{}={}",
                utf8_percent_encode(&self.name, META_ENCODE_SET),
                utf8_percent_encode(&self.value, META_ENCODE_SET)
            ));
        }

        if !self.name.is_ascii() || !self.value.is_ascii() {
            return Err(Error::encoding(format!(
                "metadata {:?} is not ascii, enable utf8 mode to send it",
                self.name
            )));
        }
        if self.name.contains([',', '=']) || self.value.contains(',') {
            return Err(Error::encoding(format!(
                "metadata {:?} contains ',' or '=', enable utf8 mode to send it",
                self.name
            )));
        }
        Ok(format!("{}={}", self.name, self.value))
    }
}

/// Write metadata headers in the given order, replacing existing ones.
///
/// With `utf8` on names and values are percent encoded, the caller must also send
/// `x-emc-utf8: true` (the signer does when configured). Without it, non ascii
/// metadata fails with `Encoding`.
pub fn apply_metadata(headers: &mut HeaderMap, metadata: &[Metadata], utf8: bool) -> Result<()> {
    let mut regular = Vec::new();
    let mut listable = Vec::new();
    for m in metadata {
        let v = m.encode(utf8)?;
        if m.listable {
            listable.push(v);
        } else {
            regular.push(v);
        }
    }

    for (name, values) in [(X_EMC_META, regular), (X_EMC_LISTABLE_META, listable)] {
        headers.remove(name);
        if !values.is_empty() {
            headers.insert(name, HeaderValue::from_str(&values.join(","))?);
        }
    }
    Ok(())
}

/// Read metadata returned by the server, decoding it when `x-emc-utf8` is set.
pub fn parse_metadata(headers: &HeaderMap) -> Result<Vec<Metadata>> {
    let utf8 = headers
        .get(X_EMC_UTF8)
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"true"));

    let mut out = Vec::new();
    for (name, listable) in [(X_EMC_META, false), (X_EMC_LISTABLE_META, true)] {
        for value in headers.get_all(name) {
            for entry in value.to_str()?.split(',') {
                let Some((k, v)) = entry.split_once('=') else {
                    continue;
                };
                let (k, v) = if utf8 {
                    (decode(k.trim())?, decode(v.trim())?)
                } else {
                    (k.trim().to_string(), v.trim().to_string())
                };
                out.push(Metadata {
                    name: k,
                    value: v,
                    listable,
                });
            }
        }
    }
    Ok(out)
}

fn decode(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|e| Error::encoding(format!("metadata {s:?} is not valid utf-8")).with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use emcsign_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_acl_headers_keep_order() {
        let acl = Acl::new()
            .with_user("john", Permission::FullControl)
            .with_user("mary", Permission::Read)
            .with_group("other", Permission::None);

        let mut headers = HeaderMap::new();
        acl.apply(&mut headers).unwrap();
        assert_eq!(headers[X_EMC_USER_ACL], "john=FULL_CONTROL,mary=READ");
        assert_eq!(headers[X_EMC_GROUP_ACL], "other=NONE");

        assert_eq!(Acl::from_headers(&headers).unwrap(), acl);
    }

    #[test]
    fn test_acl_from_server_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_EMC_USER_ACL, "fred=FULL_CONTROL, bob=write".parse().unwrap());
        headers.insert(X_EMC_GROUP_ACL, "other=READ".parse().unwrap());

        let acl = Acl::from_headers(&headers).unwrap();
        assert_eq!(acl.users[1], Grant::new("bob", Permission::Write));
        assert_eq!(acl.groups, vec![Grant::new("other", Permission::Read)]);
    }

    #[test]
    fn test_acl_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(X_EMC_USER_ACL, "fred".parse().unwrap());
        let err = Acl::from_headers(&headers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseInvalid);
    }

    #[test]
    fn test_metadata_headers() {
        let mut headers = HeaderMap::new();
        apply_metadata(
            &mut headers,
            &[
                Metadata::new("part", "2"),
                Metadata::listable("color", "blue"),
                Metadata::new("owner", "jane"),
            ],
            false,
        )
        .unwrap();
        assert_eq!(headers[X_EMC_META], "part=2,owner=jane");
        assert_eq!(headers[X_EMC_LISTABLE_META], "color=blue");
    }

    #[test]
    fn test_metadata_utf8() {
        let mut headers = HeaderMap::new();
        let meta = [Metadata::new("city", "k\u{f8}benhavn, dk")];

        let err = apply_metadata(&mut headers, &meta, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        apply_metadata(&mut headers, &meta, true).unwrap();
        assert_eq!(headers[X_EMC_META], "city=k%C3%B8benhavn%2C dk");

        headers.insert(X_EMC_UTF8, "true".parse().unwrap());
        assert_eq!(parse_metadata(&headers).unwrap(), meta.to_vec());
    }
}
