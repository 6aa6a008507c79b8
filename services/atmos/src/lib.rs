//! Atmos REST signing and transport for emcsign.
//!
//! ## Overview
//!
//! Atmos authenticates every request with an HMAC-SHA1 signature over the method,
//! a few standard headers, the lower cased path and all `x-emc-*` headers. The
//! shared secret is base64 encoded in the Atmos console and decoded once when the
//! credential is loaded.
//!
//! ## Quick Start
//!
//! ```no_run
//! use emcsign_atmos::{Client, Config};
//! use emcsign_core::{Body, Context, OsEnv, Result};
//! use emcsign_http_send_reqwest::ReqwestHttpSend;
//!
//! fn main() -> Result<()> {
//!     let ctx = Context::new().with_env(OsEnv);
//!     let config = Config::new()
//!         .with_endpoint("http://10.0.0.1:8080")
//!         .with_uid("subtenant/user1")
//!         .with_secret("czNjcjN0");
//!
//!     let client = Client::new(ctx, config, ReqwestHttpSend::default())?;
//!     client.calibrate_clock()?;
//!
//!     let req = http::Request::get("/rest/namespace/foo.txt").body(Body::Empty)?;
//!     let content = client.execute(req)?.into_body().collect()?;
//!     println!("read {} bytes", content.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Credential Sources
//!
//! ```bash
//! export ATMOS_ENDPOINT=http://10.0.0.1:8080
//! export ATMOS_UID=subtenant/user1
//! export ATMOS_SECRET=czNjcjN0
//! export ATMOS_UTF8=true  # Optional, percent encode metadata
//! ```
//!
//! ## Sharing
//!
//! [`Client::presign`] captures a signed request with `x-emc-expires` that anyone
//! can replay until it expires, [`Client::shareable_url`] builds an anonymous
//! download link.

mod constants;
pub use constants::{CODE_SERVER_BUSY, CODE_SIGNATURE_MISMATCH, SERVICE_PATH};

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod sign_request;
pub use sign_request::{string_to_sign, RequestSigner};

mod provide_credential;
pub use provide_credential::*;

mod headers;
pub use headers::{apply_metadata, parse_metadata, Acl, Grant, Metadata, Permission};

mod presign;
pub use presign::{presign, shareable_url};

mod checksum;
pub use checksum::{attach_write_checksum, ChecksumLayer};

mod fault;
pub use fault::classify;

mod client;
pub use client::Client;
