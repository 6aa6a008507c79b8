//! Core components for signing and sending EMC object storage requests.
//!
//! This crate provides the protocol independent pieces shared by the Atmos and S3
//! signers: credential loading, the signing traits, checksums, clock skew and the
//! request pipeline with retry and error translation.
//!
//! ## Overview
//!
//! - **Context**: holds the environment that credential providers read from
//! - **Traits**: credential loading (`ProvideCredential`) and request signing (`SignRequest`)
//! - **Signer**: coordinates credential loading and request signing
//! - **Pipeline**: ordered [`Layer`]s in front of an [`HttpSend`], for example
//!   signing, [`RetryLayer`] and [`ErrorLayer`]
//!
//! Everything is synchronous: a request is signed, sent, retried and translated on
//! the calling thread.
//!
//! ## Example
//!
//! ```no_run
//! use emcsign_core::{Context, Error, ProvideCredential, Result, SignRequest};
//! use emcsign_core::{Signer, SigningCredential, SigningMethod};
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     token: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.token.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             token: "my-token".to_string(),
//!         }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyBuilder;
//!
//! impl SignRequest for MyBuilder {
//!     type Credential = MyCredential;
//!
//!     fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut http::request::Parts,
//!         cred: Option<&Self::Credential>,
//!         _: SigningMethod,
//!     ) -> Result<()> {
//!         let cred = cred.ok_or_else(|| Error::config_invalid("missing credential"))?;
//!         req.headers.insert("x-token", cred.token.parse()?);
//!         Ok(())
//!     }
//! }
//!
//! # fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyLoader, MyBuilder);
//!
//! let mut parts = http::Request::get("https://example.com")
//!     .body(())
//!     .unwrap()
//!     .into_parts()
//!     .0;
//! signer.sign(&mut parts, SigningMethod::Header)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: hashing and HMAC helpers
//! - [`time`]: stateless date formatting and parsing
//! - [`checksum`]: `ALG/OFFSET/VALUE` checksums and streaming validation
//! - [`utils`]: general utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod checksum;
pub mod hash;
pub mod time;
pub mod utils;

mod sha0;
pub use sha0::Sha0;

mod error;
pub use error::{Error, ErrorKind, Result, VendorError};

mod context;
pub use context::{Context, Env, NoopEnv, OsEnv, StaticEnv};

mod body;
pub use body::{Body, MarkableReader, Stream};
mod http;
pub use self::http::HttpSend;
mod pipeline;
pub use pipeline::{Layer, Next, Pipeline};
mod retry;
pub use retry::{NonRetryable, RetryConfig, RetryLayer};
mod fault;
pub use fault::{classify_vendor, parse_vendor_error, translate, Classifier, ErrorLayer};
mod cancel;
pub use cancel::CancellationToken;
mod skew;
pub use skew::{calculate_skew, ClockSkew};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::{header_value_normalize, SigningMethod, SigningRequest};
mod signer;
pub use signer::Signer;
mod presign;
pub use presign::PreSignedRequest;
