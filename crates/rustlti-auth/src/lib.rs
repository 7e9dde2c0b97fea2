//! OAuth 1.0 signing and verification for LTI 1.1 launch requests.
//!
//! LTI 1.1 launches are HTTP form posts authenticated with OAuth 1.0 body
//! signing: the tool consumer signs the launch parameters with a shared
//! secret (or an RSA key), and the tool provider recomputes the signature
//! to prove the message came from a known consumer and was not altered in
//! transit. This crate implements both directions: building and signing a
//! launch, and validating an incoming one.
//!
//! # Overview
//!
//! Signing canonicalizes the parameter set into an exact, byte-reproducible
//! base string (percent-encode, sort, join, encode again, plus one
//! documented compatibility substitution), signs it with a pluggable
//! signature method, and stores the result under `oauth_signature`.
//! Verification checks the consumer key first, recomputes the signature
//! with the locally configured method, and compares in constant time.
//!
//! # Usage
//!
//! ```
//! use rustlti_auth::ToolProvider;
//!
//! // Tool consumer side: build and sign a launch.
//! let mut consumer = ToolProvider::new("secret", "http://tool.example/launch");
//! consumer
//!     .set_consumer_key("12345")
//!     .set("user_id", "292832126")
//!     .set("roles", "Instructor");
//! consumer.sign()?;
//!
//! // Tool provider side: validate the incoming form parameters.
//! let mut tool = ToolProvider::new("secret", "http://tool.example/launch");
//! tool.set_consumer_key("12345");
//! tool.verify(consumer.params().clone(), "POST")?;
//! assert!(tool.has_role("Instructor"));
//! # Ok::<(), rustlti_auth::AuthError>(())
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Signature base-string construction
//! - [`credentials`] - Credential provider trait and in-memory implementation
//! - [`error`] - Authentication error types
//! - [`launch`] - Sign/verify orchestration over a parameter set
//! - [`nonce`] - Unique nonce generation
//! - [`provider`] - Owned launch container with chainable parameter setters
//! - [`signer`] - HMAC-SHA1 and RSA-SHA1 signature methods

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod launch;
pub mod nonce;
pub mod provider;
pub mod signer;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::{AuthError, AuthResult};
pub use launch::{sign_launch, verify_launch};
pub use nonce::NonceSource;
pub use provider::ToolProvider;
pub use signer::{HmacSha1Signer, OauthSigner, RsaSha1Signer};
