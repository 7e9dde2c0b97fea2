//! Mutable launch container owned by the host application.

use std::collections::BTreeMap;

use crate::error::AuthError;
use crate::launch::{sign_launch, verify_launch};
use crate::nonce::NonceSource;
use crate::signer::{HmacSha1Signer, OauthSigner};

/// A single launch exchange: the parameter map plus everything needed to
/// sign it or validate it.
///
/// The container is owned and mutated by exactly one caller at a time;
/// concurrent exchanges each get their own instance. The default signer is
/// HMAC-SHA1 over the shared secret, which is what almost every LTI 1.1
/// deployment uses; [`ToolProvider::set_signer`] swaps in anything else.
///
/// ```
/// use rustlti_auth::ToolProvider;
///
/// let mut provider = ToolProvider::new("secret", "http://tool.example/launch");
/// provider
///     .set_consumer_key("12345")
///     .set("resource_link_id", "1086")
///     .set("roles", "Instructor");
///
/// let signature = provider.sign()?;
/// assert_eq!(provider.get("oauth_signature"), Some(signature.as_str()));
/// # Ok::<(), rustlti_auth::AuthError>(())
/// ```
#[derive(Debug)]
pub struct ToolProvider {
    consumer_key: String,
    url: String,
    method: String,
    params: BTreeMap<String, String>,
    nonce: NonceSource,
    signer: Box<dyn OauthSigner>,
}

impl ToolProvider {
    /// Create a provider for `url` signing with HMAC-SHA1 over `secret`.
    #[must_use]
    pub fn new(secret: &str, url: impl Into<String>) -> Self {
        Self {
            consumer_key: String::new(),
            url: url.into(),
            method: "POST".to_owned(),
            params: BTreeMap::new(),
            nonce: NonceSource::new(),
            signer: Box::new(HmacSha1Signer::new(secret, "")),
        }
    }

    /// Replace the signature method.
    pub fn set_signer(&mut self, signer: Box<dyn OauthSigner>) -> &mut Self {
        self.signer = signer;
        self
    }

    /// Set the consumer key stamped into outgoing requests and expected on
    /// incoming ones.
    pub fn set_consumer_key(&mut self, consumer_key: impl Into<String>) -> &mut Self {
        self.consumer_key = consumer_key.into();
        self
    }

    /// Set the HTTP method used for signing outgoing requests.
    pub fn set_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.method = method.into();
        self
    }

    /// Set a launch parameter, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a launch parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// True when `key` holds a non-empty value.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.params.get(key).is_some_and(|value| !value.is_empty())
    }

    /// The launch parameters, e.g. for rendering an auto-submitting form.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Replace the whole parameter map.
    pub fn set_params(&mut self, params: BTreeMap<String, String>) -> &mut Self {
        self.params = params;
        self
    }

    /// Target URL the exchange is signed against.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True when the comma-separated `roles` parameter contains `role` as a
    /// whole segment. Substrings do not match.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.get("roles")
            .is_some_and(|roles| roles.split(',').any(|r| r.trim() == role))
    }

    /// Sign the stored parameters for this provider's URL and method.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError::Signing`] from the configured signer.
    pub fn sign(&mut self) -> Result<String, AuthError> {
        sign_launch(
            &mut self.params,
            &self.method,
            &self.url,
            &self.consumer_key,
            &self.nonce,
            self.signer.as_ref(),
        )
    }

    /// Validate an incoming launch against this provider's URL, consumer
    /// key, and signer. The incoming parameters replace the stored ones, so
    /// launch fields stay readable through [`ToolProvider::get`] afterwards
    /// regardless of the outcome.
    ///
    /// # Errors
    ///
    /// [`AuthError::ConsumerKeyMismatch`] or [`AuthError::SignatureMismatch`]
    /// when validation fails, [`AuthError::Signing`] if the signer fails.
    pub fn verify(
        &mut self,
        params: BTreeMap<String, String>,
        method: &str,
    ) -> Result<(), AuthError> {
        self.params = params;
        verify_launch(
            &self.params,
            method,
            &self.url,
            &self.consumer_key,
            self.signer.as_ref(),
        )
    }
}
