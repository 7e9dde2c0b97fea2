//! Credential resolution boundary.
//!
//! The sign/verify core never resolves identities; it takes explicit
//! credentials. Host applications that serve more than one consumer use a
//! [`CredentialProvider`] to map an incoming consumer key to its secret
//! before constructing a signer.

use std::collections::HashMap;

use crate::error::AuthError;

/// Resolves a consumer key to its shared secret.
pub trait CredentialProvider: Send + Sync {
    /// Look up the secret registered for `consumer_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownConsumerKey`] if the key is not
    /// registered.
    fn get_secret(&self, consumer_key: &str) -> Result<String, AuthError>;
}

/// In-memory credential provider for tests and single-tenant deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from `(consumer_key, secret)` pairs.
    #[must_use]
    pub fn new(credentials: Vec<(String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret(&self, consumer_key: &str) -> Result<String, AuthError> {
        self.credentials
            .get(consumer_key)
            .cloned()
            .ok_or_else(|| AuthError::UnknownConsumerKey(consumer_key.to_owned()))
    }
}
