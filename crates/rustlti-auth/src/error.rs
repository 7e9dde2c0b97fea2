//! Error types for launch authentication.

/// Failures produced while signing or verifying a launch request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The underlying cryptographic signing operation failed (structurally
    /// invalid key material, or the signature primitive itself reported an
    /// error). Never transient; retrying cannot succeed.
    #[error("signing operation failed: {0}")]
    Signing(String),

    /// The consumer key presented by the incoming request does not match the
    /// key the verifier was configured with. Raised before any cryptographic
    /// work is done.
    #[error("wrong consumer key: {provided}")]
    ConsumerKeyMismatch {
        /// Consumer key carried by the incoming request.
        provided: String,
    },

    /// The signature recomputed from the incoming parameters differs from the
    /// claimed one. Both values are carried for diagnostics.
    #[error("wrong signature: computed {expected}, request carried {provided}")]
    SignatureMismatch {
        /// Signature recomputed by the verifier.
        expected: String,
        /// Signature claimed by the incoming request.
        provided: String,
    },

    /// No secret is registered for the consumer key.
    #[error("unknown consumer key: {0}")]
    UnknownConsumerKey(String),
}

/// Convenience result type for launch authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
