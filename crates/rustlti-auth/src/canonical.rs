//! Canonical base-string construction for OAuth 1.0 signed launches.
//!
//! The signature base string is composed of three percent-encoded tokens:
//!
//! ```text
//! METHOD&encoded(url)&encoded(key=value&key=value&...)
//! ```
//!
//! Parameter keys and values are each percent-encoded before sorting, and the
//! joined parameter blob is encoded once more when it becomes the third token,
//! so everything inside it is double-encoded by the time it lands in the base
//! string. Interoperating consumers must reproduce this text byte for byte.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Name of the field that carries the signature. It can never participate in
/// the text it is meant to validate, so it is stripped before
/// canonicalization.
pub const OAUTH_SIGNATURE: &str = "oauth_signature";

/// The set of characters that must be percent-encoded in base-string tokens.
///
/// All characters except RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) are encoded as `%XX`, uppercase hex.
const BASE_STRING_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a single base-string token.
#[must_use]
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, BASE_STRING_ENCODE_SET).to_string()
}

/// Canonicalize a parameter set into sorted `key=value` pairs joined by `&`.
///
/// Every key and value is percent-encoded individually, then the encoded
/// pairs are sorted ascending by key bytes, with ties broken by value bytes.
/// Duplicate keys are kept as distinct pairs. Comparison happens on the
/// encoded byte sequences, never through a locale-sensitive collation, so
/// the output is deterministic for any input order.
#[must_use]
pub fn canonicalize_params(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode_component(key), encode_component(value)))
        .collect();

    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the signature base string for `method`, `url`, and `params`.
///
/// The method is upper-cased, the URL is taken verbatim, and any
/// `oauth_signature` entry in `params` is excluded. Method, URL, and the
/// canonical parameter blob are each percent-encoded as atomic tokens and
/// joined with `&`.
///
/// As a final pass, every literal `%2B` in the composed string is replaced
/// with `%2520`: a `+` that survives into an encoded token must render as
/// the double-encoded form of a space, which is what LTI tool consumers
/// emit for the same input. The replacement runs exactly once, over the
/// finished string, never over the intermediate tokens.
#[must_use]
pub fn build_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let signable: Vec<(&str, &str)> = params
        .iter()
        .filter(|(key, _)| *key != OAUTH_SIGNATURE)
        .copied()
        .collect();

    let canonical = canonicalize_params(&signable);
    let method = method.to_uppercase();

    let base = format!(
        "{}&{}&{}",
        encode_component(&method),
        encode_component(url),
        encode_component(&canonical)
    );

    base.replace("%2B", "%2520")
}
