//! Sign/verify orchestration for launch requests.
//!
//! [`sign_launch`] fills in the protocol fields a signed request must carry
//! (version, timestamp, nonce, signature method, consumer key), derives the
//! signature base string, and stores the computed signature under
//! `oauth_signature`. [`verify_launch`] is its single-shot counterpart: it
//! gates on the consumer key, recomputes the signature over the incoming
//! parameters, and compares.
//!
//! Verification always recomputes with the signer the host application
//! configured. The `oauth_signature_method` field advertised by the incoming
//! request is never consulted, so a forged request cannot choose the
//! algorithm it is checked against.

use std::collections::BTreeMap;

use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{OAUTH_SIGNATURE, build_base_string};
use crate::error::AuthError;
use crate::nonce::NonceSource;
use crate::signer::OauthSigner;

/// Protocol version stamped into requests that do not carry one.
const OAUTH_VERSION: &str = "1.0";

/// Sign a launch parameter set in place and return the signature.
///
/// `oauth_version`, `oauth_timestamp`, `oauth_nonce`, and
/// `oauth_signature_method` are defaulted only when absent or empty, so a
/// caller may pin any of them beforehand (fixed nonces and timestamps make
/// signing fully deterministic). `oauth_consumer_key` is always overwritten
/// with `consumer_key`. On success the signature is stored under
/// `oauth_signature` and returned; on failure the parameter set keeps any
/// defaults already filled in, but never a signature.
///
/// # Errors
///
/// Propagates [`AuthError::Signing`] from the signer.
pub fn sign_launch(
    params: &mut BTreeMap<String, String>,
    method: &str,
    url: &str,
    consumer_key: &str,
    nonce: &NonceSource,
    signer: &dyn OauthSigner,
) -> Result<String, AuthError> {
    if is_unset(params, "oauth_version") {
        params.insert("oauth_version".to_owned(), OAUTH_VERSION.to_owned());
    }
    if is_unset(params, "oauth_timestamp") {
        params.insert(
            "oauth_timestamp".to_owned(),
            Utc::now().timestamp().to_string(),
        );
    }
    if is_unset(params, "oauth_nonce") {
        params.insert("oauth_nonce".to_owned(), nonce.next());
    }
    if is_unset(params, "oauth_signature_method") {
        params.insert(
            "oauth_signature_method".to_owned(),
            signer.method_name().to_owned(),
        );
    }
    params.insert("oauth_consumer_key".to_owned(), consumer_key.to_owned());

    let base_string = base_string_of(params, method, url);
    debug!(consumer_key = %consumer_key, base_string = %base_string, "signing launch request");

    let signature = signer.compute_signature(&base_string)?;
    params.insert(OAUTH_SIGNATURE.to_owned(), signature.clone());
    Ok(signature)
}

/// Verify a signed launch parameter set.
///
/// The consumer key carried by the request is checked against
/// `expected_consumer_key` before any cryptographic work. The signature is
/// then recomputed over the incoming parameters (minus `oauth_signature`)
/// with the configured `signer` and compared against the claimed value.
/// Both comparisons are constant-time; equality semantics are exact byte
/// equality. A missing `oauth_signature` reads as empty and fails the
/// comparison like any other mismatch.
///
/// # Errors
///
/// [`AuthError::ConsumerKeyMismatch`] when the consumer keys differ,
/// [`AuthError::SignatureMismatch`] when the signatures differ, and
/// [`AuthError::Signing`] if the signer itself fails.
pub fn verify_launch(
    params: &BTreeMap<String, String>,
    method: &str,
    url: &str,
    expected_consumer_key: &str,
    signer: &dyn OauthSigner,
) -> Result<(), AuthError> {
    let provided_key = params.get("oauth_consumer_key").map_or("", String::as_str);
    if !bool::from(
        provided_key
            .as_bytes()
            .ct_eq(expected_consumer_key.as_bytes()),
    ) {
        debug!(provided = %provided_key, "launch consumer key mismatch");
        return Err(AuthError::ConsumerKeyMismatch {
            provided: provided_key.to_owned(),
        });
    }

    let claimed = params.get(OAUTH_SIGNATURE).map_or("", String::as_str);

    let base_string = base_string_of(params, method, url);
    let expected = signer.compute_signature(&base_string)?;

    if bool::from(expected.as_bytes().ct_eq(claimed.as_bytes())) {
        debug!(consumer_key = %expected_consumer_key, "launch signature verified");
        Ok(())
    } else {
        debug!(expected = %expected, provided = %claimed, "launch signature mismatch");
        Err(AuthError::SignatureMismatch {
            expected,
            provided: claimed.to_owned(),
        })
    }
}

/// True when `key` is absent or holds an empty value.
fn is_unset(params: &BTreeMap<String, String>, key: &str) -> bool {
    params.get(key).is_none_or(String::is_empty)
}

/// Flatten the map into pairs and derive the base string.
fn base_string_of(params: &BTreeMap<String, String>, method: &str, url: &str) -> String {
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    build_base_string(method, url, &pairs)
}

#[cfg(test)]
mod tests {
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::DecodePrivateKey;

    use super::*;
    use crate::signer::{HmacSha1Signer, RsaSha1Signer, TEST_RSA_KEY_PEM};

    const REFERENCE_URL: &str = "http://www.imsglobal.org/developers/LTI/test/v1p1/tool.php";

    /// Launch fixture published with the IMS Global LTI 1.1 test harness.
    fn reference_launch() -> BTreeMap<String, String> {
        [
            ("context_id", "456434513"),
            ("context_label", "SI182"),
            ("context_title", "Design of Personal Environments"),
            (
                "launch_presentation_css_url",
                "http://www.imsglobal.org/developers/LTI/test/v1p1/lms.css",
            ),
            ("launch_presentation_document_target", "frame"),
            ("launch_presentation_locale", "en-US"),
            (
                "launch_presentation_return_url",
                "http://www.imsglobal.org/developers/LTI/test/v1p1/lms_return.php",
            ),
            (
                "lis_outcome_service_url",
                "http://www.imsglobal.org/developers/LTI/test/v1p1/common/tool_consumer_outcome.php?b64=MTIzNDU6OjpzZWNyZXQ=",
            ),
            ("lis_person_contact_email_primary", "user@school.edu"),
            ("lis_person_name_family", "Public"),
            ("lis_person_name_full", "Jane Q. Public"),
            ("lis_person_name_given", "Given"),
            ("lis_person_sourcedid", "school.edu:user"),
            ("lis_result_sourcedid", "feb-123-456-2929::28883"),
            ("lti_message_type", "basic-lti-launch-request"),
            ("lti_version", "LTI-1p0"),
            ("oauth_callback", "about:blank"),
            ("oauth_consumer_key", "12345"),
            ("oauth_nonce", "93ac608e18a7d41dec8f7219e1bf6a17"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1348093590"),
            ("oauth_version", "1.0"),
            ("resource_link_description", "A weekly blog."),
            ("resource_link_id", "120988f929-274612"),
            ("resource_link_title", "Weekly Blog"),
            ("roles", "Instructor"),
            ("tool_consumer_info_product_family_code", "ims"),
            ("tool_consumer_info_version", "1.1"),
            (
                "tool_consumer_instance_description",
                "University of School (LMSng)",
            ),
            ("tool_consumer_instance_guid", "lmsng.school.edu"),
            ("user_id", "292832126"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    /// Base string the reference fixture must produce, byte for byte.
    const REFERENCE_BASE_STRING: &str = "POST&http%3A%2F%2Fwww.imsglobal.org%2Fdevelopers%2FLTI%2Ftest%2Fv1p1%2Ftool.php&context_id%3D456434513%26context_label%3DSI182%26context_title%3DDesign%2520of%2520Personal%2520Environments%26launch_presentation_css_url%3Dhttp%253A%252F%252Fwww.imsglobal.org%252Fdevelopers%252FLTI%252Ftest%252Fv1p1%252Flms.css%26launch_presentation_document_target%3Dframe%26launch_presentation_locale%3Den-US%26launch_presentation_return_url%3Dhttp%253A%252F%252Fwww.imsglobal.org%252Fdevelopers%252FLTI%252Ftest%252Fv1p1%252Flms_return.php%26lis_outcome_service_url%3Dhttp%253A%252F%252Fwww.imsglobal.org%252Fdevelopers%252FLTI%252Ftest%252Fv1p1%252Fcommon%252Ftool_consumer_outcome.php%253Fb64%253DMTIzNDU6OjpzZWNyZXQ%253D%26lis_person_contact_email_primary%3Duser%2540school.edu%26lis_person_name_family%3DPublic%26lis_person_name_full%3DJane%2520Q.%2520Public%26lis_person_name_given%3DGiven%26lis_person_sourcedid%3Dschool.edu%253Auser%26lis_result_sourcedid%3Dfeb-123-456-2929%253A%253A28883%26lti_message_type%3Dbasic-lti-launch-request%26lti_version%3DLTI-1p0%26oauth_callback%3Dabout%253Ablank%26oauth_consumer_key%3D12345%26oauth_nonce%3D93ac608e18a7d41dec8f7219e1bf6a17%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1348093590%26oauth_version%3D1.0%26resource_link_description%3DA%2520weekly%2520blog.%26resource_link_id%3D120988f929-274612%26resource_link_title%3DWeekly%2520Blog%26roles%3DInstructor%26tool_consumer_info_product_family_code%3Dims%26tool_consumer_info_version%3D1.1%26tool_consumer_instance_description%3DUniversity%2520of%2520School%2520%2528LMSng%2529%26tool_consumer_instance_guid%3Dlmsng.school.edu%26user_id%3D292832126";

    #[test]
    fn test_should_reproduce_reference_base_string() {
        let params = reference_launch();
        assert_eq!(
            base_string_of(&params, "post", REFERENCE_URL),
            REFERENCE_BASE_STRING
        );
    }

    #[test]
    fn test_should_reproduce_reference_signature() {
        let mut params = reference_launch();
        let signer = HmacSha1Signer::new("secret", "");
        let signature = sign_launch(
            &mut params,
            "post",
            REFERENCE_URL,
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();
        assert_eq!(signature, "QWgJfKpJNDrpncgO9oXxJb8vHiE=");
        assert_eq!(
            params.get(OAUTH_SIGNATURE).map(String::as_str),
            Some("QWgJfKpJNDrpncgO9oXxJb8vHiE=")
        );
    }

    #[test]
    fn test_should_sign_identically_for_fixed_nonce_and_timestamp() {
        let signer = HmacSha1Signer::new("secret", "");
        let nonce = NonceSource::new();
        let mut first = reference_launch();
        let mut second = reference_launch();
        assert_eq!(
            sign_launch(&mut first, "POST", REFERENCE_URL, "12345", &nonce, &signer).unwrap(),
            sign_launch(&mut second, "POST", REFERENCE_URL, "12345", &nonce, &signer).unwrap(),
        );
    }

    #[test]
    fn test_should_fill_missing_protocol_fields() {
        let signer = HmacSha1Signer::new("secret", "");
        let mut params = BTreeMap::from([
            ("resource_link_id".to_owned(), "1086".to_owned()),
            // Empty values count as unset and are replaced.
            ("oauth_nonce".to_owned(), String::new()),
        ]);

        sign_launch(
            &mut params,
            "POST",
            "http://tool.example/launch",
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        assert_eq!(params.get("oauth_version").unwrap(), "1.0");
        assert_eq!(params.get("oauth_signature_method").unwrap(), "HMAC-SHA1");
        assert_eq!(params.get("oauth_consumer_key").unwrap(), "12345");
        assert!(!params.get("oauth_nonce").unwrap().is_empty());
        assert!(
            params
                .get("oauth_timestamp")
                .unwrap()
                .chars()
                .all(|c| c.is_ascii_digit())
        );
    }

    #[test]
    fn test_should_keep_pinned_protocol_fields() {
        let signer = HmacSha1Signer::new("secret", "");
        let mut params = BTreeMap::from([
            ("oauth_timestamp".to_owned(), "1348093590".to_owned()),
            ("oauth_nonce".to_owned(), "fixed".to_owned()),
        ]);

        sign_launch(
            &mut params,
            "POST",
            "http://tool.example/launch",
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        assert_eq!(params.get("oauth_timestamp").unwrap(), "1348093590");
        assert_eq!(params.get("oauth_nonce").unwrap(), "fixed");
    }

    #[test]
    fn test_should_round_trip_sign_and_verify() {
        let signer = HmacSha1Signer::new("secret", "");
        let mut params = reference_launch();
        sign_launch(
            &mut params,
            "POST",
            REFERENCE_URL,
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        verify_launch(&params, "POST", REFERENCE_URL, "12345", &signer).unwrap();
    }

    #[test]
    fn test_should_round_trip_with_rsa_signer() {
        let key = RsaPrivateKey::from_pkcs8_pem(TEST_RSA_KEY_PEM).unwrap();
        let signer = RsaSha1Signer::new(key);
        let mut params = reference_launch();
        params.insert("oauth_signature_method".to_owned(), String::new());

        sign_launch(
            &mut params,
            "POST",
            REFERENCE_URL,
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        assert_eq!(params.get("oauth_signature_method").unwrap(), "RSA-SHA1");
        verify_launch(&params, "POST", REFERENCE_URL, "12345", &signer).unwrap();
    }

    #[test]
    fn test_should_detect_tampered_parameter() {
        let signer = HmacSha1Signer::new("secret", "");
        let mut params = reference_launch();
        sign_launch(
            &mut params,
            "POST",
            REFERENCE_URL,
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        params.insert("user_id".to_owned(), "999999999".to_owned());

        match verify_launch(&params, "POST", REFERENCE_URL, "12345", &signer) {
            Err(AuthError::SignatureMismatch { expected, provided }) => {
                assert_ne!(expected, provided);
            }
            other => panic!("expected signature mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_should_gate_on_consumer_key_before_signature() {
        let signer = HmacSha1Signer::new("secret", "");
        let mut params = reference_launch();
        sign_launch(
            &mut params,
            "POST",
            REFERENCE_URL,
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        // The signature itself is valid; only the expected key differs.
        match verify_launch(&params, "POST", REFERENCE_URL, "99999", &signer) {
            Err(AuthError::ConsumerKeyMismatch { provided }) => assert_eq!(provided, "12345"),
            other => panic!("expected consumer key mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_should_ignore_advertised_signature_method() {
        // An attacker downgrading the advertised method does not change the
        // signer the verifier uses; the stale signature simply fails.
        let signer = HmacSha1Signer::new("secret", "");
        let mut params = reference_launch();
        sign_launch(
            &mut params,
            "POST",
            REFERENCE_URL,
            "12345",
            &NonceSource::new(),
            &signer,
        )
        .unwrap();

        params.insert("oauth_signature_method".to_owned(), "PLAINTEXT".to_owned());

        assert!(matches!(
            verify_launch(&params, "POST", REFERENCE_URL, "12345", &signer),
            Err(AuthError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn test_should_treat_missing_signature_as_mismatch() {
        let signer = HmacSha1Signer::new("secret", "");
        let params = reference_launch();

        assert!(matches!(
            verify_launch(&params, "POST", REFERENCE_URL, "12345", &signer),
            Err(AuthError::SignatureMismatch { provided, .. }) if provided.is_empty()
        ));
    }
}
