//! Message Authentication
//!
//! HMAC-SHA256 over the canonical concatenation of a message's fields.
//! Both peers hold the same secret (set out of band by the operator);
//! tags travel as lowercase hex.
//!
//! The canonical form is plain `Display` concatenation with no separators,
//! so producer and verifier must pass fields in exactly the same order.
//! A mismatch is never reported as an error - the tag simply fails to verify.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded tag (32 bytes).
pub const MAC_HEX_LEN: usize = 64;

/// Keyed MAC over ordered message fields.
#[derive(Clone)]
pub struct AuthCodec {
    keyed: HmacSha256,
}

impl AuthCodec {
    /// Create a codec keyed with the shared secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let keyed = HmacSha256::new_from_slice(secret.as_ref())
            .expect("HMAC accepts keys of any length");
        Self { keyed }
    }

    /// Concatenate fields into the string that gets authenticated.
    pub fn canonical(fields: &[&dyn fmt::Display]) -> String {
        fields.iter().map(|field| field.to_string()).collect()
    }

    /// Sign an ordered list of fields.
    pub fn sign(&self, fields: &[&dyn fmt::Display]) -> String {
        self.sign_str(&Self::canonical(fields))
    }

    /// Sign an already-concatenated message.
    pub fn sign_str(&self, message: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a tag over an ordered list of fields.
    pub fn verify(&self, fields: &[&dyn fmt::Display], tag: &str) -> bool {
        self.verify_str(&Self::canonical(fields), tag)
    }

    /// Verify a tag over an already-concatenated message.
    ///
    /// Comparison is constant-time. A tag that is not valid hex never verifies.
    pub fn verify_str(&self, message: &str, tag: &str) -> bool {
        if tag.len() != MAC_HEX_LEN {
            return false;
        }
        let Ok(expected) = hex::decode(tag) else {
            return false;
        };
        let mut mac = self.keyed.clone();
        mac.update(message.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for AuthCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCodec")
            .field("secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let codec = AuthCodec::new("key");
        let tag = codec.sign_str("The quick brown fox jumps over the lazy dog");
        assert_eq!(
            tag,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_fields_concatenate_without_separator() {
        let codec = AuthCodec::new("shared");
        assert_eq!(AuthCodec::canonical(&[&1, &"nonce_abc"]), "1nonce_abc");
        assert_eq!(codec.sign(&[&1, &"nonce_abc"]), codec.sign_str("1nonce_abc"));
    }

    #[test]
    fn test_field_order_matters() {
        let codec = AuthCodec::new("shared");
        let tag = codec.sign(&[&"a", &"b"]);
        assert!(codec.verify(&[&"a", &"b"], &tag));
        assert!(!codec.verify(&[&"b", &"a"], &tag));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let tag = AuthCodec::new("correct").sign_str("payload");
        assert!(!AuthCodec::new("incorrect").verify_str("payload", &tag));
    }

    #[test]
    fn test_malformed_tags_rejected() {
        let codec = AuthCodec::new("shared");
        let tag = codec.sign_str("payload");

        assert!(!codec.verify_str("payload", ""));
        assert!(!codec.verify_str("payload", &tag[..MAC_HEX_LEN - 2]));
        let not_hex = format!("zz{}", &tag[2..]);
        assert!(!codec.verify_str("payload", &not_hex));

        // Case of the hex digits is not significant
        assert!(codec.verify_str("payload", &tag.to_uppercase()));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let codec = AuthCodec::new("hunter2");
        let rendered = format!("{:?}", codec);
        assert!(!rendered.contains("hunter2"));
    }
}
