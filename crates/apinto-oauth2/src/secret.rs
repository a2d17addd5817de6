//! Client secret verification.
//!
//! A client secret is either compared directly, or, when the client is
//! configured with `hash_secret`, derived from the presented value through
//! PBKDF2-HMAC-SHA512 and compared with the stored derived value.
//!
//! Hashed secrets are stored as
//! `$pbkdf2-sha512$i=<iterations>,l=<length>$<salt>$<derived>` where salt and
//! derived value are base64 without padding.
//!
//! # Security
//!
//! The final comparison is a plain string equality, not a constant-time one.

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use sha2::Sha512;

use crate::types::Client;

const PBKDF2_SHA512_ID: &str = "pbkdf2-sha512";

/// Parameters for verifying a presented client secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRule {
    /// Base64 (no padding) encoded salt. Empty for plain-text secrets.
    pub salt: String,
    /// PBKDF2 iteration count.
    pub iterations: u32,
    /// Derived key length in bytes.
    pub length: usize,
    /// Expected value: the plain secret, or the base64 derived key.
    pub value: String,
}

impl HashRule {
    /// A rule for a plain-text secret.
    #[must_use]
    pub fn plain(secret: &str) -> Self {
        Self {
            salt: String::new(),
            iterations: 0,
            length: 0,
            value: secret.to_string(),
        }
    }

    /// Parses an encoded `$pbkdf2-sha512$i=..,l=..$salt$value` secret.
    ///
    /// Returns `None` if the string is not in that form.
    #[must_use]
    pub fn parse(encoded: &str) -> Option<Self> {
        let mut parts = encoded.strip_prefix('$')?.split('$');
        if parts.next()? != PBKDF2_SHA512_ID {
            return None;
        }
        let params = parts.next()?;
        let salt = parts.next()?;
        let value = parts.next()?;
        if parts.next().is_some() || value.is_empty() {
            return None;
        }

        let mut iterations = None;
        let mut length = None;
        for param in params.split(',') {
            match param.split_once('=')? {
                ("i", v) => iterations = v.parse::<u32>().ok(),
                ("l", v) => length = v.parse::<usize>().ok(),
                _ => return None,
            }
        }

        Some(Self {
            salt: salt.to_string(),
            iterations: iterations.filter(|i| *i > 0)?,
            length: length.filter(|l| *l > 0)?,
            value: value.to_string(),
        })
    }

    /// Derives the encoded key for `presented` under this rule.
    ///
    /// Returns `None` if the stored salt is not valid base64.
    #[must_use]
    pub fn derive(&self, presented: &str) -> Option<String> {
        let salt = STANDARD_NO_PAD.decode(self.salt.as_bytes()).ok()?;
        let mut derived = vec![0u8; self.length];
        pbkdf2::pbkdf2_hmac::<Sha512>(presented.as_bytes(), &salt, self.iterations, &mut derived);
        Some(STANDARD_NO_PAD.encode(derived))
    }

    /// Encodes the rule back into its `$pbkdf2-sha512$...` form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "${PBKDF2_SHA512_ID}$i={},l={}${}${}",
            self.iterations, self.length, self.salt, self.value
        )
    }
}

/// Verifies a presented client secret against the client's configuration.
///
/// Returns `false` for a hashed client whose stored secret is malformed.
#[must_use]
pub fn verify_client_secret(presented: &str, client: &Client) -> bool {
    let Some(rule) = client.hash_rule() else {
        tracing::warn!(client_id = %client.client_id, "Malformed hashed client secret");
        return false;
    };

    if !client.hash_secret {
        return presented == rule.value;
    }

    match rule.derive(presented) {
        Some(derived) => derived == rule.value,
        None => {
            tracing::warn!(client_id = %client.client_id, "Client secret salt is not valid base64");
            false
        }
    }
}
