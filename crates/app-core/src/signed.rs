//! Integrity protection for small values stored on the client, such as the
//! OAuth state cookie.
//!
//! Wire form: `base64url(value) "." base64url(HMAC-SHA256(key, value))`.
//! The value is readable by the client; only tampering is detected.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const MIN_KEY_LEN: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthenticityError {
    #[error("Signed value is missing")]
    Missing,

    #[error("Signed value is malformed")]
    Malformed,

    #[error("Signed value failed signature verification")]
    BadSignature,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Signing key must be at least {MIN_KEY_LEN} bytes, got {0}")]
pub struct WeakKeyError(pub usize);

#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl CookieSigner {
    pub fn new(key: &[u8]) -> Result<Self, WeakKeyError> {
        if key.len() < MIN_KEY_LEN {
            return Err(WeakKeyError(key.len()));
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| WeakKeyError(key.len()))?;

        Ok(Self { mac })
    }

    fn mac(&self) -> HmacSha256 {
        self.mac.clone()
    }

    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        let tag = mac.finalize().into_bytes();

        format!("{}.{}", URL_SAFE_NO_PAD.encode(value), URL_SAFE_NO_PAD.encode(tag))
    }

    /// Checks the tag in constant time and only then hands back the value.
    pub fn verify(&self, signed: &str) -> Result<String, AuthenticityError> {
        let (value_b64, tag_b64) = signed.split_once('.').ok_or(AuthenticityError::Malformed)?;

        let value = URL_SAFE_NO_PAD.decode(value_b64).map_err(|_| AuthenticityError::Malformed)?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).map_err(|_| AuthenticityError::Malformed)?;

        let mut mac = self.mac();
        mac.update(&value);
        mac.verify_slice(&tag).map_err(|_| AuthenticityError::BadSignature)?;

        String::from_utf8(value).map_err(|_| AuthenticityError::Malformed)
    }
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}
