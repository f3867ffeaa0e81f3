//! Opaque random tokens, used as one-time OAuth `state` values.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

/// Number of random bytes behind every token (256 bits).
const TOKEN_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum RandomError {
    #[error("Operating system entropy source is unavailable")]
    EntropyUnavailable(#[from] rand::Error),
}

/// Returns a base64url (unpadded) string of 32 bytes read from the OS CSPRNG.
pub fn generate_token() -> Result<String, RandomError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!("Failed to read from OS random source: {:?}", e);
        RandomError::EntropyUnavailable(e)
    })?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_token_is_url_safe_and_sized() {
        let token = generate_token().unwrap();

        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_token().unwrap()).collect();

        assert_eq!(tokens.len(), 256);
    }
}
