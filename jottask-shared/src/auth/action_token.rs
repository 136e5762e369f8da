/// Action token generation and hashing
///
/// Tokens travel in email links, so they are URL-safe and long enough that
/// guessing one is hopeless. The database only ever sees the digest.
///
/// # Token Format
///
/// `jt_` followed by 40 base62 characters (43 chars total).
///
/// # Example
///
/// ```
/// use jottask_shared::auth::action_token::{generate_action_token, hash_action_token, validate_action_token_format};
///
/// let (token, hash) = generate_action_token();
/// assert!(token.starts_with("jt_"));
/// assert!(validate_action_token_format(&token));
/// assert_eq!(hash_action_token(&token), hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of a token
const TOKEN_RANDOM_LENGTH: usize = 40;

/// Token prefix
const TOKEN_PREFIX: &str = "jt_";

/// Total token length
pub const ACTION_TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Generates a token and its SHA-256 digest
///
/// Returns `(plaintext, hex_digest)`. Key space is 62^40 (about 2^238).
pub fn generate_action_token() -> (String, String) {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let token = format!("{}{}", TOKEN_PREFIX, random_part);
    let hash = hash_action_token(&token);
    (token, hash)
}

/// Hex-encoded SHA-256 of a token
pub fn hash_action_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Cheap shape check before touching the database
pub fn validate_action_token_format(token: &str) -> bool {
    token.len() == ACTION_TOKEN_LENGTH
        && token.starts_with(TOKEN_PREFIX)
        && token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let (a, hash_a) = generate_action_token();
        let (b, hash_b) = generate_action_token();
        assert_ne!(a, b);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn test_token_length() {
        let (token, hash) = generate_action_token();
        assert_eq!(token.len(), ACTION_TOKEN_LENGTH);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_action_token("jt_abc"), hash_action_token("jt_abc"));
        assert_ne!(hash_action_token("jt_abc"), hash_action_token("jt_abd"));
    }

    #[test]
    fn test_format_validation() {
        let (token, _) = generate_action_token();
        assert!(validate_action_token_format(&token));
        assert!(!validate_action_token_format("jt_short"));
        assert!(!validate_action_token_format(&token.replacen("jt_", "xx_", 1)));

        let mut bad = token.clone();
        bad.pop();
        bad.push('-');
        assert!(!validate_action_token_format(&bad));
    }
}
