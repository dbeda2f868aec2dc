use rand::{distributions::Alphanumeric, thread_rng, Rng};
use subtle::ConstantTimeEq;

/// Opaque credential bound to one attempt. Alphanumeric at 48 chars gives
/// ~285 bits, far beyond brute force over an attempt's lifetime.
pub fn generate_attempt_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Constant-time comparison of a caller-supplied token against the stored
/// one, so mismatch timing leaks nothing about the prefix.
pub fn token_matches(supplied: &str, stored: &str) -> bool {
    supplied.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_requested_length_and_charset() {
        let token = generate_attempt_token(48);
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn consecutive_tokens_differ() {
        assert_ne!(generate_attempt_token(48), generate_attempt_token(48));
    }

    #[test]
    fn comparison_requires_exact_match() {
        let token = generate_attempt_token(32);
        assert!(token_matches(&token, &token));
        assert!(!token_matches(&token[..31], &token));
        assert!(!token_matches("", &token));
        let mut other = token.clone();
        other.pop();
        other.push('!');
        assert!(!token_matches(&other, &token));
    }
}
