//! One-time numeric codes emailed for signup verification and password reset.

use rand::Rng;

use crate::config::OTP_LENGTH;

/// A numeric one-time code of `OTP_LENGTH` digits.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeCode(String);

impl std::fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OneTimeCode([REDACTED])")
    }
}

impl OneTimeCode {
    /// Generate a fresh code. Leading zeros are kept.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..OTP_LENGTH)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(code)
    }

    /// Wrap a code loaded from the cache.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against user input in constant time over the input length.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.trim().as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..50 {
            let code = OneTimeCode::generate();
            assert_eq!(code.as_str().len(), OTP_LENGTH);
            assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_matches() {
        let code = OneTimeCode::from_stored("012345".to_string());
        assert!(code.matches("012345"));
        assert!(code.matches(" 012345 "));
        assert!(!code.matches("12345"));
        assert!(!code.matches("012346"));
    }

    #[test]
    fn test_debug_hides_code() {
        let code = OneTimeCode::from_stored("999999".to_string());
        assert!(!format!("{:?}", code).contains("999999"));
    }
}
