//! Random identifier generation for execution directories.
//!
//! Execution ids are UUIDs (see `centralgauge-core::ids`); this module
//! supplies the short base36 suffix used by the verify engine's isolated
//! `verify-<ts36>-<r36>` directory naming.

use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode `value` as lowercase base36.
pub fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % 36) as usize;
        digits.push(BASE36[digit]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_else(|_| "0".to_string())
}

/// Generate a short random base36 token, used as the `<r36>` component of a
/// verify directory name.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn random_base36_has_requested_length() {
        let token = random_base36(6);
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
