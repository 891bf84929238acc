//! Substitution key: a non-empty string of decimal digits.

use std::fmt;

use crate::error::KeyError;

/// Key baked in at compile time. Set `GUCHAOS_KEY` when building to change it.
pub const DEFAULT_KEY: &str = match option_env!("GUCHAOS_KEY") {
    Some(key) => key,
    None => "0000000000000000",
};

/// Validated substitution key, stored as digit values (0..=9).
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    digits: Vec<u8>,
}

impl Key {
    /// Parse a key, rejecting empty strings and anything but ASCII digits.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        if text.is_empty() {
            return Err(KeyError::Empty);
        }
        let digits = text
            .chars()
            .enumerate()
            .map(|(position, c)| match c.to_digit(10) {
                Some(d) => Ok(d as u8),
                None => Err(KeyError::NonDigit { position, found: c }),
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Ok(Self { digits })
    }

    /// Digit values in key order.
    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    /// Number of digits; never zero.
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Always false, a parsed key has at least one digit.
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Offsets repeating the key forever, starting at its first digit.
    pub fn stream(&self) -> impl Iterator<Item = u16> + '_ {
        self.digits.iter().cycle().map(|&d| u16::from(d))
    }
}

// The key is secret-ish configuration; keep it out of logs.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("len", &self.digits.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_is_valid() {
        assert!(Key::parse(DEFAULT_KEY).is_ok());
    }

    #[test]
    fn test_parse_digits() {
        let key = Key::parse("0192").unwrap();
        assert_eq!(key.digits(), &[0, 1, 9, 2]);
        assert_eq!(key.len(), 4);
        assert!(!key.is_empty());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Key::parse(""), Err(KeyError::Empty));
    }

    #[test]
    fn test_parse_rejects_non_digit() {
        assert_eq!(
            Key::parse("12a4"),
            Err(KeyError::NonDigit {
                position: 2,
                found: 'a'
            })
        );
        // Unicode digits are not decimal ASCII digits.
        assert!(Key::parse("1٣").is_err());
    }

    #[test]
    fn test_stream_wraps_around() {
        let key = Key::parse("123").unwrap();
        let offsets: Vec<u16> = key.stream().take(7).collect();
        assert_eq!(offsets, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_debug_hides_digits() {
        let key = Key::parse("987654").unwrap();
        let shown = format!("{key:?}");
        assert!(!shown.contains("987654"));
        assert!(shown.contains("len: 6"));
    }
}
