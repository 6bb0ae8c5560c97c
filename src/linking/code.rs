//! Share codes and the 8-slot code entry a professional types them into.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Literal tag every share code starts with.
pub const SHARE_CODE_PREFIX: &str = "DYN";
/// Characters in the prefix.
pub const PREFIX_LEN: usize = 3;
/// Characters after the prefix.
pub const SUFFIX_LEN: usize = 5;
/// Total entry slots.
pub const CODE_LEN: usize = PREFIX_LEN + SUFFIX_LEN;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Why an entered code is refused before any lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeFormatError {
    #[error("Code has {filled} of 8 characters")]
    Incomplete { filled: usize },

    #[error("Code prefix {found:?} is not DYN")]
    BadPrefix { found: String },

    #[error("Code suffix {found:?} is not 5 characters of A-Z or 0-9")]
    BadSuffix { found: String },
}

/// A well-formed share code in canonical `PREFIX-SUFFIX` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareCode(String);

impl ShareCode {
    /// Build from the 3-character prefix and 5-character suffix.
    pub fn from_parts(prefix: &str, suffix: &str) -> Result<Self, CodeFormatError> {
        if prefix != SHARE_CODE_PREFIX {
            return Err(CodeFormatError::BadPrefix {
                found: prefix.to_string(),
            });
        }
        let suffix_ok = suffix.len() == SUFFIX_LEN
            && suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !suffix_ok {
            return Err(CodeFormatError::BadSuffix {
                found: suffix.to_string(),
            });
        }
        Ok(Self(format!("{prefix}-{suffix}")))
    }

    /// Parse typed or pasted text: `DYN12345`, `dyn-12345`, `DYN 12345`.
    pub fn parse(raw: &str) -> Result<Self, CodeFormatError> {
        let chars: Vec<char> = normalize(raw).collect();
        if chars.len() < CODE_LEN {
            return Err(CodeFormatError::Incomplete {
                filled: chars.len(),
            });
        }
        if chars.len() > CODE_LEN {
            let text: String = chars.iter().collect();
            return Err(CodeFormatError::BadSuffix {
                found: text.chars().skip(PREFIX_LEN).collect(),
            });
        }
        let prefix: String = chars[..PREFIX_LEN].iter().collect();
        let suffix: String = chars[PREFIX_LEN..].iter().collect();
        Self::from_parts(&prefix, &suffix)
    }

    /// A fresh random code for a new client.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("{SHARE_CODE_PREFIX}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ShareCode {
    type Error = CodeFormatError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShareCode> for String {
    fn from(code: ShareCode) -> Self {
        code.0
    }
}

/// Drop separators and uppercase.
fn normalize(raw: &str) -> impl Iterator<Item = char> + '_ {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .flat_map(char::to_uppercase)
}

/// Eight independently editable slots with a focus cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodeEntry {
    slots: [Option<char>; CODE_LEN],
    focus: usize,
}

impl CodeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[Option<char>; CODE_LEN] {
        &self.slots
    }

    /// Slot that currently has focus.
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Type `ch` into slot `index`; focus moves forward unless on the last slot.
    /// Out-of-range indexes are ignored.
    pub fn type_char(&mut self, index: usize, ch: char) {
        if index >= CODE_LEN {
            return;
        }
        self.slots[index] = ch.to_uppercase().next();
        self.focus = (index + 1).min(CODE_LEN - 1);
    }

    /// Backspace in slot `index`: clears a filled slot, or moves focus back
    /// when the slot is already empty.
    pub fn backspace(&mut self, index: usize) {
        if index >= CODE_LEN {
            return;
        }
        if self.slots[index].take().is_some() {
            self.focus = index;
        } else if index > 0 {
            self.focus = index - 1;
        }
    }

    /// Paste text from the start, ignoring separators and whitespace.
    /// Characters beyond the eighth are dropped.
    pub fn paste(&mut self, raw: &str) {
        self.reset();
        let mut last = None;
        for (i, ch) in normalize(raw).take(CODE_LEN).enumerate() {
            self.slots[i] = Some(ch);
            last = Some(i);
        }
        if let Some(i) = last {
            self.focus = (i + 1).min(CODE_LEN - 1);
        }
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled() == CODE_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.filled() == 0
    }

    /// Raw text of the filled slots, in order.
    pub fn text(&self) -> String {
        self.slots.iter().flatten().collect()
    }

    /// Validate the entry: all slots filled, then prefix and suffix shape.
    pub fn share_code(&self) -> Result<ShareCode, CodeFormatError> {
        if !self.is_complete() {
            return Err(CodeFormatError::Incomplete {
                filled: self.filled(),
            });
        }
        let text = self.text();
        let prefix: String = text.chars().take(PREFIX_LEN).collect();
        let suffix: String = text.chars().skip(PREFIX_LEN).collect();
        ShareCode::from_parts(&prefix, &suffix)
    }

    /// Back to eight empty slots with focus on the first.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_from(text: &str) -> CodeEntry {
        let mut entry = CodeEntry::new();
        for (i, ch) in text.chars().enumerate() {
            entry.type_char(i, ch);
        }
        entry
    }

    #[test]
    fn canonical_form_inserts_hyphen() {
        let code = entry_from("DYN12345").share_code().unwrap();
        assert_eq!(code.as_str(), "DYN-12345");
    }

    #[test]
    fn bad_prefix_rejected() {
        assert_eq!(
            entry_from("XYZ12345").share_code().unwrap_err(),
            CodeFormatError::BadPrefix {
                found: "XYZ".into()
            }
        );
    }

    #[test]
    fn seven_characters_incomplete() {
        assert_eq!(
            entry_from("DYN1234").share_code().unwrap_err(),
            CodeFormatError::Incomplete { filled: 7 }
        );
    }

    #[test]
    fn suffix_must_be_alphanumeric() {
        let err = entry_from("DYN12#45").share_code().unwrap_err();
        assert!(matches!(err, CodeFormatError::BadSuffix { .. }));
        let err = entry_from("DYN12É45").share_code().unwrap_err();
        assert!(matches!(err, CodeFormatError::BadSuffix { .. }));
    }

    #[test]
    fn typing_uppercases_and_advances_focus() {
        let mut entry = CodeEntry::new();
        entry.type_char(0, 'd');
        assert_eq!(entry.slots()[0], Some('D'));
        assert_eq!(entry.focus(), 1);

        entry.type_char(7, 'x');
        assert_eq!(entry.focus(), 7, "focus stays on the last slot");
        entry.type_char(8, 'z');
        assert_eq!(entry.filled(), 2);
    }

    #[test]
    fn backspace_clears_then_moves_back() {
        let mut entry = entry_from("DYN");
        assert_eq!(entry.focus(), 3);

        // slot 3 is empty: focus jumps back without clearing slot 2
        entry.backspace(3);
        assert_eq!(entry.focus(), 2);
        assert_eq!(entry.slots()[2], Some('N'));

        // slot 2 is filled: cleared, focus stays
        entry.backspace(2);
        assert_eq!(entry.slots()[2], None);
        assert_eq!(entry.focus(), 2);

        // first slot empty: nowhere to go
        let mut empty = CodeEntry::new();
        empty.backspace(0);
        assert_eq!(empty.focus(), 0);
    }

    #[test]
    fn paste_ignores_separators_and_overflow() {
        let mut entry = CodeEntry::new();
        entry.paste("dyn-ab12c");
        assert_eq!(entry.share_code().unwrap().as_str(), "DYN-AB12C");

        entry.paste("DYN 12345 678");
        assert_eq!(entry.text(), "DYN12345");

        entry.paste("DY");
        assert_eq!(entry.filled(), 2);
        assert_eq!(entry.focus(), 2);
    }

    #[test]
    fn reset_empties_all_slots() {
        let mut entry = entry_from("DYN12345");
        entry.reset();
        assert!(entry.is_empty());
        assert_eq!(entry.slots(), &[None; CODE_LEN]);
        assert_eq!(entry.focus(), 0);
    }

    #[test]
    fn share_code_parse_accepts_hyphenated() {
        assert_eq!(ShareCode::parse("DYN-12345").unwrap().as_str(), "DYN-12345");
        assert_eq!(ShareCode::parse("dyn12345").unwrap().as_str(), "DYN-12345");
        assert!(matches!(
            ShareCode::parse("DYN-1234"),
            Err(CodeFormatError::Incomplete { filled: 7 })
        ));
        assert!(ShareCode::parse("DYN-123456").is_err());
    }

    #[test]
    fn generated_codes_are_well_formed() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let code = ShareCode::generate(&mut rng);
            assert_eq!(ShareCode::parse(code.as_str()).unwrap(), code);
        }
    }

    #[test]
    fn share_code_serde_is_canonical_string() {
        let code: ShareCode = serde_json::from_str("\"dyn12345\"").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"DYN-12345\"");
        assert!(serde_json::from_str::<ShareCode>("\"ABC12345\"").is_err());
    }
}
