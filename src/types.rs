//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection identifier
//! - `Nickname`: validated, addressable chat name

use uuid::Uuid;

use crate::error::NicknameError;

/// Longest nickname accepted, in characters
pub const MAX_NICKNAME_LEN: usize = 32;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe connection identification.
/// A fresh id is minted per accepted socket and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat nickname
///
/// Always trimmed, non-empty, free of whitespace and control characters,
/// and at most [`MAX_NICKNAME_LEN`] characters. Comparison is exact
/// (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nickname(String);

impl Nickname {
    /// Validate and build a nickname from raw client input
    pub fn parse(raw: &str) -> Result<Self, NicknameError> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(NicknameError::Empty);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(NicknameError::ContainsWhitespace);
        }
        if name.chars().any(char::is_control) {
            return Err(NicknameError::ControlCharacter);
        }
        if name.chars().count() > MAX_NICKNAME_LEN {
            return Err(NicknameError::TooLong(MAX_NICKNAME_LEN));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Nickname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
