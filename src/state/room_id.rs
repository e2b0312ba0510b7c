//! Room identifier schemes: human-enterable short codes or hub-issued opaque ids.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Alphabet for short codes; `0`, `O`, `1`, `I` are left out because they are easy to confuse.
pub const SHORT_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Number of characters in a short code.
pub const SHORT_CODE_LENGTH: usize = 6;
/// Upper bound for opaque identifiers accepted from clients.
const MAX_OPAQUE_LENGTH: usize = 64;

/// How room identifiers are generated and compared in this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomIdScheme {
    /// Fixed-length code from [`SHORT_CODE_ALPHABET`], compared case-insensitively.
    #[default]
    ShortCode,
    /// Hub-issued UUID string, compared exactly.
    Opaque,
}

/// Reasons a client-supplied room identifier is rejected before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomIdError {
    /// Nothing left after trimming.
    #[error("room id is empty")]
    Empty,
    /// Wrong number of characters.
    #[error("room id must be {expected} characters long (got {got})")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length received.
        got: usize,
    },
    /// Character outside the scheme's alphabet.
    #[error("room id contains invalid character `{0}`")]
    InvalidCharacter(char),
}

/// Normalized room identifier, unique across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Parse and normalize a client-supplied identifier under `scheme`.
    ///
    /// Short codes are upper-cased so `abc234` and `ABC234` address the same room.
    pub fn parse(scheme: RoomIdScheme, raw: &str) -> Result<Self, RoomIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RoomIdError::Empty);
        }

        match scheme {
            RoomIdScheme::ShortCode => {
                let normalized = trimmed.to_ascii_uppercase();
                let got = normalized.chars().count();
                if got != SHORT_CODE_LENGTH {
                    return Err(RoomIdError::InvalidLength {
                        expected: SHORT_CODE_LENGTH,
                        got,
                    });
                }
                if let Some(invalid) = normalized
                    .chars()
                    .find(|c| !c.is_ascii() || !SHORT_CODE_ALPHABET.contains(&(*c as u8)))
                {
                    return Err(RoomIdError::InvalidCharacter(invalid));
                }
                Ok(Self(normalized))
            }
            RoomIdScheme::Opaque => {
                if trimmed.len() > MAX_OPAQUE_LENGTH {
                    return Err(RoomIdError::InvalidLength {
                        expected: MAX_OPAQUE_LENGTH,
                        got: trimmed.len(),
                    });
                }
                if let Some(invalid) = trimmed
                    .chars()
                    .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
                {
                    return Err(RoomIdError::InvalidCharacter(invalid));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    }

    /// Issue a fresh identifier under `scheme`.
    pub fn generate(scheme: RoomIdScheme) -> Self {
        match scheme {
            RoomIdScheme::ShortCode => {
                let mut rng = rand::rng();
                let code = (0..SHORT_CODE_LENGTH)
                    .map(|_| {
                        let index = rng.random_range(0..SHORT_CODE_ALPHABET.len());
                        SHORT_CODE_ALPHABET[index] as char
                    })
                    .collect();
                Self(code)
            }
            RoomIdScheme::Opaque => Self(Uuid::new_v4().simple().to_string()),
        }
    }

    /// Borrow the normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_short_codes_use_unambiguous_alphabet() {
        for _ in 0..200 {
            let id = RoomId::generate(RoomIdScheme::ShortCode);
            assert_eq!(id.as_str().len(), SHORT_CODE_LENGTH);
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| SHORT_CODE_ALPHABET.contains(&b))
            );
            assert_eq!(RoomId::parse(RoomIdScheme::ShortCode, id.as_str()), Ok(id));
        }
    }

    #[test]
    fn short_codes_compare_case_insensitively() {
        let lower = RoomId::parse(RoomIdScheme::ShortCode, " abc234 ").unwrap();
        let upper = RoomId::parse(RoomIdScheme::ShortCode, "ABC234").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "ABC234");
    }

    #[test]
    fn short_codes_reject_confusable_characters() {
        assert_eq!(
            RoomId::parse(RoomIdScheme::ShortCode, "ABC10O"),
            Err(RoomIdError::InvalidCharacter('1'))
        );
        assert_eq!(
            RoomId::parse(RoomIdScheme::ShortCode, "ABC"),
            Err(RoomIdError::InvalidLength {
                expected: SHORT_CODE_LENGTH,
                got: 3
            })
        );
        assert_eq!(
            RoomId::parse(RoomIdScheme::ShortCode, "   "),
            Err(RoomIdError::Empty)
        );
    }

    #[test]
    fn opaque_ids_are_exact_match() {
        let issued = RoomId::generate(RoomIdScheme::Opaque);
        let parsed = RoomId::parse(RoomIdScheme::Opaque, issued.as_str()).unwrap();
        assert_eq!(parsed, issued);

        let upper = RoomId::parse(RoomIdScheme::Opaque, &issued.as_str().to_uppercase()).unwrap();
        assert_ne!(upper, issued);
        assert!(RoomId::parse(RoomIdScheme::Opaque, "room/1").is_err());
    }
}
