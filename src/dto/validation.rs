//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest display name accepted at join time, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 40;

/// Validates a participant display name: non-blank, bounded, no control characters.
///
/// Names are never checked for uniqueness within a room.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Ada")      // Ok
/// validate_display_name("   ")      // Err - blank
/// validate_display_name("a\u{7}b")  // Err - control character
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Name must not be blank".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_DISPLAY_NAME_CHARS {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!("Name must be at most {MAX_DISPLAY_NAME_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("display_name_format");
        err.message = Some("Name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}
