//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::state_machine::MAX_PLAYER_ID_CHARS;

/// Longest room reference accepted: a hyphenated UUID.
const MAX_ROOM_REF_CHARS: usize = 36;

/// Validates that a player ID is non-blank and at most 80 characters once trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_player_id("  p-123 ") // Ok
/// validate_player_id("   ")      // Err - blank
/// ```
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_id_blank");
        err.message = Some("Player ID is required".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_PLAYER_ID_CHARS {
        let mut err = ValidationError::new("player_id_length");
        err.message = Some(
            format!("Player ID must be at most {MAX_PLAYER_ID_CHARS} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates a room reference: a room id or a join code, non-blank once trimmed.
pub fn validate_room_ref(room_ref: &str) -> Result<(), ValidationError> {
    let trimmed = room_ref.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("room_ref_blank");
        err.message = Some("Room ID is required".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_ROOM_REF_CHARS {
        let mut err = ValidationError::new("room_ref_length");
        err.message = Some("Room ID is too long".into());
        return Err(err);
    }

    Ok(())
}
