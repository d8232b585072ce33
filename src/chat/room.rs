//! Deterministic room naming.
//!
//! A room id is the two participant ids sorted lexicographically and joined
//! with `_`, so both sides derive the same id regardless of who computes it.

use crate::error::ChatError;

/// Symmetric room id for a participant pair.
///
/// Fails with `InvalidParticipants` when either id is empty or both are the
/// same user.
pub fn room_id(a: &str, b: &str) -> Result<String, ChatError> {
    if a.is_empty() || b.is_empty() || a == b {
        return Err(ChatError::InvalidParticipants);
    }
    let mut pair = [a, b];
    pair.sort_unstable();
    Ok(format!("{}_{}", pair[0], pair[1]))
}

/// The other participant of a room, from the viewer's perspective. `None`
/// when the viewer is not part of the room.
pub fn counterpart<'a>(room_id: &'a str, viewer: &str) -> Option<&'a str> {
    let (first, second) = room_id.split_once('_')?;
    if first == viewer {
        Some(second)
    } else if second == viewer {
        Some(first)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_is_symmetric() {
        assert_eq!(room_id("u1", "u2").unwrap(), room_id("u2", "u1").unwrap());
        assert_eq!(room_id("u1", "u2").unwrap(), "u1_u2");
    }

    #[test]
    fn test_room_id_sorts_lexicographically() {
        assert_eq!(room_id("zed", "amy").unwrap(), "amy_zed");
    }

    #[test]
    fn test_self_chat_is_rejected() {
        assert!(matches!(
            room_id("u1", "u1"),
            Err(ChatError::InvalidParticipants)
        ));
    }

    #[test]
    fn test_empty_participant_is_rejected() {
        assert!(matches!(
            room_id("", "u2"),
            Err(ChatError::InvalidParticipants)
        ));
        assert!(matches!(
            room_id("u1", ""),
            Err(ChatError::InvalidParticipants)
        ));
    }

    #[test]
    fn test_counterpart_recovery() {
        let room = room_id("u1", "u2").unwrap();
        assert_eq!(counterpart(&room, "u1"), Some("u2"));
        assert_eq!(counterpart(&room, "u2"), Some("u1"));
        assert_eq!(counterpart(&room, "u3"), None);
    }
}
