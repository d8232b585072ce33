//! Call session models

use serde::{Deserialize, Serialize};

/// Which media the call carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

/// The shared signaling record both clients watch. At most one per room;
/// flipping `active` to false tells every observer to leave the media
/// channel and reset to idle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSession {
    pub kind: CallKind,
    pub active: bool,
}
