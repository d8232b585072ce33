//! Presence model

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// One record per participant: a live online/offline boolean plus the time of
/// the last transition. Created lazily on first login; an absent record reads
/// as offline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub online: bool,
    pub changed_at: Option<Timestamp>,
}
