//! Message and timestamp models

use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned creation time: seconds plus nanoseconds since the Unix
/// epoch. Both components participate in ordering so that same-second
/// messages still have a deterministic total order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    /// Current wall-clock time at nanosecond resolution.
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos(),
        }
    }

    /// The smallest timestamp strictly greater than this one.
    pub fn bumped(&self) -> Self {
        if self.nanos >= 999_999_999 {
            Self {
                seconds: self.seconds + 1,
                nanos: 0,
            }
        } else {
            Self {
                seconds: self.seconds,
                nanos: self.nanos + 1,
            }
        }
    }

    /// Parse an RFC 3339 string as reported by the store.
    pub fn from_rfc3339(s: &str) -> Option<Self> {
        let dt = chrono::DateTime::parse_from_rfc3339(s).ok()?;
        Some(Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        })
    }

    /// RFC 3339 rendering for the store's timestamp fields.
    pub fn to_rfc3339(&self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp(self.seconds, self.nanos)
            .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
            .unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::<chrono::Utc>::from_timestamp(self.seconds, self.nanos) {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            None => write!(f, "{}.{:09}", self.seconds, self.nanos),
        }
    }
}

/// A chat message in a room's ordered log. Append-only; never edited or
/// deleted by this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub body: String,
    pub timestamp: Timestamp,
}

/// The fields a sending client supplies. The store assigns the id and the
/// timestamp on append.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub sender_id: String,
    pub sender_name: String,
    pub recipient_id: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_seconds_dominate() {
        let a = Timestamp {
            seconds: 10,
            nanos: 999_999_999,
        };
        let b = Timestamp {
            seconds: 11,
            nanos: 0,
        };
        assert!(a < b);
    }

    #[test]
    fn test_ordering_nanos_break_ties() {
        let a = Timestamp {
            seconds: 10,
            nanos: 100,
        };
        let b = Timestamp {
            seconds: 10,
            nanos: 200,
        };
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn test_bumped_is_strictly_greater() {
        let t = Timestamp {
            seconds: 5,
            nanos: 42,
        };
        assert!(t.bumped() > t);
    }

    #[test]
    fn test_bumped_carries_into_seconds() {
        let t = Timestamp {
            seconds: 5,
            nanos: 999_999_999,
        };
        let b = t.bumped();
        assert_eq!(b.seconds, 6);
        assert_eq!(b.nanos, 0);
        assert!(b > t);
    }

    #[test]
    fn test_rfc3339_round_trip() {
        let t = Timestamp {
            seconds: 1_700_000_000,
            nanos: 123_456_789,
        };
        let parsed = Timestamp::from_rfc3339(&t.to_rfc3339()).unwrap();
        assert_eq!(parsed, t);
    }
}
