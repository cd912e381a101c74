//! Plain domain types. Platform ids are i64 snowflakes throughout.

use serde::{Deserialize, Serialize};

/// A platform entitlement (role) id.
pub type EntitlementId = i64;

/// A participant (member) id.
pub type ParticipantId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Giveaway,
    Lottery,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Giveaway => "giveaway",
            EventKind::Lottery => "lottery",
        }
    }

    /// Parse a `kind` column value. The schema CHECK constraint admits
    /// exactly these two strings.
    pub fn from_db(s: &str) -> EventKind {
        match s {
            "lottery" => EventKind::Lottery,
            _ => EventKind::Giveaway,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventState {
    Active,
    Ended,
    Cancelled,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::Active => "active",
            EventState::Ended => "ended",
            EventState::Cancelled => "cancelled",
        }
    }

    pub fn from_db(s: &str) -> EventState {
        match s {
            "ended" => EventState::Ended,
            "cancelled" => EventState::Cancelled,
            _ => EventState::Active,
        }
    }

    /// Terminal states never transition back to `Active`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventState::Active)
    }
}

impl std::fmt::Display for EventState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
