//! Call identity as seen by the filter pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a call
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// A ringing call awaiting an admission decision
///
/// Filters receive a shared reference to this value; it carries no
/// filtering state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingCall {
    /// Call identifier
    pub id: CallId,
    /// Caller's number or address; `None` for withheld or unknown callers
    pub caller_number: Option<String>,
    /// Caller name as presented by the network
    pub caller_display_name: Option<String>,
    /// When the call started ringing
    pub received_at: DateTime<Utc>,
}

impl IncomingCall {
    /// Create a call from the given caller number
    pub fn new(caller_number: impl Into<String>) -> Self {
        Self {
            id: CallId::new(),
            caller_number: Some(caller_number.into()),
            caller_display_name: None,
            received_at: Utc::now(),
        }
    }

    /// Create a call whose caller withheld their number
    pub fn anonymous() -> Self {
        Self {
            id: CallId::new(),
            caller_number: None,
            caller_display_name: None,
            received_at: Utc::now(),
        }
    }

    /// Set the presented caller name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.caller_display_name = Some(name.into());
        self
    }

    /// Whether the caller withheld their number
    pub fn is_anonymous(&self) -> bool {
        self.caller_number.as_deref().map_or(true, str::is_empty)
    }
}
