//! Person Identity Models
//!
//! People are keyed by QID. Staff and students additionally carry a
//! role-specific external identifier (EID / HTNO) preferred over the QID
//! in rendered notifications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of person roles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Staff,
    Student,
    Other,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staff => write!(f, "staff"),
            Self::Student => write!(f, "student"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl Role {
    /// Parse from a database string. Unknown values fold into `Other`.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "staff" => Self::Staff,
            "student" => Self::Student,
            _ => Self::Other,
        }
    }
}

/// Human-facing identifier rendered in the notification salutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalId {
    pub label: String,
    pub value: String,
}

impl ExternalId {
    /// Staff employee identifier.
    pub fn eid(value: String) -> Self {
        Self {
            label: "EID".to_string(),
            value,
        }
    }

    /// Student hall-ticket number.
    pub fn htno(value: String) -> Self {
        Self {
            label: "HTNO".to_string(),
            value,
        }
    }

    /// Fallback when no role-specific sub-record exists: the QID itself.
    pub fn generic(qid: &str) -> Self {
        Self {
            label: "QID".to_string(),
            value: qid.to_string(),
        }
    }
}

/// Raw person row as stored. The contact address may be absent for
/// invalid or incomplete records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub qid: String,
    pub name: String,
    pub mail: Option<String>,
    pub role: Role,
}

/// A person that resolved to a usable contact address, ready for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub qid: String,
    pub name: String,
    pub mail: String,
    pub external_id: ExternalId,
}
