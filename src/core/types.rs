use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type HotelId = i64;
pub type StoreroomId = i64;
pub type LuggageId = i64;
pub type RecordId = i64;

/// Custody status of a luggage item.
///
/// Only `Stored` persists on a live record: retrieval deletes the live row and
/// the status `Retrieved` survives in the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LuggageStatus {
    #[default]
    Stored,
    Retrieved,
    Migrated,
}

impl LuggageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LuggageStatus::Stored => "stored",
            LuggageStatus::Retrieved => "retrieved",
            LuggageStatus::Migrated => "migrated",
        }
    }
}

impl fmt::Display for LuggageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LuggageStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stored" => Ok(Self::Stored),
            "retrieved" => Ok(Self::Retrieved),
            "migrated" => Ok(Self::Migrated),
            other => Err(format!("unknown luggage status '{}'", other)),
        }
    }
}

/// Staff account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Staff,
    Admin,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            "guest" => Ok(Self::Guest),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}
