use super::types::{HotelId, LuggageId, LuggageStatus, Role, StoreroomId};
use thiserror::Error;

/// Kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Luggage,
    Storeroom,
    Hotel,
    Staff,
    RetrievalCode,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Luggage => "luggage",
            Entity::Storeroom => "storeroom",
            Entity::Hotel => "hotel",
            Entity::Staff => "staff user",
            Entity::RetrievalCode => "retrieval code",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CustodyError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: Entity, key: String },

    #[error("user '{username}' does not have the {required} role")]
    PermissionMismatch { username: String, required: Role },

    #[error("storeroom {storeroom_id} is inactive")]
    Inactive { storeroom_id: StoreroomId },

    #[error("storeroom {storeroom_id} belongs to hotel {actual}, expected hotel {expected}")]
    HotelMismatch {
        storeroom_id: StoreroomId,
        expected: HotelId,
        actual: HotelId,
    },

    #[error("storeroom {storeroom_id} is full (capacity {capacity})")]
    Full { storeroom_id: StoreroomId, capacity: u32 },

    #[error("could not mint a unique retrieval code after {attempts} attempts")]
    CodeExhausted { attempts: usize },

    #[error("luggage {luggage_id} is not in custody (status '{status}')")]
    NotInCustody { luggage_id: LuggageId, status: LuggageStatus },

    #[error("nothing is stored under retrieval code '{code}'")]
    NothingStored { code: String },

    #[error("constraint '{constraint}' violated: {detail}")]
    Conflict { constraint: &'static str, detail: String },

    #[error("retrieval halted at luggage {luggage_id} after {retrieved} item(s): {source}")]
    RetrievalHalted {
        retrieved: usize,
        luggage_id: LuggageId,
        #[source]
        source: Box<CustodyError>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("randomness source unavailable: {0}")]
    Randomness(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CustodyError>;

impl CustodyError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: Entity, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn conflict(constraint: &'static str, detail: impl Into<String>) -> Self {
        Self::Conflict {
            constraint,
            detail: detail.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// True when the error is a store-level uniqueness violation on `constraint`.
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, Self::Conflict { constraint: c, .. } if *c == constraint)
    }

    /// Business-rule failures are returned to callers as-is; everything else
    /// is an infrastructure failure.
    pub fn is_business(&self) -> bool {
        !matches!(
            self,
            Self::Storage(_) | Self::Randomness(_) | Self::Config(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for CustodyError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Storage(format!("lock poisoned: {}", err))
    }
}

impl From<serde_json::Error> for CustodyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization failed: {}", err))
    }
}
