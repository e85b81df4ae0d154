//! Storeroom admission checks.
//!
//! The gate answers from a point-in-time read. Writers pass the admitted room's
//! [`CapacityGuard`] to the store, which repeats the count under its write lock.

use crate::core::{CustodyError, Entity, HotelId, Result, Storeroom, StoreroomId};
use crate::store::{CapacityGuard, CustodyStore, Directory};
use std::sync::Arc;

/// Why a room turned an item away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotFound { storeroom_id: StoreroomId },
    Inactive { storeroom_id: StoreroomId },
    Full { storeroom_id: StoreroomId, capacity: u32 },
}

impl From<Rejection> for CustodyError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NotFound { storeroom_id } => {
                CustodyError::not_found(Entity::Storeroom, storeroom_id)
            }
            Rejection::Inactive { storeroom_id } => CustodyError::Inactive { storeroom_id },
            Rejection::Full {
                storeroom_id,
                capacity,
            } => CustodyError::Full {
                storeroom_id,
                capacity,
            },
        }
    }
}

/// A room that passed admission, with the occupancy seen at the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedRoom {
    pub storeroom: Storeroom,
    pub occupied: u64,
}

impl AdmittedRoom {
    pub fn guard(&self) -> Option<CapacityGuard> {
        CapacityGuard::for_room(&self.storeroom)
    }

    pub fn hotel_id(&self) -> HotelId {
        self.storeroom.hotel_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admit(AdmittedRoom),
    Reject(Rejection),
}

#[derive(Clone)]
pub struct CapacityGate {
    directory: Arc<dyn Directory>,
    store: Arc<dyn CustodyStore>,
}

impl CapacityGate {
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn CustodyStore>) -> Self {
        Self { directory, store }
    }

    /// Checks existence, then the active flag, then occupancy. Capacity 0 skips
    /// the count entirely.
    pub async fn admit(&self, storeroom_id: StoreroomId) -> Result<Admission> {
        let Some(storeroom) = self.directory.storeroom(storeroom_id).await? else {
            return Ok(Admission::Reject(Rejection::NotFound { storeroom_id }));
        };
        if !storeroom.active {
            return Ok(Admission::Reject(Rejection::Inactive { storeroom_id }));
        }
        self.check_occupancy(storeroom).await
    }

    /// Like [`admit`](Self::admit) but turns a rejection into its error.
    pub async fn require(&self, storeroom_id: StoreroomId) -> Result<AdmittedRoom> {
        match self.admit(storeroom_id).await? {
            Admission::Admit(room) => Ok(room),
            Admission::Reject(rejection) => Err(rejection.into()),
        }
    }

    /// Admission of a transfer destination for an item owned by `hotel_id`.
    ///
    /// Hotel ownership is checked before the active flag and the capacity.
    pub async fn admit_destination(
        &self,
        hotel_id: HotelId,
        storeroom_id: StoreroomId,
    ) -> Result<AdmittedRoom> {
        let storeroom = self
            .directory
            .storeroom(storeroom_id)
            .await?
            .ok_or_else(|| CustodyError::not_found(Entity::Storeroom, storeroom_id))?;
        if storeroom.hotel_id != hotel_id {
            return Err(CustodyError::HotelMismatch {
                storeroom_id,
                expected: hotel_id,
                actual: storeroom.hotel_id,
            });
        }
        if !storeroom.active {
            return Err(CustodyError::Inactive { storeroom_id });
        }
        match self.check_occupancy(storeroom).await? {
            Admission::Admit(room) => Ok(room),
            Admission::Reject(rejection) => Err(rejection.into()),
        }
    }

    async fn check_occupancy(&self, storeroom: Storeroom) -> Result<Admission> {
        if storeroom.is_unlimited() {
            return Ok(Admission::Admit(AdmittedRoom {
                storeroom,
                occupied: 0,
            }));
        }

        let occupied = self.store.count_stored(storeroom.id).await?;
        if occupied >= storeroom.capacity as u64 {
            return Ok(Admission::Reject(Rejection::Full {
                storeroom_id: storeroom.id,
                capacity: storeroom.capacity,
            }));
        }
        Ok(Admission::Admit(AdmittedRoom {
            storeroom,
            occupied,
        }))
    }
}
