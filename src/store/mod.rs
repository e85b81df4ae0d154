//! Record store and directory contracts consumed by the lifecycle engine.
//!
//! Each trait method is one unit of work against the backing store. Compound
//! constraints (live code uniqueness, storeroom capacity) are re-checked by the
//! store at commit time so concurrent callers cannot both pass a stale check.

pub mod memory;
pub mod snapshot;

use crate::core::{
    CustodyHistory, HistoryFilter, Hotel, HotelId, HotelPatch, ItemFilter, ItemPatch,
    LuggageId, LuggageItem, MigrationRecord, NewHotel, NewLuggageItem, NewStoreroom,
    NewUpdateAudit, Result, Storeroom, StoreroomId, UpdateAuditRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use snapshot::CustodySnapshot;

/// Constraint name reported when a code is already held by another live intake.
pub const LIVE_CODE_CONSTRAINT: &str = "live_retrieval_code";
/// Constraint name reported when deleting a storeroom that still holds luggage.
pub const STOREROOM_OCCUPIED_CONSTRAINT: &str = "storeroom_occupied";
/// Constraint name reported when deleting a hotel that still owns storerooms.
pub const HOTEL_STOREROOMS_CONSTRAINT: &str = "hotel_has_storerooms";
/// Constraint name reported when deleting a hotel that still has staff accounts.
pub const HOTEL_STAFF_CONSTRAINT: &str = "hotel_has_staff";

/// Occupancy bound the store enforces while it writes an item into a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityGuard {
    pub storeroom_id: StoreroomId,
    pub capacity: u32,
}

impl CapacityGuard {
    /// `None` for unlimited rooms, which need no commit-time check.
    pub fn for_room(room: &Storeroom) -> Option<Self> {
        if room.is_unlimited() {
            None
        } else {
            Some(Self {
                storeroom_id: room.id,
                capacity: room.capacity,
            })
        }
    }
}

#[async_trait]
pub trait CustodyStore: Send + Sync {
    async fn get_item(&self, id: LuggageId) -> Result<Option<LuggageItem>>;

    /// All live items holding `code`. May return more than one.
    async fn find_by_code(&self, code: &str) -> Result<Vec<LuggageItem>>;

    async fn code_in_use(&self, code: &str) -> Result<bool>;

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<LuggageItem>>;

    async fn count_stored(&self, storeroom_id: StoreroomId) -> Result<u64>;

    /// Inserts a live item.
    ///
    /// Fails with `Conflict` on [`LIVE_CODE_CONSTRAINT`] when another intake
    /// holds the code, and with `Full` when `guard` is exceeded.
    async fn insert_item(
        &self,
        item: NewLuggageItem,
        guard: Option<CapacityGuard>,
    ) -> Result<LuggageItem>;

    /// Applies `patch` and returns the updated record. `guard` applies to the
    /// destination room when the patch relocates the item.
    async fn update_item(
        &self,
        id: LuggageId,
        patch: &ItemPatch,
        guard: Option<CapacityGuard>,
    ) -> Result<LuggageItem>;

    async fn set_code(&self, id: LuggageId, code: &str, qr_url: &str) -> Result<LuggageItem>;

    async fn delete_item(&self, id: LuggageId) -> Result<bool>;

    /// Marks the item retrieved, writes its history row and deletes the live
    /// record as one unit.
    ///
    /// Idempotent per luggage id: if a history row already exists it is
    /// returned and no second row is written.
    async fn retire_item(
        &self,
        id: LuggageId,
        retrieved_by: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Result<CustodyHistory>;

    /// Moves a stored item and appends its migration record as one unit.
    async fn relocate_item(
        &self,
        id: LuggageId,
        to_storeroom_id: StoreroomId,
        guard: Option<CapacityGuard>,
        migrated_by: &str,
    ) -> Result<MigrationRecord>;

    async fn list_history(&self, filter: &HistoryFilter) -> Result<Vec<CustodyHistory>>;

    async fn list_migrations(&self, luggage_id: LuggageId) -> Result<Vec<MigrationRecord>>;

    async fn insert_update_audit(&self, record: NewUpdateAudit) -> Result<UpdateAuditRecord>;

    async fn list_update_audits(&self, hotel_id: HotelId) -> Result<Vec<UpdateAuditRecord>>;
}

/// Read side of the hotel/storeroom directory.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn storeroom(&self, id: StoreroomId) -> Result<Option<Storeroom>>;

    async fn hotel(&self, id: HotelId) -> Result<Option<Hotel>>;
}

/// Write side of the directory, used by administration only.
#[async_trait]
pub trait DirectoryAdmin: Directory {
    async fn insert_hotel(&self, hotel: NewHotel) -> Result<Hotel>;

    async fn update_hotel(&self, id: HotelId, patch: &HotelPatch) -> Result<Hotel>;

    /// Refuses with `Conflict` on [`HOTEL_STOREROOMS_CONSTRAINT`] while any
    /// storeroom still belongs to the hotel.
    async fn delete_hotel(&self, id: HotelId) -> Result<bool>;

    async fn list_hotels(&self) -> Result<Vec<Hotel>>;

    async fn insert_storeroom(&self, room: NewStoreroom) -> Result<Storeroom>;

    async fn set_storeroom_active(&self, id: StoreroomId, active: bool) -> Result<Storeroom>;

    /// Refuses with `Conflict` on [`STOREROOM_OCCUPIED_CONSTRAINT`] while the
    /// room still holds stored items.
    async fn delete_storeroom(&self, id: StoreroomId) -> Result<bool>;

    async fn list_storerooms(&self, hotel_id: HotelId) -> Result<Vec<Storeroom>>;
}
