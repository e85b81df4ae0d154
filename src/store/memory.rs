use super::{
    CapacityGuard, CustodyStore, Directory, DirectoryAdmin, HOTEL_STOREROOMS_CONSTRAINT,
    LIVE_CODE_CONSTRAINT, STOREROOM_OCCUPIED_CONSTRAINT,
};
use crate::core::{
    CustodyError, CustodyHistory, Entity, HistoryFilter, Hotel, HotelId, HotelPatch, ItemFilter,
    ItemPatch, LuggageId, LuggageItem, LuggageStatus, MigrationRecord, NewHotel, NewLuggageItem,
    NewStoreroom, NewUpdateAudit, RecordId, Result, Storeroom, StoreroomId, UpdateAuditRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{Level, event};
use uuid::Uuid;

/// Id counters, one per table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sequences {
    hotel: i64,
    storeroom: i64,
    luggage: i64,
    history: i64,
    migration: i64,
    update: i64,
}

fn next_id(counter: &mut i64) -> RecordId {
    *counter += 1;
    *counter
}

/// Every table of the store. Serializable so it can be snapshotted as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    pub hotels: BTreeMap<HotelId, Hotel>,
    pub storerooms: BTreeMap<StoreroomId, Storeroom>,
    pub items: BTreeMap<LuggageId, LuggageItem>,
    pub history: Vec<CustodyHistory>,
    pub migrations: Vec<MigrationRecord>,
    pub updates: Vec<UpdateAuditRecord>,
    pub sequences: Sequences,
}

impl Tables {
    fn stored_in(&self, storeroom_id: StoreroomId, excluding: Option<LuggageId>) -> u64 {
        self.items
            .values()
            .filter(|item| item.storeroom_id == storeroom_id && item.is_stored())
            .filter(|item| Some(item.id) != excluding)
            .count() as u64
    }

    fn check_capacity(&self, guard: Option<CapacityGuard>, excluding: Option<LuggageId>) -> Result<()> {
        let Some(guard) = guard else {
            return Ok(());
        };
        if guard.capacity == 0 {
            return Ok(());
        }
        if self.stored_in(guard.storeroom_id, excluding) >= guard.capacity as u64 {
            return Err(CustodyError::Full {
                storeroom_id: guard.storeroom_id,
                capacity: guard.capacity,
            });
        }
        Ok(())
    }

    /// A live code may only be shared inside one intake group.
    fn check_code(&self, code: &str, intake_id: Uuid, excluding: Option<LuggageId>) -> Result<()> {
        let taken = self.items.values().any(|item| {
            item.retrieval_code == code && item.intake_id != intake_id && Some(item.id) != excluding
        });
        if taken {
            return Err(CustodyError::conflict(
                LIVE_CODE_CONSTRAINT,
                format!("retrieval code '{}' is held by another live intake", code),
            ));
        }
        Ok(())
    }

    fn item_mut(&mut self, id: LuggageId) -> Result<&mut LuggageItem> {
        self.items
            .get_mut(&id)
            .ok_or_else(|| CustodyError::not_found(Entity::Luggage, id))
    }
}

/// In-memory custody store and directory.
///
/// All tables live behind a single lock, so every trait method is atomic with
/// respect to every other one.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_tables(Tables::default())
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Consistent copy of every table.
    pub async fn tables(&self) -> Tables {
        self.tables.read().await.clone()
    }

    pub async fn history_count(&self, luggage_id: LuggageId) -> usize {
        self.tables
            .read()
            .await
            .history
            .iter()
            .filter(|record| record.luggage_id == luggage_id)
            .count()
    }
}

#[async_trait]
impl CustodyStore for MemoryStore {
    async fn get_item(&self, id: LuggageId) -> Result<Option<LuggageItem>> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Vec<LuggageItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|item| item.retrieval_code == code)
            .cloned()
            .collect())
    }

    async fn code_in_use(&self, code: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.items.values().any(|item| item.retrieval_code == code))
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<LuggageItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<LuggageItem> = tables
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.stored_at.cmp(&a.stored_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn count_stored(&self, storeroom_id: StoreroomId) -> Result<u64> {
        Ok(self.tables.read().await.stored_in(storeroom_id, None))
    }

    async fn insert_item(
        &self,
        item: NewLuggageItem,
        guard: Option<CapacityGuard>,
    ) -> Result<LuggageItem> {
        let mut tables = self.tables.write().await;
        tables.check_code(&item.retrieval_code, item.intake_id, None)?;
        tables.check_capacity(guard, None)?;

        let id = next_id(&mut tables.sequences.luggage);
        let item = item.into_item(id);
        tables.items.insert(id, item.clone());
        Ok(item)
    }

    async fn update_item(
        &self,
        id: LuggageId,
        patch: &ItemPatch,
        guard: Option<CapacityGuard>,
    ) -> Result<LuggageItem> {
        let mut tables = self.tables.write().await;
        let current = tables.item_mut(id)?.storeroom_id;
        if patch.relocation(current).is_some() {
            tables.check_capacity(guard, Some(id))?;
        }

        let item = tables.item_mut(id)?;
        patch.apply_to(item);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn set_code(&self, id: LuggageId, code: &str, qr_url: &str) -> Result<LuggageItem> {
        let mut tables = self.tables.write().await;
        let intake_id = tables.item_mut(id)?.intake_id;
        tables.check_code(code, intake_id, Some(id))?;

        let item = tables.item_mut(id)?;
        item.retrieval_code = code.to_string();
        item.qr_url = qr_url.to_string();
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete_item(&self, id: LuggageId) -> Result<bool> {
        Ok(self.tables.write().await.items.remove(&id).is_some())
    }

    async fn retire_item(
        &self,
        id: LuggageId,
        retrieved_by: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Result<CustodyHistory> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.history.iter().find(|h| h.luggage_id == id).cloned() {
            tables.items.remove(&id);
            event!(Level::INFO, luggage_id = id, "retirement replay, history row already present");
            return Ok(existing);
        }

        let item = tables.item_mut(id)?;
        if !item.is_stored() {
            return Err(CustodyError::NotInCustody {
                luggage_id: id,
                status: item.status,
            });
        }
        item.status = LuggageStatus::Retrieved;
        item.retrieved_by = Some(retrieved_by.to_string());
        item.retrieved_at = Some(retrieved_at);
        item.updated_at = retrieved_at;
        let retired = item.clone();

        let history_id = next_id(&mut tables.sequences.history);
        let record = CustodyHistory::from_retired(history_id, &retired, retrieved_by, retrieved_at);
        tables.history.push(record.clone());
        tables.items.remove(&id);
        Ok(record)
    }

    async fn relocate_item(
        &self,
        id: LuggageId,
        to_storeroom_id: StoreroomId,
        guard: Option<CapacityGuard>,
        migrated_by: &str,
    ) -> Result<MigrationRecord> {
        let mut tables = self.tables.write().await;
        let item = tables.item_mut(id)?;
        if !item.is_stored() {
            return Err(CustodyError::NotInCustody {
                luggage_id: id,
                status: item.status,
            });
        }
        tables.check_capacity(guard, Some(id))?;

        let now = Utc::now();
        let item = tables.item_mut(id)?;
        let from_storeroom_id = item.storeroom_id;
        let hotel_id = item.hotel_id;
        item.storeroom_id = to_storeroom_id;
        item.updated_at = now;

        let record = MigrationRecord {
            id: next_id(&mut tables.sequences.migration),
            hotel_id,
            luggage_id: id,
            from_storeroom_id,
            to_storeroom_id,
            migrated_by: migrated_by.to_string(),
            migrated_at: now,
        };
        tables.migrations.push(record.clone());
        Ok(record)
    }

    async fn list_history(&self, filter: &HistoryFilter) -> Result<Vec<CustodyHistory>> {
        let tables = self.tables.read().await;
        let mut records: Vec<CustodyHistory> = tables
            .history
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.retrieved_at.cmp(&a.retrieved_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn list_migrations(&self, luggage_id: LuggageId) -> Result<Vec<MigrationRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<MigrationRecord> = tables
            .migrations
            .iter()
            .filter(|record| record.luggage_id == luggage_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.migrated_at.cmp(&a.migrated_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn insert_update_audit(&self, record: NewUpdateAudit) -> Result<UpdateAuditRecord> {
        let mut tables = self.tables.write().await;
        let record = UpdateAuditRecord {
            id: next_id(&mut tables.sequences.update),
            hotel_id: record.hotel_id,
            luggage_id: record.luggage_id,
            updated_by: record.updated_by,
            changed_fields: record.changed_fields,
            old_data: record.old_data,
            new_data: record.new_data,
            updated_at: record.updated_at,
        };
        tables.updates.push(record.clone());
        Ok(record)
    }

    async fn list_update_audits(&self, hotel_id: HotelId) -> Result<Vec<UpdateAuditRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<UpdateAuditRecord> = tables
            .updates
            .iter()
            .filter(|record| record.hotel_id == hotel_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn storeroom(&self, id: StoreroomId) -> Result<Option<Storeroom>> {
        Ok(self.tables.read().await.storerooms.get(&id).cloned())
    }

    async fn hotel(&self, id: HotelId) -> Result<Option<Hotel>> {
        Ok(self.tables.read().await.hotels.get(&id).cloned())
    }
}

#[async_trait]
impl DirectoryAdmin for MemoryStore {
    async fn insert_hotel(&self, hotel: NewHotel) -> Result<Hotel> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let hotel = Hotel {
            id: next_id(&mut tables.sequences.hotel),
            name: hotel.name,
            address: hotel.address,
            phone: hotel.phone,
            active: hotel.active,
            created_at: now,
            updated_at: now,
        };
        tables.hotels.insert(hotel.id, hotel.clone());
        Ok(hotel)
    }

    async fn update_hotel(&self, id: HotelId, patch: &HotelPatch) -> Result<Hotel> {
        let mut tables = self.tables.write().await;
        let hotel = tables
            .hotels
            .get_mut(&id)
            .ok_or_else(|| CustodyError::not_found(Entity::Hotel, id))?;
        patch.apply_to(hotel);
        hotel.updated_at = Utc::now();
        Ok(hotel.clone())
    }

    async fn delete_hotel(&self, id: HotelId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let rooms = tables.storerooms.values().filter(|room| room.hotel_id == id).count();
        if rooms > 0 {
            return Err(CustodyError::conflict(
                HOTEL_STOREROOMS_CONSTRAINT,
                format!("hotel {} still owns {} storeroom(s)", id, rooms),
            ));
        }
        Ok(tables.hotels.remove(&id).is_some())
    }

    async fn list_hotels(&self) -> Result<Vec<Hotel>> {
        Ok(self.tables.read().await.hotels.values().cloned().collect())
    }

    async fn insert_storeroom(&self, room: NewStoreroom) -> Result<Storeroom> {
        let mut tables = self.tables.write().await;
        if !tables.hotels.contains_key(&room.hotel_id) {
            return Err(CustodyError::not_found(Entity::Hotel, room.hotel_id));
        }
        let room = Storeroom {
            id: next_id(&mut tables.sequences.storeroom),
            hotel_id: room.hotel_id,
            name: room.name,
            location: room.location,
            capacity: room.capacity,
            active: room.active,
            created_at: Utc::now(),
        };
        tables.storerooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn set_storeroom_active(&self, id: StoreroomId, active: bool) -> Result<Storeroom> {
        let mut tables = self.tables.write().await;
        let room = tables
            .storerooms
            .get_mut(&id)
            .ok_or_else(|| CustodyError::not_found(Entity::Storeroom, id))?;
        room.active = active;
        Ok(room.clone())
    }

    async fn delete_storeroom(&self, id: StoreroomId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let occupied = tables.stored_in(id, None);
        if occupied > 0 {
            return Err(CustodyError::conflict(
                STOREROOM_OCCUPIED_CONSTRAINT,
                format!("storeroom {} still holds {} item(s)", id, occupied),
            ));
        }
        Ok(tables.storerooms.remove(&id).is_some())
    }

    async fn list_storerooms(&self, hotel_id: HotelId) -> Result<Vec<Storeroom>> {
        let tables = self.tables.read().await;
        Ok(tables
            .storerooms
            .values()
            .filter(|room| room.hotel_id == hotel_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(code: &str, intake_id: Uuid, storeroom_id: StoreroomId) -> NewLuggageItem {
        NewLuggageItem {
            intake_id,
            guest_name: "Alice".into(),
            contact_phone: None,
            contact_email: None,
            description: String::new(),
            quantity: 1,
            notes: String::new(),
            photos: Vec::new(),
            hotel_id: 1,
            storeroom_id,
            retrieval_code: code.into(),
            qr_url: format!("/qr/{}", code),
            stored_by: "bob".into(),
            stored_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn live_code_is_unique_across_intakes_but_shared_within_one() {
        let store = MemoryStore::new();
        let batch = Uuid::new_v4();

        store.insert_item(new_item("123456", batch, 1), None).await.unwrap();
        store.insert_item(new_item("123456", batch, 1), None).await.unwrap();

        let err = store
            .insert_item(new_item("123456", Uuid::new_v4(), 1), None)
            .await
            .unwrap_err();
        assert!(err.is_conflict_on(LIVE_CODE_CONSTRAINT));
        assert_eq!(store.find_by_code("123456").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn insert_enforces_capacity_guard() {
        let store = MemoryStore::new();
        let guard = Some(CapacityGuard {
            storeroom_id: 3,
            capacity: 1,
        });

        store.insert_item(new_item("111111", Uuid::new_v4(), 3), guard).await.unwrap();
        let err = store
            .insert_item(new_item("222222", Uuid::new_v4(), 3), guard)
            .await
            .unwrap_err();
        assert!(matches!(err, CustodyError::Full { storeroom_id: 3, capacity: 1 }));
    }

    #[tokio::test]
    async fn retirement_is_idempotent_per_luggage_id() {
        let store = MemoryStore::new();
        let item = store
            .insert_item(new_item("654321", Uuid::new_v4(), 1), None)
            .await
            .unwrap();

        let first = store.retire_item(item.id, "bob", Utc::now()).await.unwrap();
        let second = store.retire_item(item.id, "carol", Utc::now()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.status, LuggageStatus::Retrieved);
        assert_eq!(store.history_count(item.id).await, 1);
        assert!(store.get_item(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retiring_unknown_item_is_not_found() {
        let store = MemoryStore::new();
        let err = store.retire_item(99, "bob", Utc::now()).await.unwrap_err();
        assert!(matches!(err, CustodyError::NotFound { entity: Entity::Luggage, .. }));
    }

    #[tokio::test]
    async fn occupied_storeroom_cannot_be_deleted() {
        let store = MemoryStore::new();
        let hotel = store
            .insert_hotel(NewHotel {
                name: "Harbor".into(),
                active: true,
                ..NewHotel::default()
            })
            .await
            .unwrap();
        let room = store
            .insert_storeroom(NewStoreroom {
                hotel_id: hotel.id,
                name: "Back office".into(),
                active: true,
                ..NewStoreroom::default()
            })
            .await
            .unwrap();
        store
            .insert_item(new_item("777777", Uuid::new_v4(), room.id), None)
            .await
            .unwrap();

        let err = store.delete_storeroom(room.id).await.unwrap_err();
        assert!(err.is_conflict_on(STOREROOM_OCCUPIED_CONSTRAINT));
    }
}
