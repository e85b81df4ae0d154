#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use luggage_custody::core::{NewLuggageItem, NewUpdateAudit};
use luggage_custody::store::CapacityGuard;
use luggage_custody::{
    AdminService, CacheMode, CodeSource, CustodyConfig, CustodyError, CustodyHistory,
    CustodyStore, HistoryFilter, Hotel, HotelId, IntakeRequest, ItemFilter, ItemPatch,
    LifecycleEngine, LookupCache, LruLookupCache, LuggageId, LuggageItem, MemoryStore,
    MigrationRecord, NewHotel, NewStoreroom, Result, Role, StaffRegistry, Storeroom, StoreroomId,
    UpdateAuditRecord,
};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PASSWORD: &str = "password123";
pub const STAFF: &str = "bob";
pub const ADMIN: &str = "carol";

pub fn test_config() -> CustodyConfig {
    CustodyConfig::new()
        .password_cost(4)
        .cache(CacheMode::InProcess { capacity: 64 })
}

/// One hotel with a staff member and an admin, over a fresh memory store.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub staff: Arc<StaffRegistry>,
    pub admin: AdminService,
    pub hotel: Hotel,
}

impl World {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let staff = Arc::new(StaffRegistry::with_cost(4));
        let admin = AdminService::new(store.clone(), staff.clone());

        let hotel = admin
            .create_hotel(NewHotel {
                name: "Harbor Hotel".into(),
                address: "1 Quay Street".into(),
                phone: "555-0100".into(),
                active: true,
            })
            .await
            .unwrap();
        admin
            .create_staff(STAFF, PASSWORD, Some(Role::Staff), Some(hotel.id))
            .await
            .unwrap();
        admin
            .create_staff(ADMIN, PASSWORD, Some(Role::Admin), Some(hotel.id))
            .await
            .unwrap();

        Self {
            store,
            staff,
            admin,
            hotel,
        }
    }

    /// Engine over the world's store with OS-random codes and no cache.
    pub fn engine(&self) -> LifecycleEngine {
        self.engine_over(self.store.clone())
    }

    /// Engine that writes through `store` but reads the directory from the world.
    pub fn engine_over(&self, store: Arc<dyn CustodyStore>) -> LifecycleEngine {
        LifecycleEngine::new(store, self.store.clone(), self.staff.clone(), test_config())
    }

    pub async fn room(&self, capacity: u32) -> Storeroom {
        self.room_in(self.hotel.id, capacity, true).await
    }

    pub async fn room_in(&self, hotel_id: HotelId, capacity: u32, active: bool) -> Storeroom {
        self.admin
            .create_storeroom(NewStoreroom {
                hotel_id,
                name: format!("Room {}", capacity),
                location: "Ground floor".into(),
                capacity,
                active,
            })
            .await
            .unwrap()
    }

    pub async fn other_hotel(&self) -> Hotel {
        self.admin
            .create_hotel(NewHotel {
                name: "Summit Lodge".into(),
                active: true,
                ..NewHotel::default()
            })
            .await
            .unwrap()
    }

    pub fn intake(&self, guest: &str, storeroom_id: StoreroomId) -> IntakeRequest {
        IntakeRequest {
            guest_name: guest.into(),
            contact_phone: Some("555-0199".into()),
            description: "black suitcase".into(),
            storeroom_id,
            staff_username: STAFF.into(),
            ..IntakeRequest::default()
        }
    }
}

pub fn lru_cache() -> Arc<LruLookupCache> {
    Arc::new(LruLookupCache::new(NonZeroUsize::new(64).unwrap()))
}

/// Hands out codes from a fixed list, cycling when it runs out.
pub struct ScriptedCodes {
    codes: Vec<String>,
    next: AtomicUsize,
}

impl ScriptedCodes {
    pub fn new(codes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            codes: codes.iter().map(|c| c.to_string()).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn drawn(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl CodeSource for ScriptedCodes {
    fn generate(&self, _length: usize) -> Result<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self.codes[n % self.codes.len()].clone())
    }
}

/// Cache whose every call fails.
pub struct FailingCache;

#[async_trait]
impl LookupCache for FailingCache {
    async fn get(&self, _code: &str) -> Result<Option<Vec<LuggageItem>>> {
        Err(CustodyError::storage("cache unreachable"))
    }

    async fn set(&self, _code: &str, _items: &[LuggageItem], _ttl: Duration) -> Result<()> {
        Err(CustodyError::storage("cache unreachable"))
    }

    async fn delete(&self, _code: &str) -> Result<()> {
        Err(CustodyError::storage("cache unreachable"))
    }
}

/// Working cache whose invalidations always fail.
pub struct StickyCache {
    inner: LruLookupCache,
}

impl StickyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LruLookupCache::new(NonZeroUsize::new(64).unwrap()),
        })
    }
}

#[async_trait]
impl LookupCache for StickyCache {
    async fn get(&self, code: &str) -> Result<Option<Vec<LuggageItem>>> {
        self.inner.get(code).await
    }

    async fn set(&self, code: &str, items: &[LuggageItem], ttl: Duration) -> Result<()> {
        self.inner.set(code, items, ttl).await
    }

    async fn delete(&self, _code: &str) -> Result<()> {
        Err(CustodyError::storage("cache delete refused"))
    }
}

/// Wraps a memory store and injects failures into selected writes.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_retire_of: Mutex<Option<LuggageId>>,
    fail_audit: AtomicBool,
    code_conflicts: AtomicUsize,
    inserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_retire_of: Mutex::new(None),
            fail_audit: AtomicBool::new(false),
            code_conflicts: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        })
    }

    pub fn fail_retire_of(&self, id: LuggageId) {
        *self.fail_retire_of.lock().unwrap() = Some(id);
    }

    pub fn fail_audits(&self) {
        self.fail_audit.store(true, Ordering::SeqCst);
    }

    /// The next `n` inserts fail as if a concurrent intake took their code.
    pub fn conflict_next_inserts(&self, n: usize) {
        self.code_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustodyStore for FlakyStore {
    async fn get_item(&self, id: LuggageId) -> Result<Option<LuggageItem>> {
        self.inner.get_item(id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Vec<LuggageItem>> {
        self.inner.find_by_code(code).await
    }

    async fn code_in_use(&self, code: &str) -> Result<bool> {
        self.inner.code_in_use(code).await
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<LuggageItem>> {
        self.inner.list_items(filter).await
    }

    async fn count_stored(&self, storeroom_id: StoreroomId) -> Result<u64> {
        self.inner.count_stored(storeroom_id).await
    }

    async fn insert_item(
        &self,
        item: NewLuggageItem,
        guard: Option<CapacityGuard>,
    ) -> Result<LuggageItem> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .code_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CustodyError::conflict(
                luggage_custody::store::LIVE_CODE_CONSTRAINT,
                "injected race",
            ));
        }
        self.inner.insert_item(item, guard).await
    }

    async fn update_item(
        &self,
        id: LuggageId,
        patch: &ItemPatch,
        guard: Option<CapacityGuard>,
    ) -> Result<LuggageItem> {
        self.inner.update_item(id, patch, guard).await
    }

    async fn set_code(&self, id: LuggageId, code: &str, qr_url: &str) -> Result<LuggageItem> {
        self.inner.set_code(id, code, qr_url).await
    }

    async fn delete_item(&self, id: LuggageId) -> Result<bool> {
        self.inner.delete_item(id).await
    }

    async fn retire_item(
        &self,
        id: LuggageId,
        retrieved_by: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Result<CustodyHistory> {
        if *self.fail_retire_of.lock().unwrap() == Some(id) {
            return Err(CustodyError::storage("injected retire failure"));
        }
        self.inner.retire_item(id, retrieved_by, retrieved_at).await
    }

    async fn relocate_item(
        &self,
        id: LuggageId,
        to_storeroom_id: StoreroomId,
        guard: Option<CapacityGuard>,
        migrated_by: &str,
    ) -> Result<MigrationRecord> {
        self.inner
            .relocate_item(id, to_storeroom_id, guard, migrated_by)
            .await
    }

    async fn list_history(&self, filter: &HistoryFilter) -> Result<Vec<CustodyHistory>> {
        self.inner.list_history(filter).await
    }

    async fn list_migrations(&self, luggage_id: LuggageId) -> Result<Vec<MigrationRecord>> {
        self.inner.list_migrations(luggage_id).await
    }

    async fn insert_update_audit(&self, record: NewUpdateAudit) -> Result<UpdateAuditRecord> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(CustodyError::storage("injected audit failure"));
        }
        self.inner.insert_update_audit(record).await
    }

    async fn list_update_audits(&self, hotel_id: HotelId) -> Result<Vec<UpdateAuditRecord>> {
        self.inner.list_update_audits(hotel_id).await
    }
}
