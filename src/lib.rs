// ============================================================================
// Luggage Custody Library
// ============================================================================

pub mod admin;
pub mod cache;
pub mod capacity;
pub mod codegen;
pub mod config;
pub mod core;
pub mod engine;
pub mod identity;
pub mod store;

// Re-export main types for convenience
pub use admin::AdminService;
pub use cache::{LookupCache, LruLookupCache, NoopCache};
pub use capacity::{Admission, AdmittedRoom, CapacityGate, Rejection};
pub use codegen::{
    CodeAlphabet, CodeSearch, CodeSource, OsCodeSource, claim_unique_code, find_unique_code,
};
pub use config::{CacheMode, CustodyConfig};
pub use core::{
    CustodyError, CustodyHistory, Entity, HistoryFilter, Hotel, HotelId, HotelPatch, ItemFilter,
    ItemPatch, LuggageId, LuggageItem, LuggageStatus, MigrationRecord, NewHotel, NewStoreroom,
    Result, Role, Storeroom, StoreroomId, UpdateAuditRecord,
};
pub use engine::{AuditOutcome, BatchIntake, BatchLine, IntakeRequest, LifecycleEngine, UpdateReport};
pub use identity::{IdentityResolver, StaffRegistry, StaffUser};
pub use store::{CustodySnapshot, CustodyStore, Directory, DirectoryAdmin, MemoryStore};

use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Custody facade
// ============================================================================

/// In-process custody service: one memory store, one staff registry and the
/// engine and admin surfaces wired over them.
///
/// # Examples
///
/// ```ignore
/// use luggage_custody::{Custody, CustodyConfig, IntakeRequest, NewHotel, NewStoreroom, Role};
///
/// let custody = Custody::in_memory(CustodyConfig::default())?;
/// let hotel = custody.admin().create_hotel(NewHotel { name: "Harbor".into(), active: true, ..Default::default() }).await?;
/// let room = custody.admin().create_storeroom(NewStoreroom { hotel_id: hotel.id, name: "Lobby".into(), active: true, ..Default::default() }).await?;
/// custody.admin().create_staff("bob", "password123", Some(Role::Staff), Some(hotel.id)).await?;
///
/// let item = custody.engine().create(IntakeRequest {
///     guest_name: "Alice".into(),
///     storeroom_id: room.id,
///     staff_username: "bob".into(),
///     ..Default::default()
/// }).await?;
/// let handed_back = custody.engine().retrieve(&item.retrieval_code, "bob").await?;
/// ```
pub struct Custody {
    store: Arc<MemoryStore>,
    staff: Arc<StaffRegistry>,
    engine: LifecycleEngine,
    admin: AdminService,
}

impl Custody {
    /// Empty service built from `config`
    pub fn in_memory(config: CustodyConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let staff = Arc::new(StaffRegistry::with_cost(config.password_cost));
        Self::assemble(store, staff, config)
    }

    /// Service restored from a snapshot
    pub fn from_snapshot(snapshot: CustodySnapshot, config: CustodyConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::from_tables(snapshot.tables));
        let staff = Arc::new(StaffRegistry::from_users(snapshot.users, config.password_cost));
        Self::assemble(store, staff, config)
    }

    /// Loads `path` when it exists, otherwise starts empty.
    pub fn open(path: &Path, config: CustodyConfig) -> Result<Self> {
        if path.exists() {
            Self::from_snapshot(CustodySnapshot::load(path)?, config)
        } else {
            Self::in_memory(config)
        }
    }

    fn assemble(store: Arc<MemoryStore>, staff: Arc<StaffRegistry>, config: CustodyConfig) -> Result<Self> {
        config.validate()?;
        let cache = cache::from_config(&config)?;
        let engine = LifecycleEngine::new(store.clone(), store.clone(), staff.clone(), config)
            .with_cache(cache);
        let admin = AdminService::new(store.clone(), staff.clone());
        Ok(Self {
            store,
            staff,
            engine,
            admin,
        })
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Consistent copy of the store and the staff accounts.
    pub async fn snapshot(&self) -> CustodySnapshot {
        let tables = self.store.tables().await;
        let users = self.staff.export_users().await;
        CustodySnapshot::new(tables, users)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.snapshot().await.save(path)
    }
}
