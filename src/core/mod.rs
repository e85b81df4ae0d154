pub mod error;
pub mod model;
pub mod types;

pub use error::{CustodyError, Entity, Result};
pub use model::{
    CustodyHistory, HistoryFilter, Hotel, HotelPatch, ItemFilter, ItemPatch, LuggageItem,
    MigrationRecord, NewHotel, NewLuggageItem, NewStoreroom, NewUpdateAudit, Storeroom,
    UpdateAuditRecord,
};
pub use types::{HotelId, LuggageId, LuggageStatus, RecordId, Role, StoreroomId};
