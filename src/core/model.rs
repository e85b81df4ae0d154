//! Custody records and the patch/filter types used to read and mutate them.

use super::error::{CustodyError, Result};
use super::types::{HotelId, LuggageId, LuggageStatus, RecordId, StoreroomId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Live custody record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuggageItem {
    pub id: LuggageId,
    /// Items minted in one intake share this id and their retrieval code.
    pub intake_id: Uuid,
    pub guest_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub description: String,
    pub quantity: u32,
    pub notes: String,
    pub photos: Vec<String>,
    pub hotel_id: HotelId,
    pub storeroom_id: StoreroomId,
    pub retrieval_code: String,
    pub qr_url: String,
    pub status: LuggageStatus,
    pub stored_by: String,
    pub retrieved_by: Option<String>,
    pub retrieved_at: Option<DateTime<Utc>>,
    pub stored_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LuggageItem {
    pub fn primary_photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }

    pub fn is_stored(&self) -> bool {
        self.status == LuggageStatus::Stored
    }
}

/// Insert payload for a live item. The store assigns `id` and `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLuggageItem {
    pub intake_id: Uuid,
    pub guest_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub description: String,
    pub quantity: u32,
    pub notes: String,
    pub photos: Vec<String>,
    pub hotel_id: HotelId,
    pub storeroom_id: StoreroomId,
    pub retrieval_code: String,
    pub qr_url: String,
    pub stored_by: String,
    pub stored_at: DateTime<Utc>,
}

impl NewLuggageItem {
    pub fn into_item(self, id: LuggageId) -> LuggageItem {
        LuggageItem {
            id,
            intake_id: self.intake_id,
            guest_name: self.guest_name,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            description: self.description,
            quantity: self.quantity,
            notes: self.notes,
            photos: self.photos,
            hotel_id: self.hotel_id,
            storeroom_id: self.storeroom_id,
            retrieval_code: self.retrieval_code,
            qr_url: self.qr_url,
            status: LuggageStatus::Stored,
            stored_by: self.stored_by,
            retrieved_by: None,
            retrieved_at: None,
            stored_at: self.stored_at,
            updated_at: self.stored_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHotel {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
}

impl HotelPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.phone.is_none() && self.active.is_none()
    }

    pub fn apply_to(&self, hotel: &mut Hotel) {
        if let Some(name) = &self.name {
            hotel.name = name.clone();
        }
        if let Some(address) = &self.address {
            hotel.address = address.clone();
        }
        if let Some(phone) = &self.phone {
            hotel.phone = phone.clone();
        }
        if let Some(active) = self.active {
            hotel.active = active;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storeroom {
    pub id: StoreroomId,
    pub hotel_id: HotelId,
    pub name: String,
    pub location: String,
    /// 0 means unlimited
    pub capacity: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Storeroom {
    pub fn is_unlimited(&self) -> bool {
        self.capacity == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStoreroom {
    pub hotel_id: HotelId,
    pub name: String,
    pub location: String,
    pub capacity: u32,
    pub active: bool,
}

/// Snapshot of an item at retrieval. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyHistory {
    pub id: RecordId,
    pub luggage_id: LuggageId,
    pub intake_id: Uuid,
    pub guest_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub description: String,
    pub quantity: u32,
    pub notes: String,
    pub photos: Vec<String>,
    pub hotel_id: HotelId,
    pub storeroom_id: StoreroomId,
    pub retrieval_code: String,
    pub qr_url: String,
    pub status: LuggageStatus,
    pub stored_by: String,
    pub retrieved_by: String,
    pub stored_at: DateTime<Utc>,
    pub retrieved_at: DateTime<Utc>,
}

impl CustodyHistory {
    pub fn from_retired(
        id: RecordId,
        item: &LuggageItem,
        retrieved_by: &str,
        retrieved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            luggage_id: item.id,
            intake_id: item.intake_id,
            guest_name: item.guest_name.clone(),
            contact_phone: item.contact_phone.clone(),
            contact_email: item.contact_email.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            notes: item.notes.clone(),
            photos: item.photos.clone(),
            hotel_id: item.hotel_id,
            storeroom_id: item.storeroom_id,
            retrieval_code: item.retrieval_code.clone(),
            qr_url: item.qr_url.clone(),
            status: LuggageStatus::Retrieved,
            stored_by: item.stored_by.clone(),
            retrieved_by: retrieved_by.to_string(),
            stored_at: item.stored_at,
            retrieved_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: RecordId,
    pub hotel_id: HotelId,
    pub luggage_id: LuggageId,
    pub from_storeroom_id: StoreroomId,
    pub to_storeroom_id: StoreroomId,
    pub migrated_by: String,
    pub migrated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAuditRecord {
    pub id: RecordId,
    pub hotel_id: HotelId,
    pub luggage_id: LuggageId,
    pub updated_by: String,
    pub changed_fields: Vec<String>,
    /// JSON snapshot before the change
    pub old_data: String,
    /// JSON snapshot after the change
    pub new_data: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUpdateAudit {
    pub hotel_id: HotelId,
    pub luggage_id: LuggageId,
    pub updated_by: String,
    pub changed_fields: Vec<String>,
    pub old_data: String,
    pub new_data: String,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a live item: `Some` overwrites, `None` leaves the field alone.
///
/// An empty string for a contact field clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub guest_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub notes: Option<String>,
    pub photos: Option<Vec<String>>,
    pub storeroom_id: Option<StoreroomId>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.guest_name.is_none()
            && self.contact_phone.is_none()
            && self.contact_email.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.notes.is_none()
            && self.photos.is_none()
            && self.storeroom_id.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CustodyError::invalid("patch", "no fields to update"));
        }
        if let Some(name) = &self.guest_name {
            if name.trim().is_empty() {
                return Err(CustodyError::invalid("guest_name", "must not be empty"));
            }
        }
        if self.quantity == Some(0) {
            return Err(CustodyError::invalid("quantity", "must be greater than 0"));
        }
        if let Some(id) = self.storeroom_id {
            if id <= 0 {
                return Err(CustodyError::invalid("storeroom_id", format!("{} is not a valid id", id)));
            }
        }
        Ok(())
    }

    /// Storeroom the patch moves the item to, if it differs from `current`.
    pub fn relocation(&self, current: StoreroomId) -> Option<StoreroomId> {
        self.storeroom_id.filter(|target| *target != current)
    }

    pub fn apply_to(&self, item: &mut LuggageItem) {
        if let Some(name) = &self.guest_name {
            item.guest_name = name.clone();
        }
        if let Some(phone) = &self.contact_phone {
            item.contact_phone = non_empty(phone);
        }
        if let Some(email) = &self.contact_email {
            item.contact_email = non_empty(email);
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(notes) = &self.notes {
            item.notes = notes.clone();
        }
        if let Some(photos) = &self.photos {
            item.photos = photos.clone();
        }
        if let Some(storeroom_id) = self.storeroom_id {
            item.storeroom_id = storeroom_id;
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Conjunctive filter over live items. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub hotel_id: Option<HotelId>,
    pub storeroom_id: Option<StoreroomId>,
    pub guest_name: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<LuggageStatus>,
    pub stored_by: Option<String>,
}

impl ItemFilter {
    pub fn hotel(hotel_id: HotelId) -> Self {
        Self {
            hotel_id: Some(hotel_id),
            ..Self::default()
        }
    }

    pub fn storeroom(storeroom_id: StoreroomId) -> Self {
        Self {
            storeroom_id: Some(storeroom_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: Option<LuggageStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn matches(&self, item: &LuggageItem) -> bool {
        self.hotel_id.is_none_or(|id| item.hotel_id == id)
            && self.storeroom_id.is_none_or(|id| item.storeroom_id == id)
            && self
                .guest_name
                .as_deref()
                .is_none_or(|name| item.guest_name == name)
            && self
                .contact_phone
                .as_deref()
                .is_none_or(|phone| item.contact_phone.as_deref() == Some(phone))
            && self.status.is_none_or(|status| item.status == status)
            && self
                .stored_by
                .as_deref()
                .is_none_or(|staff| item.stored_by == staff)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub hotel_id: Option<HotelId>,
    pub luggage_id: Option<LuggageId>,
    pub guest_name: Option<String>,
    pub contact_phone: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, record: &CustodyHistory) -> bool {
        self.hotel_id.is_none_or(|id| record.hotel_id == id)
            && self.luggage_id.is_none_or(|id| record.luggage_id == id)
            && self
                .guest_name
                .as_deref()
                .is_none_or(|name| record.guest_name == name)
            && self
                .contact_phone
                .as_deref()
                .is_none_or(|phone| record.contact_phone.as_deref() == Some(phone))
    }
}
