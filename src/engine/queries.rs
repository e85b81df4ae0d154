use super::{LifecycleEngine, require_id, require_text};
use crate::core::{
    CustodyError, CustodyHistory, Entity, HistoryFilter, HotelId, ItemFilter, LuggageId,
    LuggageItem, LuggageStatus, MigrationRecord, Result, StoreroomId, UpdateAuditRecord,
};
use std::collections::BTreeSet;

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl LifecycleEngine {
    pub async fn get_item(&self, id: LuggageId) -> Result<LuggageItem> {
        require_id("luggage_id", id)?;
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| CustodyError::not_found(Entity::Luggage, id))
    }

    /// First live item under `code`, read from the store.
    pub async fn detail_by_code(&self, code: &str) -> Result<LuggageItem> {
        require_text("code", code)?;
        self.store
            .find_by_code(code)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CustodyError::not_found(Entity::RetrievalCode, code))
    }

    /// Items of a guest, matched on name and/or phone. At least one is required.
    pub async fn list_by_guest(
        &self,
        guest_name: Option<&str>,
        contact_phone: Option<&str>,
        status: Option<LuggageStatus>,
    ) -> Result<Vec<LuggageItem>> {
        let guest_name = non_blank(guest_name);
        let contact_phone = non_blank(contact_phone);
        if guest_name.is_none() && contact_phone.is_none() {
            return Err(CustodyError::invalid(
                "guest",
                "guest_name and contact_phone cannot both be empty",
            ));
        }
        let filter = ItemFilter {
            guest_name,
            contact_phone,
            status,
            ..ItemFilter::default()
        };
        self.store.list_items(&filter).await
    }

    pub async fn list_by_phone(
        &self,
        contact_phone: &str,
        status: Option<LuggageStatus>,
    ) -> Result<Vec<LuggageItem>> {
        require_text("contact_phone", contact_phone)?;
        self.list_by_guest(None, Some(contact_phone), status).await
    }

    /// Items a staff member took in.
    pub async fn list_by_staff(
        &self,
        username: &str,
        status: Option<LuggageStatus>,
    ) -> Result<Vec<LuggageItem>> {
        require_text("username", username)?;
        let filter = ItemFilter {
            stored_by: Some(username.to_string()),
            status,
            ..ItemFilter::default()
        };
        self.store.list_items(&filter).await
    }

    pub async fn list_by_storeroom(
        &self,
        storeroom_id: StoreroomId,
        status: Option<LuggageStatus>,
    ) -> Result<Vec<LuggageItem>> {
        require_id("storeroom_id", storeroom_id)?;
        self.store
            .list_items(&ItemFilter::storeroom(storeroom_id).with_status(status))
            .await
    }

    pub async fn list_by_hotel(
        &self,
        hotel_id: HotelId,
        status: Option<LuggageStatus>,
    ) -> Result<Vec<LuggageItem>> {
        require_id("hotel_id", hotel_id)?;
        self.store
            .list_items(&ItemFilter::hotel(hotel_id).with_status(status))
            .await
    }

    /// Distinct guest names at a hotel, sorted.
    pub async fn guest_names(
        &self,
        hotel_id: HotelId,
        status: Option<LuggageStatus>,
    ) -> Result<Vec<String>> {
        let names: BTreeSet<String> = self
            .list_by_hotel(hotel_id, status)
            .await?
            .into_iter()
            .map(|item| item.guest_name)
            .collect();
        Ok(names.into_iter().collect())
    }

    /// Items a guest currently has in custody at a hotel.
    pub async fn stored_by_guest(&self, hotel_id: HotelId, guest_name: &str) -> Result<Vec<LuggageItem>> {
        require_id("hotel_id", hotel_id)?;
        require_text("guest_name", guest_name)?;
        let filter = ItemFilter {
            guest_name: Some(guest_name.to_string()),
            ..ItemFilter::hotel(hotel_id)
        }
        .with_status(Some(LuggageStatus::Stored));
        self.store.list_items(&filter).await
    }

    pub async fn history_by_guest(
        &self,
        guest_name: Option<&str>,
        contact_phone: Option<&str>,
    ) -> Result<Vec<CustodyHistory>> {
        let guest_name = non_blank(guest_name);
        let contact_phone = non_blank(contact_phone);
        if guest_name.is_none() && contact_phone.is_none() {
            return Err(CustodyError::invalid(
                "guest",
                "guest_name and contact_phone cannot both be empty",
            ));
        }
        let filter = HistoryFilter {
            guest_name,
            contact_phone,
            ..HistoryFilter::default()
        };
        self.store.list_history(&filter).await
    }

    pub async fn history_by_hotel(
        &self,
        hotel_id: HotelId,
        guest_name: Option<&str>,
        contact_phone: Option<&str>,
    ) -> Result<Vec<CustodyHistory>> {
        require_id("hotel_id", hotel_id)?;
        let filter = HistoryFilter {
            hotel_id: Some(hotel_id),
            guest_name: non_blank(guest_name),
            contact_phone: non_blank(contact_phone),
            ..HistoryFilter::default()
        };
        self.store.list_history(&filter).await
    }

    pub async fn history_for(&self, luggage_id: LuggageId) -> Result<Vec<CustodyHistory>> {
        require_id("luggage_id", luggage_id)?;
        let filter = HistoryFilter {
            luggage_id: Some(luggage_id),
            ..HistoryFilter::default()
        };
        self.store.list_history(&filter).await
    }

    pub async fn migrations_for(&self, luggage_id: LuggageId) -> Result<Vec<MigrationRecord>> {
        require_id("luggage_id", luggage_id)?;
        self.store.list_migrations(luggage_id).await
    }

    pub async fn update_audits(&self, hotel_id: HotelId) -> Result<Vec<UpdateAuditRecord>> {
        require_id("hotel_id", hotel_id)?;
        self.store.list_update_audits(hotel_id).await
    }
}
