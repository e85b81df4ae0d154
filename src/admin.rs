//! Hotel, storeroom and staff administration.

use crate::core::{
    CustodyError, Entity, Hotel, HotelId, HotelPatch, NewHotel, NewStoreroom, Result, Role,
    Storeroom, StoreroomId,
};
use crate::identity::{StaffRegistry, StaffUser};
use crate::store::{DirectoryAdmin, HOTEL_STAFF_CONSTRAINT};
use std::sync::Arc;
use tracing::{Level, event};

#[derive(Clone)]
pub struct AdminService {
    directory: Arc<dyn DirectoryAdmin>,
    staff: Arc<StaffRegistry>,
}

impl AdminService {
    pub fn new(directory: Arc<dyn DirectoryAdmin>, staff: Arc<StaffRegistry>) -> Self {
        Self { directory, staff }
    }

    pub async fn create_hotel(&self, hotel: NewHotel) -> Result<Hotel> {
        if hotel.name.trim().is_empty() {
            return Err(CustodyError::invalid("name", "hotel name must not be empty"));
        }
        let hotel = self.directory.insert_hotel(hotel).await?;
        event!(Level::INFO, hotel_id = hotel.id, "hotel created");
        Ok(hotel)
    }

    pub async fn update_hotel(&self, id: HotelId, patch: HotelPatch) -> Result<Hotel> {
        if patch.is_empty() {
            return Err(CustodyError::invalid("patch", "no fields to update"));
        }
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(CustodyError::invalid("name", "hotel name must not be empty"));
        }
        self.directory.update_hotel(id, &patch).await
    }

    /// Fails while the hotel still has staff accounts or storerooms.
    pub async fn delete_hotel(&self, id: HotelId) -> Result<()> {
        let staff = self
            .staff
            .export_users()
            .await
            .into_iter()
            .filter(|user| user.hotel_id() == Some(id))
            .count();
        if staff > 0 {
            return Err(CustodyError::conflict(
                HOTEL_STAFF_CONSTRAINT,
                format!("hotel {} still has {} staff account(s)", id, staff),
            ));
        }
        if !self.directory.delete_hotel(id).await? {
            return Err(CustodyError::not_found(Entity::Hotel, id));
        }
        Ok(())
    }

    pub async fn list_hotels(&self) -> Result<Vec<Hotel>> {
        self.directory.list_hotels().await
    }

    pub async fn create_storeroom(&self, room: NewStoreroom) -> Result<Storeroom> {
        if room.hotel_id <= 0 {
            return Err(CustodyError::invalid("hotel_id", format!("{} is not a valid id", room.hotel_id)));
        }
        if room.name.trim().is_empty() {
            return Err(CustodyError::invalid("name", "storeroom name must not be empty"));
        }
        let room = self.directory.insert_storeroom(room).await?;
        event!(
            Level::INFO,
            storeroom_id = room.id,
            hotel_id = room.hotel_id,
            capacity = room.capacity,
            "storeroom created"
        );
        Ok(room)
    }

    pub async fn list_storerooms(&self, hotel_id: HotelId) -> Result<Vec<Storeroom>> {
        self.directory.list_storerooms(hotel_id).await
    }

    pub async fn set_storeroom_active(&self, id: StoreroomId, active: bool) -> Result<Storeroom> {
        self.directory.set_storeroom_active(id, active).await
    }

    /// Fails while the room still holds stored items.
    pub async fn delete_storeroom(&self, id: StoreroomId) -> Result<()> {
        if !self.directory.delete_storeroom(id).await? {
            return Err(CustodyError::not_found(Entity::Storeroom, id));
        }
        Ok(())
    }

    /// Creates a staff or admin account scoped to an existing hotel. The role
    /// defaults to staff.
    pub async fn create_staff(
        &self,
        username: &str,
        password: &str,
        role: Option<Role>,
        hotel_id: Option<HotelId>,
    ) -> Result<StaffUser> {
        let role = role.unwrap_or(Role::Staff);
        if let Some(id) = hotel_id.filter(|id| *id > 0) {
            if self.directory.hotel(id).await?.is_none() {
                return Err(CustodyError::not_found(Entity::Hotel, id));
            }
        }
        self.staff.create_user(username, password, role, hotel_id).await
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<StaffUser> {
        self.staff.authenticate(username, password).await
    }

    pub async fn delete_staff(&self, username: &str) -> Result<()> {
        self.staff.delete_user(username).await
    }

    pub async fn list_staff(&self) -> Vec<String> {
        self.staff.list_users().await
    }
}
