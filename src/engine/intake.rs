use super::{LifecycleEngine, require_id, require_text};
use crate::capacity::AdmittedRoom;
use crate::codegen::claim_unique_code;
use crate::core::{CustodyError, LuggageItem, NewLuggageItem, Result, StoreroomId};
use crate::store::{CapacityGuard, LIVE_CODE_CONSTRAINT};
use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

/// Intake of a single item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntakeRequest {
    pub guest_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub description: String,
    /// Defaults to 1
    pub quantity: Option<u32>,
    pub notes: String,
    /// Photo URLs, the first is the primary photo
    pub photos: Vec<String>,
    pub storeroom_id: StoreroomId,
    pub staff_username: String,
    /// Defaults to the configured QR prefix followed by the code
    pub qr_url: Option<String>,
}

/// One item of a batch intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchLine {
    pub storeroom_id: StoreroomId,
    pub description: String,
    pub quantity: Option<u32>,
    pub notes: String,
    pub photos: Vec<String>,
}

/// Several items handed over by one guest, retrievable with one code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchIntake {
    pub guest_name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub staff_username: String,
    pub qr_url: Option<String>,
    pub items: Vec<BatchLine>,
}

impl BatchIntake {
    fn line(&self, line: &BatchLine) -> IntakeRequest {
        IntakeRequest {
            guest_name: self.guest_name.clone(),
            contact_phone: self.contact_phone.clone(),
            contact_email: self.contact_email.clone(),
            description: line.description.clone(),
            quantity: line.quantity,
            notes: line.notes.clone(),
            photos: line.photos.clone(),
            storeroom_id: line.storeroom_id,
            staff_username: self.staff_username.clone(),
            qr_url: self.qr_url.clone(),
        }
    }
}

impl LifecycleEngine {
    /// Takes an item into custody under a freshly minted code.
    ///
    /// A code that is already live, or that loses a race to a concurrent
    /// intake at commit, is replaced by a fresh draw. Both cases spend the same
    /// attempt budget.
    pub async fn create(&self, request: IntakeRequest) -> Result<LuggageItem> {
        let span = info_span!(
            "custody.intake",
            storeroom_id = request.storeroom_id,
            staff = %request.staff_username
        );

        async move {
            self.require_staff("staff_username", &request.staff_username).await?;
            let room = self.admit_line(&request).await?;
            let intake_id = Uuid::new_v4();

            let length = self.config.code_length;
            let codes = self.codes.clone();
            let engine = self;
            let (request, room) = (&request, &room);
            let item = claim_unique_code(
                self.config.max_code_attempts,
                || codes.generate(length),
                move |code| {
                    let item = engine.new_item(request, room, intake_id, &code);
                    engine.claim_code(item, room.guard())
                },
            )
            .await?
            .into_result()?;

            self.invalidate(&item.retrieval_code).await;
            event!(Level::INFO, luggage_id = item.id, "luggage taken into custody");
            Ok(item)
        }
        .instrument(span)
        .await
    }

    /// Takes several items into custody under one shared code.
    ///
    /// Items are written one by one. If any of them fails, the siblings already
    /// written by this call are deleted again before the error is returned.
    pub async fn create_batch(&self, batch: BatchIntake) -> Result<Vec<LuggageItem>> {
        let span = info_span!(
            "custody.intake_batch",
            items = batch.items.len(),
            staff = %batch.staff_username
        );

        async move {
            if batch.items.is_empty() {
                return Err(CustodyError::invalid("items", "batch must contain at least one item"));
            }
            self.require_staff("staff_username", &batch.staff_username).await?;

            let code = self.mint_code().await?;
            let intake_id = Uuid::new_v4();
            let mut created: Vec<LuggageItem> = Vec::with_capacity(batch.items.len());

            for line in &batch.items {
                let request = batch.line(line);
                let written = match self.admit_line(&request).await {
                    Ok(room) => {
                        let item = self.new_item(&request, &room, intake_id, &code);
                        self.store.insert_item(item, room.guard()).await
                    }
                    Err(err) => Err(err),
                };

                match written {
                    Ok(item) => created.push(item),
                    Err(err) => {
                        self.compensate(&created).await;
                        self.invalidate(&code).await;
                        event!(
                            Level::WARN,
                            error = %err,
                            rolled_back = created.len(),
                            "batch intake failed"
                        );
                        return Err(err);
                    }
                }
            }

            self.invalidate(&code).await;
            event!(Level::INFO, items = created.len(), "batch taken into custody");
            Ok(created)
        }
        .instrument(span)
        .await
    }

    /// Validates the request fields and admits its storeroom.
    async fn admit_line(&self, request: &IntakeRequest) -> Result<AdmittedRoom> {
        require_text("guest_name", &request.guest_name)?;
        require_id("storeroom_id", request.storeroom_id)?;
        if request.quantity == Some(0) {
            return Err(CustodyError::invalid("quantity", "must be greater than 0"));
        }

        let room = self.gate.require(request.storeroom_id).await?;
        if room.hotel_id() <= 0 {
            return Err(CustodyError::invalid(
                "storeroom_id",
                format!("storeroom {} is not attached to a hotel", request.storeroom_id),
            ));
        }
        Ok(room)
    }

    fn new_item(
        &self,
        request: &IntakeRequest,
        room: &AdmittedRoom,
        intake_id: Uuid,
        code: &str,
    ) -> NewLuggageItem {
        let qr_url = request
            .qr_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.config.default_qr_url(code));

        NewLuggageItem {
            intake_id,
            guest_name: request.guest_name.clone(),
            contact_phone: request.contact_phone.clone().filter(|p| !p.is_empty()),
            contact_email: request.contact_email.clone().filter(|e| !e.is_empty()),
            description: request.description.clone(),
            quantity: request.quantity.unwrap_or(1),
            notes: request.notes.clone(),
            photos: request.photos.clone(),
            hotel_id: room.hotel_id(),
            storeroom_id: room.storeroom.id,
            retrieval_code: code.to_string(),
            qr_url,
            stored_by: request.staff_username.clone(),
            stored_at: Utc::now(),
        }
    }

    /// Inserts `item` unless its code is held by another live intake. `None`
    /// means the code was taken, either before the write or by a concurrent
    /// intake at commit.
    async fn claim_code(
        &self,
        item: NewLuggageItem,
        guard: Option<CapacityGuard>,
    ) -> Result<Option<LuggageItem>> {
        if self.store.code_in_use(&item.retrieval_code).await? {
            return Ok(None);
        }
        let code = item.retrieval_code.clone();
        match self.store.insert_item(item, guard).await {
            Ok(item) => Ok(Some(item)),
            Err(err) if err.is_conflict_on(LIVE_CODE_CONSTRAINT) => {
                event!(Level::WARN, code = %code, "retrieval code raced, minting again");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn compensate(&self, created: &[LuggageItem]) {
        for item in created {
            if let Err(err) = self.store.delete_item(item.id).await {
                warn!("failed to roll back batch item {}: {}", item.id, err);
            }
        }
    }
}
