use super::{LifecycleEngine, require_id, require_text};
use crate::core::{CustodyError, Entity, LuggageId, MigrationRecord, Result, StoreroomId};
use tracing::{Instrument, Level, event, info_span};

impl LifecycleEngine {
    /// Moves a stored item to another room of its hotel and records the move.
    ///
    /// The room change and its migration record are written together.
    pub async fn migrate(
        &self,
        luggage_id: LuggageId,
        to_storeroom_id: StoreroomId,
        operator: &str,
    ) -> Result<MigrationRecord> {
        let span = info_span!(
            "custody.migrate",
            luggage_id,
            to_storeroom_id,
            operator = %operator
        );

        async move {
            require_id("luggage_id", luggage_id)?;
            require_id("to_storeroom_id", to_storeroom_id)?;
            require_text("migrated_by", operator)?;

            let item = self
                .store
                .get_item(luggage_id)
                .await?
                .ok_or_else(|| CustodyError::not_found(Entity::Luggage, luggage_id))?;
            if !item.is_stored() {
                return Err(CustodyError::NotInCustody {
                    luggage_id,
                    status: item.status,
                });
            }
            if item.storeroom_id == to_storeroom_id {
                return Err(CustodyError::invalid(
                    "to_storeroom_id",
                    format!("luggage {} is already in storeroom {}", luggage_id, to_storeroom_id),
                ));
            }

            let room = self
                .gate
                .admit_destination(item.hotel_id, to_storeroom_id)
                .await?;
            let record = self
                .store
                .relocate_item(luggage_id, to_storeroom_id, room.guard(), operator)
                .await?;
            self.invalidate(&item.retrieval_code).await;

            event!(
                Level::INFO,
                from = record.from_storeroom_id,
                to = record.to_storeroom_id,
                "luggage migrated"
            );
            Ok(record)
        }
        .instrument(span)
        .await
    }
}
