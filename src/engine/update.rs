use super::{LifecycleEngine, require_id};
use crate::config::MAX_CODE_LENGTH;
use crate::core::{
    CustodyError, Entity, ItemPatch, LuggageId, LuggageItem, NewUpdateAudit, Result,
    UpdateAuditRecord,
};
use chrono::Utc;
use log::warn;
use serde::Serialize;
use tracing::{Instrument, Level, event, info_span};

/// What happened to the audit row of an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AuditOutcome {
    Written { record: UpdateAuditRecord },
    /// No operator was named, or nothing changed
    Skipped,
    /// The update committed but its audit row could not be written
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateReport {
    pub item: LuggageItem,
    pub changed_fields: Vec<String>,
    pub audit: AuditOutcome,
}

impl LifecycleEngine {
    /// Applies a partial update, moving the item when the patch names another
    /// storeroom of the same hotel.
    ///
    /// The audit row is written after the update commits and only when
    /// `operator` is non-empty and at least one field changed. Its failure is reported in the returned
    /// [`UpdateReport`] and never undoes the update.
    pub async fn update(&self, id: LuggageId, patch: ItemPatch, operator: &str) -> Result<UpdateReport> {
        let span = info_span!("custody.update", luggage_id = id, operator = %operator);

        async move {
            require_id("luggage_id", id)?;
            patch.validate()?;

            let before = self
                .store
                .get_item(id)
                .await?
                .ok_or_else(|| CustodyError::not_found(Entity::Luggage, id))?;

            let guard = match patch.relocation(before.storeroom_id) {
                Some(target) => self
                    .gate
                    .admit_destination(before.hotel_id, target)
                    .await?
                    .guard(),
                None => None,
            };

            let after = self.store.update_item(id, &patch, guard).await?;
            self.invalidate(&before.retrieval_code).await;

            let changed_fields = changed_fields(&before, &after);
            let audit = self.record_audit(&before, &after, &changed_fields, operator).await;
            event!(Level::INFO, changed = changed_fields.len(), "luggage updated");

            Ok(UpdateReport {
                item: after,
                changed_fields,
                audit,
            })
        }
        .instrument(span)
        .await
    }

    /// Replaces the retrieval code of one item.
    ///
    /// A QR URL still on the default path of the old code follows the new one.
    pub async fn change_code(&self, id: LuggageId, new_code: &str, operator: &str) -> Result<LuggageItem> {
        let span = info_span!("custody.change_code", luggage_id = id, operator = %operator);

        async move {
            require_id("luggage_id", id)?;
            let new_code = new_code.trim();
            if new_code.is_empty() {
                return Err(CustodyError::invalid("code", "must not be empty"));
            }
            if new_code.chars().count() > MAX_CODE_LENGTH {
                return Err(CustodyError::invalid(
                    "code",
                    format!("must be at most {} characters", MAX_CODE_LENGTH),
                ));
            }

            let before = self
                .store
                .get_item(id)
                .await?
                .ok_or_else(|| CustodyError::not_found(Entity::Luggage, id))?;
            if before.retrieval_code == new_code {
                return Ok(before);
            }

            let qr_url = if before.qr_url == self.config.default_qr_url(&before.retrieval_code) {
                self.config.default_qr_url(new_code)
            } else {
                before.qr_url.clone()
            };

            let after = self.store.set_code(id, new_code, &qr_url).await?;
            self.invalidate(&before.retrieval_code).await;
            self.invalidate(new_code).await;

            let changed = changed_fields(&before, &after);
            self.record_audit(&before, &after, &changed, operator).await;
            Ok(after)
        }
        .instrument(span)
        .await
    }

    async fn record_audit(
        &self,
        before: &LuggageItem,
        after: &LuggageItem,
        changed_fields: &[String],
        operator: &str,
    ) -> AuditOutcome {
        if operator.trim().is_empty() || changed_fields.is_empty() {
            return AuditOutcome::Skipped;
        }

        let written = match (serde_json::to_string(before), serde_json::to_string(after)) {
            (Ok(old_data), Ok(new_data)) => {
                self.store
                    .insert_update_audit(NewUpdateAudit {
                        hotel_id: before.hotel_id,
                        luggage_id: before.id,
                        updated_by: operator.to_string(),
                        changed_fields: changed_fields.to_vec(),
                        old_data,
                        new_data,
                        updated_at: Utc::now(),
                    })
                    .await
            }
            (Err(err), _) | (_, Err(err)) => Err(err.into()),
        };

        match written {
            Ok(record) => AuditOutcome::Written { record },
            Err(err) => {
                warn!("update audit for luggage {} was not written: {}", before.id, err);
                AuditOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}

/// Names of the user-visible fields that differ between two versions.
pub(crate) fn changed_fields(before: &LuggageItem, after: &LuggageItem) -> Vec<String> {
    let mut changed = Vec::new();
    let mut check = |name: &str, differs: bool| {
        if differs {
            changed.push(name.to_string());
        }
    };

    check("guest_name", before.guest_name != after.guest_name);
    check("contact_phone", before.contact_phone != after.contact_phone);
    check("contact_email", before.contact_email != after.contact_email);
    check("description", before.description != after.description);
    check("quantity", before.quantity != after.quantity);
    check("notes", before.notes != after.notes);
    check("photos", before.photos != after.photos);
    check("storeroom_id", before.storeroom_id != after.storeroom_id);
    check("retrieval_code", before.retrieval_code != after.retrieval_code);
    check("qr_url", before.qr_url != after.qr_url);
    changed
}
