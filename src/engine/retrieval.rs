use super::{LifecycleEngine, require_text};
use crate::core::{CustodyError, Entity, LuggageItem, LuggageStatus, Result};
use chrono::Utc;
use tracing::{Instrument, Level, event, info_span};

impl LifecycleEngine {
    /// All live items under `code`. There may be more than one.
    ///
    /// A cache hit only names the ids to read; every item is confirmed against
    /// the store before it is returned.
    pub async fn find_by_code(&self, code: &str) -> Result<Vec<LuggageItem>> {
        require_text("code", code)?;
        if let Some(items) = self.cached(code).await? {
            return Ok(items);
        }

        let items = self.store.find_by_code(code).await?;
        if items.is_empty() {
            return Err(CustodyError::not_found(Entity::RetrievalCode, code));
        }
        self.remember(code, &items).await;
        Ok(items)
    }

    /// Hands every stored item under `code` back to the guest.
    ///
    /// Each item is retired in its own unit of work. The first failure stops
    /// the run and is reported as [`CustodyError::RetrievalHalted`] with the
    /// count of items already handed back. The code's cache entry is dropped
    /// whatever the outcome.
    pub async fn retrieve(&self, code: &str, staff_username: &str) -> Result<Vec<LuggageItem>> {
        let span = info_span!("custody.retrieve", code = %code, staff = %staff_username);

        async move {
            require_text("code", code)?;
            let outcome = self.retrieve_stored(code, staff_username).await;
            self.invalidate(code).await;
            outcome
        }
        .instrument(span)
        .await
    }

    async fn retrieve_stored(&self, code: &str, staff_username: &str) -> Result<Vec<LuggageItem>> {
        let staff = self.require_staff("retrieved_by", staff_username).await?;

        let stored: Vec<LuggageItem> = self
            .store
            .find_by_code(code)
            .await?
            .into_iter()
            .filter(LuggageItem::is_stored)
            .collect();
        if stored.is_empty() {
            return Err(CustodyError::NothingStored {
                code: code.to_string(),
            });
        }

        let mut retrieved = Vec::with_capacity(stored.len());
        for mut item in stored {
            match self
                .store
                .retire_item(item.id, staff.username(), Utc::now())
                .await
            {
                Ok(record) => {
                    item.status = LuggageStatus::Retrieved;
                    item.retrieved_by = Some(record.retrieved_by);
                    item.retrieved_at = Some(record.retrieved_at);
                    item.updated_at = record.retrieved_at;
                    retrieved.push(item);
                }
                Err(err) => {
                    event!(
                        Level::ERROR,
                        luggage_id = item.id,
                        retrieved = retrieved.len(),
                        error = %err,
                        "retrieval halted"
                    );
                    return Err(CustodyError::RetrievalHalted {
                        retrieved: retrieved.len(),
                        luggage_id: item.id,
                        source: Box::new(err),
                    });
                }
            }
        }

        event!(Level::INFO, items = retrieved.len(), "luggage retrieved");
        Ok(retrieved)
    }
}
