//! Luggage custody lifecycle engine.
//!
//! Owns every create/mutate/delete transition of a live item. Collaborators are
//! injected as trait objects; the engine holds no mutable state of its own, so
//! it is cheap to clone into request tasks.

mod intake;
mod migration;
mod queries;
mod retrieval;
mod update;

pub use intake::{BatchIntake, BatchLine, IntakeRequest};
pub use update::{AuditOutcome, UpdateReport};

use crate::cache::{LookupCache, NoopCache};
use crate::capacity::CapacityGate;
use crate::codegen::{CodeSource, OsCodeSource, find_unique_code};
use crate::config::CustodyConfig;
use crate::core::{CustodyError, Entity, LuggageItem, Result, Role};
use crate::identity::{IdentityResolver, StaffUser};
use crate::store::{CustodyStore, Directory};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn CustodyStore>,
    identity: Arc<dyn IdentityResolver>,
    cache: Arc<dyn LookupCache>,
    codes: Arc<dyn CodeSource>,
    gate: CapacityGate,
    config: Arc<CustodyConfig>,
}

impl LifecycleEngine {
    /// Creates an engine with no lookup cache and OS-random codes drawn from
    /// the configured alphabet.
    pub fn new(
        store: Arc<dyn CustodyStore>,
        directory: Arc<dyn Directory>,
        identity: Arc<dyn IdentityResolver>,
        config: CustodyConfig,
    ) -> Self {
        let gate = CapacityGate::new(directory, store.clone());
        let codes = Arc::new(OsCodeSource::new(config.code_alphabet));
        Self {
            store,
            identity,
            cache: Arc::new(NoopCache),
            codes,
            gate,
            config: Arc::new(config),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn LookupCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_code_source(mut self, codes: Arc<dyn CodeSource>) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    pub fn capacity_gate(&self) -> &CapacityGate {
        &self.gate
    }

    /// Resolves `username` and requires exactly the staff role.
    async fn require_staff(&self, field: &'static str, username: &str) -> Result<StaffUser> {
        if username.trim().is_empty() {
            return Err(CustodyError::invalid(field, "must not be empty"));
        }
        let user = self
            .identity
            .resolve(username)
            .await?
            .ok_or_else(|| CustodyError::not_found(Entity::Staff, username))?;
        if !user.is_staff() {
            return Err(CustodyError::PermissionMismatch {
                username: username.to_string(),
                required: Role::Staff,
            });
        }
        Ok(user)
    }

    /// Draws candidates until one is free among live items.
    async fn mint_code(&self) -> Result<String> {
        let length = self.config.code_length;
        let codes = self.codes.clone();
        let store = self.store.clone();

        find_unique_code(
            self.config.max_code_attempts,
            || codes.generate(length),
            |candidate| {
                let store = store.clone();
                async move { store.code_in_use(&candidate).await }
            },
        )
        .await?
        .into_result()
    }

    /// Cached items for `code`, re-read from the store. A cached id that is
    /// gone, no longer stored or no longer holds `code` drops the entry and
    /// counts as a miss.
    async fn cached(&self, code: &str) -> Result<Option<Vec<LuggageItem>>> {
        let hinted = match self.cache.get(code).await {
            Ok(Some(items)) if !items.is_empty() => items,
            Ok(_) => {
                debug!("lookup cache miss for code {}", code);
                return Ok(None);
            }
            Err(err) => {
                debug!("lookup cache read failed for code {}: {}", code, err);
                return Ok(None);
            }
        };

        let mut confirmed = Vec::with_capacity(hinted.len());
        for hint in &hinted {
            match self.store.get_item(hint.id).await? {
                Some(item) if item.is_stored() && item.retrieval_code == code => confirmed.push(item),
                _ => {
                    debug!("stale lookup cache entry for code {} (luggage {})", code, hint.id);
                    self.invalidate(code).await;
                    return Ok(None);
                }
            }
        }
        Ok(Some(confirmed))
    }

    async fn remember(&self, code: &str, items: &[LuggageItem]) {
        if let Err(err) = self.cache.set(code, items, self.config.cache_ttl).await {
            warn!("lookup cache write failed for code {}: {}", code, err);
        }
    }

    async fn invalidate(&self, code: &str) {
        if let Err(err) = self.cache.delete(code).await {
            warn!("lookup cache invalidation failed for code {}: {}", code, err);
        }
    }
}

fn require_id(field: &'static str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(CustodyError::invalid(field, format!("{} is not a valid id", id)));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CustodyError::invalid(field, "must not be empty"));
    }
    Ok(())
}
