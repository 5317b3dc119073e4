// src/permissions/store.rs
//!
//! Grant bookkeeping and best-effort persistence through the host
//!

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::types::{Grant, GrantFlags};
use crate::error::StorageError;
use crate::host::ContentHost;
use crate::identifier::ResourceIdentifier;

/// Grants obtained in this process, plus persistence through the host
pub struct PermissionStore {
    host: Arc<dyn ContentHost>,
    persist_enabled: bool,
    /// Grants picked in this process, keyed by identifier
    pub(super) session: Mutex<HashMap<ResourceIdentifier, Grant>>,
}

impl PermissionStore {
    pub fn new(host: Arc<dyn ContentHost>, persist_enabled: bool) -> Self {
        Self {
            host,
            persist_enabled,
            session: Mutex::new(HashMap::new()),
        }
    }

    /// Records the grant for a completed pick and tries to persist it.
    ///
    /// Only the bits that were both requested and granted by the host are kept.
    pub fn record_pick(
        &self,
        identifier: &ResourceIdentifier,
        requested: GrantFlags,
        granted: GrantFlags,
    ) -> Grant {
        let flags = requested & granted;

        let persisted = if self.persist_enabled {
            self.persist(identifier, flags)
        } else {
            false
        };

        let grant = Grant {
            identifier: identifier.clone(),
            flags,
            persisted,
        };

        self.lock_session().insert(identifier.clone(), grant.clone());

        grant
    }

    /// Asks the host to keep `flags` on `identifier` across restarts.
    ///
    /// Never fails: a refusal only costs cross-restart availability, so it is
    /// logged and reported as `false`.
    pub fn persist(&self, identifier: &ResourceIdentifier, flags: GrantFlags) -> bool {
        if flags.is_empty() {
            tracing::warn!(%identifier, "host granted none of the requested flags, nothing to persist");
            return false;
        }

        match self.host.take_persistable_permission(identifier, flags) {
            Ok(()) => {
                tracing::info!(%identifier, flags = flags.bits(), "grant persisted");
                true
            }
            Err(e) => {
                tracing::warn!(%identifier, error = %e, "provider refused grant persistence; grant is valid for this session only");
                false
            }
        }
    }

    /// Grant picked in this process that covers `identifier`.
    pub fn session_grant(&self, identifier: &ResourceIdentifier) -> Option<Grant> {
        self.lock_session()
            .values()
            .find(|g| g.identifier.covers(identifier))
            .cloned()
    }

    /// Grants the host keeps for this process.
    pub fn persisted_grants(&self) -> Result<Vec<Grant>, StorageError> {
        self.host
            .persisted_permissions()
            .map_err(|e| StorageError::ProviderQuery {
                identifier: "persisted permissions".to_string(),
                reason: e.to_string(),
            })
    }

    /// Gives a grant back to the host. Best-effort like [`Self::persist`].
    pub fn release(&self, identifier: &ResourceIdentifier) -> bool {
        let flags = self
            .session_grant(identifier)
            .filter(|g| g.identifier == *identifier)
            .map(|g| g.flags)
            .unwrap_or(GrantFlags::READ | GrantFlags::WRITE);

        self.lock_session().remove(identifier);

        match self.host.release_persistable_permission(identifier, flags) {
            Ok(()) => {
                tracing::info!(%identifier, "grant released");
                true
            }
            Err(e) => {
                tracing::warn!(%identifier, error = %e, "failed to release grant");
                false
            }
        }
    }

    /// Re-reads the host's persisted grants and returns the session grants the
    /// host no longer keeps (revoked by the user while the process was paused).
    pub fn refresh(&self) -> Vec<ResourceIdentifier> {
        let persisted = match self.host.persisted_permissions() {
            Ok(grants) => grants,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted grants");
                return Vec::new();
            }
        };

        let mut session = self.lock_session();
        let mut revoked = Vec::new();
        for grant in session.values_mut().filter(|g| g.persisted) {
            let still_held = persisted
                .iter()
                .any(|p| p.identifier == grant.identifier && p.flags.contains(grant.flags));

            if !still_held {
                tracing::warn!(identifier = %grant.identifier, "persisted grant no longer held by host");
                grant.persisted = false;
                revoked.push(grant.identifier.clone());
            }
        }

        revoked
    }

    fn lock_session(&self) -> MutexGuard<'_, HashMap<ResourceIdentifier, Grant>> {
        // Every update is a single insert or field write, so a poisoned table is still consistent
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
