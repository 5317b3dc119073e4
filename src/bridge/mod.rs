// src/bridge/mod.rs
//!
//! Bridge surface
//!
//! [`StorageBridge`] is what the external runtime talks to. It is built once
//! with the host capabilities injected, gets its callback table at `init()`,
//! and is driven by the host shim through [`HostEvents`]: lifecycle-resume
//! and picker completions. Everything else is a synchronous call that
//! returns a value, an absence or a [`StorageError`].
//!

mod callbacks;

pub use callbacks::{PickCallback, PickCallbacks, PickEvents, PickResult};

use std::sync::{Arc, OnceLock};

use crate::config::BridgeConfig;
use crate::correlator::{PendingRequest, PickKind, PickOutcome, PickToken, RequestCorrelator};
use crate::enumerator::{DirectoryEntry, DirectoryEnumerator, ExtensionFilter};
use crate::error::StorageError;
use crate::host::{ContentHost, PickerLauncher};
use crate::identifier::ResourceIdentifier;
use crate::metadata::MetadataResolver;
use crate::permissions::{Grant, GrantFlags, PermissionStore};
use crate::reader::ContentReader;

/// Access the pickers ask for. Content is only ever read through this bridge.
const REQUESTED_FLAGS: GrantFlags = GrantFlags::READ;

/// Events the host shim forwards into the bridge, always on the UI thread
pub trait HostEvents: Send + Sync {
    fn on_resume(&self);

    /// Reports how the picker launched for `token` ended. Called once per launch.
    fn on_pick_result(&self, token: PickToken, outcome: PickOutcome);
}

pub struct StorageBridge {
    config: BridgeConfig,
    callbacks: OnceLock<PickCallbacks>,
    picker: Arc<dyn PickerLauncher>,
    correlator: RequestCorrelator,
    permissions: PermissionStore,
    enumerator: DirectoryEnumerator,
    reader: ContentReader,
    metadata: MetadataResolver,
}

impl StorageBridge {
    pub fn new(
        host: Arc<dyn ContentHost>,
        picker: Arc<dyn PickerLauncher>,
        config: BridgeConfig,
    ) -> Result<Self, StorageError> {
        config.validate()?;

        Ok(Self {
            callbacks: OnceLock::new(),
            picker,
            correlator: RequestCorrelator::new(config.request_codes()),
            permissions: PermissionStore::new(Arc::clone(&host), config.persist_grants),
            enumerator: DirectoryEnumerator::new(Arc::clone(&host)),
            reader: ContentReader::new(
                Arc::clone(&host),
                config.read_chunk_size,
                config.max_read_bytes,
            ),
            metadata: MetadataResolver::new(host),
            config,
        })
    }

    /// Installs the callback table. Must run once, before any pick request.
    pub fn init(&self, callbacks: PickCallbacks) -> Result<(), StorageError> {
        self.callbacks
            .set(callbacks)
            .map_err(|_| StorageError::AlreadyInitialized)?;
        tracing::info!("storage bridge initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.callbacks.get().is_some()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn begin_file_pick(&self) -> Result<PickToken, StorageError> {
        self.begin_pick(PickKind::File)
    }

    pub fn begin_directory_pick(&self) -> Result<PickToken, StorageError> {
        self.begin_pick(PickKind::Directory)
    }

    /// Launches the host picker for `kind` and returns without waiting.
    ///
    /// A request of the same kind that is still pending is superseded: its
    /// callback fires with no identifier before the new picker is launched.
    /// If the host cannot show a picker the new request is dropped and no
    /// callback will fire for it.
    pub fn begin_pick(&self, kind: PickKind) -> Result<PickToken, StorageError> {
        let callbacks = self.callbacks.get().ok_or(StorageError::NotInitialized)?;

        let (request, superseded) = self.correlator.register(kind, REQUESTED_FLAGS);

        if let Some(previous) = superseded {
            tracing::info!(?kind, superseded = %previous.token, token = %request.token, "pick request superseded");
            callbacks.deliver(PickResult {
                kind,
                token: previous.token,
                identifier: None,
            });
        }

        if let Err(e) = self.picker.launch(&request) {
            self.correlator.resolve(request.token);
            tracing::warn!(?kind, token = %request.token, error = %e, "failed to launch picker");
            return Err(StorageError::PickerUnavailable {
                reason: e.to_string(),
            });
        }

        tracing::debug!(?kind, token = %request.token, request_code = request.request_code, "picker launched");
        Ok(request.token)
    }

    /// The request of `kind` still waiting for the host, if any.
    pub fn pending(&self, kind: PickKind) -> Option<PendingRequest> {
        self.correlator.pending(kind)
    }

    /// Resolves every outstanding pick as absent. Also runs on drop, so a
    /// bridge torn down while a picker is open still answers its caller.
    pub fn cancel_pending(&self) {
        for kind in [PickKind::File, PickKind::Directory] {
            let Some(pending) = self
                .correlator
                .pending(kind)
                .and_then(|p| self.correlator.resolve(p.token))
            else {
                continue;
            };

            tracing::info!(?kind, token = %pending.token, "pick cancelled by bridge shutdown");
            self.deliver(PickResult {
                kind,
                token: pending.token,
                identifier: None,
            });
        }
    }

    /// Lists file children of the tree `tree` whose names end in one of `extensions`.
    pub fn list_children<S: AsRef<str>>(
        &self,
        tree: &str,
        extensions: &[S],
    ) -> Result<Vec<DirectoryEntry>, StorageError> {
        let tree = ResourceIdentifier::parse(tree)?;
        self.enumerator
            .list_children(&tree, &ExtensionFilter::new(extensions))
    }

    /// [`Self::list_children`] serialized as a JSON array of
    /// `{identifier, displayName, mimeType?}` objects.
    pub fn list_children_json<S: AsRef<str>>(
        &self,
        tree: &str,
        extensions: &[S],
    ) -> Result<String, StorageError> {
        let entries = self.list_children(tree, extensions)?;
        serde_json::to_string(&entries).map_err(|e| StorageError::Io {
            identifier: tree.to_string(),
            reason: format!("failed to serialize listing: {e}"),
        })
    }

    pub fn read_all(&self, identifier: &str) -> Result<Vec<u8>, StorageError> {
        let identifier = ResourceIdentifier::parse(identifier)?;
        self.reader.read_all(&identifier)
    }

    pub fn display_name(&self, identifier: &str) -> Result<Option<String>, StorageError> {
        let identifier = ResourceIdentifier::parse(identifier)?;
        self.metadata.display_name(&identifier)
    }

    /// Grants the host keeps for this process across restarts.
    pub fn persisted_grants(&self) -> Result<Vec<Grant>, StorageError> {
        self.permissions.persisted_grants()
    }

    /// Grant obtained by a pick in this process that covers `identifier`.
    pub fn session_grant(&self, identifier: &str) -> Result<Option<Grant>, StorageError> {
        let identifier = ResourceIdentifier::parse(identifier)?;
        Ok(self.permissions.session_grant(&identifier))
    }

    /// Gives the grant on `identifier` back to the host. `Ok(false)` when the host refused.
    pub fn release_grant(&self, identifier: &str) -> Result<bool, StorageError> {
        let identifier = ResourceIdentifier::parse(identifier)?;
        Ok(self.permissions.release(&identifier))
    }

    fn deliver(&self, result: PickResult) {
        match self.callbacks.get() {
            Some(callbacks) => callbacks.deliver(result),
            None => tracing::error!(token = %result.token, "pick resolved before init, result lost"),
        }
    }
}

impl Drop for StorageBridge {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

impl HostEvents for StorageBridge {
    fn on_resume(&self) {
        let revoked = self.permissions.refresh();
        if !revoked.is_empty() {
            tracing::info!(count = revoked.len(), "grants revoked while paused");
        }
    }

    fn on_pick_result(&self, token: PickToken, outcome: PickOutcome) {
        let Some(pending) = self.correlator.resolve(token) else {
            tracing::warn!(%token, "dropping result for a superseded or unknown pick request");
            return;
        };

        let identifier = match outcome {
            PickOutcome::Cancelled => {
                tracing::info!(kind = ?pending.kind, %token, "pick cancelled");
                None
            }
            PickOutcome::Selected { identifier, .. }
                if pending.kind == PickKind::Directory && !identifier.is_tree() =>
            {
                tracing::warn!(%identifier, %token, "directory pick returned a non-tree identifier");
                None
            }
            PickOutcome::Selected {
                identifier,
                granted,
            } => {
                let grant = self
                    .permissions
                    .record_pick(&identifier, REQUESTED_FLAGS, granted);
                tracing::info!(
                    kind = ?pending.kind,
                    %token,
                    %identifier,
                    flags = grant.flags.bits(),
                    persisted = grant.persisted,
                    "pick completed"
                );
                Some(identifier)
            }
        };

        self.deliver(PickResult {
            kind: pending.kind,
            token,
            identifier,
        });
    }
}
