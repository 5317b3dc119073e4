// src/host/mod.rs
//!
//! Host capabilities
//!
//! The bridge never reaches the platform through ambient globals. Whoever owns
//! it injects a [`ContentHost`] (queries, streams, persistable grants) and a
//! [`PickerLauncher`] (picker UI) at construction time. The Android build
//! implements both over JNI; [`memory::MemoryProvider`] implements them
//! in-process.
//!

pub mod memory;

use std::io::Read;
use thiserror::Error;

use crate::correlator::PickRequest;
use crate::identifier::ResourceIdentifier;
use crate::permissions::{Grant, GrantFlags};

/// Stable document id column of a tree children query
pub const COLUMN_DOCUMENT_ID: &str = "document_id";
/// Display-name column shared by document and openable queries
pub const COLUMN_DISPLAY_NAME: &str = "_display_name";
pub const COLUMN_MIME_TYPE: &str = "mime_type";
/// MIME type a provider reports for directory documents
pub const MIME_TYPE_DIRECTORY: &str = "vnd.android.document/directory";

/// Faults raised by the host platform
#[derive(Debug, Error)]
pub enum HostError {
    #[error("No content at '{identifier}'")]
    FileNotFound { identifier: String },

    #[error("Access denied: {reason}")]
    Security { reason: String },

    #[error("Provider failure: {reason}")]
    Provider { reason: String },

    #[error("Stream failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Forward-only view over a host query result.
///
/// Dropping the cursor releases the underlying result set, so every exit path
/// of a caller closes it.
pub trait Cursor {
    /// Index of `name` in the result set, `None` when the provider did not return that column.
    fn column_index(&self, name: &str) -> Option<usize>;

    /// Advances to the next row. Returns `false` once the rows are exhausted.
    fn move_to_next(&mut self) -> Result<bool, HostError>;

    /// Value of `column` in the current row; `None` for SQL NULL.
    fn get_string(&self, column: usize) -> Result<Option<String>, HostError>;
}

/// Byte stream of a resource. Dropping it releases the host handle.
pub type ContentStream = Box<dyn Read + Send>;

/// Content access the host grants this process
pub trait ContentHost: Send + Sync {
    /// Runs a metadata query against `identifier` restricted to `projection`.
    ///
    /// `Ok(None)` mirrors a provider that returned no result set at all.
    fn query(
        &self,
        identifier: &ResourceIdentifier,
        projection: &[&str],
    ) -> Result<Option<Box<dyn Cursor>>, HostError>;

    /// Opens a read stream. `Ok(None)` when the provider has nothing to open.
    fn open_input_stream(
        &self,
        identifier: &ResourceIdentifier,
    ) -> Result<Option<ContentStream>, HostError>;

    /// Asks the host to keep the grant for `identifier` across restarts.
    fn take_persistable_permission(
        &self,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError>;

    /// Gives a persisted grant back to the host.
    fn release_persistable_permission(
        &self,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError>;

    /// Grants the host currently keeps for this process.
    fn persisted_permissions(&self) -> Result<Vec<Grant>, HostError>;
}

/// Picker UI owned by the host
pub trait PickerLauncher: Send + Sync {
    /// Shows the picker for `request` and returns without waiting for the user.
    ///
    /// The host later reports the outcome with `request.request_code`.
    fn launch(&self, request: &PickRequest) -> Result<(), HostError>;
}
