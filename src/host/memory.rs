// src/host/memory.rs
//!
//! In-process document provider
//!
//! Implements [`ContentHost`] and [`PickerLauncher`] over an in-memory
//! document table with the same grant rules as a real provider: documents are
//! only reachable through a session grant (handed out when the user picks) or
//! a persisted one, and only persisted grants survive [`MemoryProvider::simulate_restart`].
//! Fault switches cover refused persistence, failing queries, providers
//! without a display-name column and streams that break mid-read.
//!

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    ContentHost, ContentStream, Cursor, HostError, PickerLauncher, COLUMN_DISPLAY_NAME,
    COLUMN_DOCUMENT_ID, COLUMN_MIME_TYPE, MIME_TYPE_DIRECTORY,
};
use crate::correlator::{PickOutcome, PickRequest};
use crate::identifier::{IdentifierKind, ResourceIdentifier};
use crate::permissions::{Grant, GrantFlags};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";
const CHILDREN_SUFFIX: &str = "/children";

#[derive(Debug, Clone)]
struct MemoryDocument {
    parent: Option<String>,
    display_name: Option<String>,
    mime_type: Option<String>,
    content: Vec<u8>,
}

#[derive(Debug, Default)]
struct ProviderState {
    documents: BTreeMap<String, MemoryDocument>,
    session_grants: Vec<(ResourceIdentifier, GrantFlags)>,
    persisted_grants: Vec<(ResourceIdentifier, GrantFlags)>,
    refuse_persistence: bool,
    fail_queries: bool,
    omit_display_name: bool,
    fail_launch: bool,
    fail_after: HashMap<String, usize>,
    launched: Vec<PickRequest>,
}

impl ProviderState {
    fn can_read(&self, identifier: &ResourceIdentifier) -> bool {
        self.session_grants
            .iter()
            .chain(self.persisted_grants.iter())
            .any(|(granted, flags)| {
                flags.can_read() && granted.covers(identifier) && self.contains(granted, identifier)
            })
    }

    /// A tree grant only reaches documents whose parent chain leads to its root.
    fn contains(&self, granted: &ResourceIdentifier, identifier: &ResourceIdentifier) -> bool {
        if granted.kind() != IdentifierKind::Tree {
            return true;
        }

        let (Some(root), Some(mut current)) = (granted.tree_document_id(), identifier.document_id())
        else {
            return false;
        };

        // Bounded walk, a malformed table with a parent cycle must not hang
        for _ in 0..=self.documents.len() {
            if current == root {
                return true;
            }
            match self.documents.get(current).and_then(|d| d.parent.as_deref()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }

        false
    }
}

pub struct MemoryProvider {
    authority: String,
    state: Mutex<ProviderState>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub fn new(authority: &str) -> Self {
        Self {
            authority: authority.to_string(),
            state: Mutex::new(ProviderState::default()),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Tree identifier rooted at directory `document_id`.
    pub fn tree(&self, document_id: &str) -> ResourceIdentifier {
        ResourceIdentifier::tree(&self.authority, document_id)
    }

    /// Single-document identifier for `document_id`.
    pub fn document(&self, document_id: &str) -> ResourceIdentifier {
        ResourceIdentifier::document(&self.authority, document_id)
    }

    pub fn add_directory(&self, parent: Option<&str>, document_id: &str, display_name: &str) {
        self.add_document(
            parent,
            document_id,
            Some(display_name),
            Some(MIME_TYPE_DIRECTORY),
            Vec::new(),
        );
    }

    pub fn add_file(
        &self,
        parent: Option<&str>,
        document_id: &str,
        display_name: &str,
        content: impl Into<Vec<u8>>,
    ) {
        self.add_document(
            parent,
            document_id,
            Some(display_name),
            Some(DEFAULT_MIME_TYPE),
            content,
        );
    }

    /// Adds a document with full control over the optional columns.
    pub fn add_document(
        &self,
        parent: Option<&str>,
        document_id: &str,
        display_name: Option<&str>,
        mime_type: Option<&str>,
        content: impl Into<Vec<u8>>,
    ) {
        self.lock().documents.insert(
            document_id.to_string(),
            MemoryDocument {
                parent: parent.map(str::to_string),
                display_name: display_name.map(str::to_string),
                mime_type: mime_type.map(str::to_string),
                content: content.into(),
            },
        );
    }

    pub fn remove_document(&self, document_id: &str) {
        self.lock().documents.remove(document_id);
    }

    /// Plays the host side of a successful pick: hands out a session grant
    /// for `identifier` and returns the outcome the host would report.
    pub fn user_selects(&self, identifier: &ResourceIdentifier, granted: GrantFlags) -> PickOutcome {
        self.lock()
            .session_grants
            .push((identifier.clone(), granted));

        PickOutcome::Selected {
            identifier: identifier.clone(),
            granted,
        }
    }

    /// Drops every grant on `identifier`, as a user revoking access in system settings would.
    pub fn revoke(&self, identifier: &ResourceIdentifier) {
        let mut state = self.lock();
        state.session_grants.retain(|(id, _)| id != identifier);
        state.persisted_grants.retain(|(id, _)| id != identifier);
    }

    /// Forgets everything a process restart forgets: session grants and launched pickers.
    pub fn simulate_restart(&self) {
        let mut state = self.lock();
        state.session_grants.clear();
        state.launched.clear();
    }

    pub fn set_refuse_persistence(&self, refuse: bool) {
        self.lock().refuse_persistence = refuse;
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.lock().fail_queries = fail;
    }

    /// Makes every query come back without the display-name column.
    pub fn set_omit_display_name(&self, omit: bool) {
        self.lock().omit_display_name = omit;
    }

    pub fn set_fail_launch(&self, fail: bool) {
        self.lock().fail_launch = fail;
    }

    /// Streams of `document_id` break once `bytes` bytes have been delivered,
    /// as if the document was deleted while being read.
    pub fn fail_stream_after(&self, document_id: &str, bytes: usize) {
        self.lock().fail_after.insert(document_id.to_string(), bytes);
    }

    /// Picker requests launched since start (or the last simulated restart).
    pub fn launched(&self) -> Vec<PickRequest> {
        self.lock().launched.clone()
    }

    /// Cursors and streams handed out and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn denied(identifier: &ResourceIdentifier) -> HostError {
        HostError::Security {
            reason: format!("no grant covers '{identifier}'"),
        }
    }

    fn row(document_id: &str, document: &MemoryDocument, columns: &[String]) -> Vec<Option<String>> {
        columns
            .iter()
            .map(|column| match column.as_str() {
                COLUMN_DOCUMENT_ID => Some(document_id.to_string()),
                COLUMN_DISPLAY_NAME => document.display_name.clone(),
                COLUMN_MIME_TYPE => document.mime_type.clone(),
                _ => None,
            })
            .collect()
    }
}

impl ContentHost for MemoryProvider {
    fn query(
        &self,
        identifier: &ResourceIdentifier,
        projection: &[&str],
    ) -> Result<Option<Box<dyn Cursor>>, HostError> {
        let state = self.lock();

        if state.fail_queries {
            return Err(HostError::Provider {
                reason: "provider process died".to_string(),
            });
        }

        if !state.can_read(identifier) {
            return Err(Self::denied(identifier));
        }

        let columns: Vec<String> = projection
            .iter()
            .filter(|c| !(state.omit_display_name && **c == COLUMN_DISPLAY_NAME))
            .map(|c| c.to_string())
            .collect();

        let document_id = identifier
            .document_id()
            .ok_or_else(|| HostError::FileNotFound {
                identifier: identifier.to_string(),
            })?;

        let rows = if identifier.as_str().ends_with(CHILDREN_SUFFIX) {
            if !state.documents.contains_key(document_id) {
                return Err(HostError::FileNotFound {
                    identifier: identifier.to_string(),
                });
            }

            state
                .documents
                .iter()
                .filter(|(_, doc)| doc.parent.as_deref() == Some(document_id))
                .map(|(id, doc)| Self::row(id, doc, &columns))
                .collect()
        } else {
            state
                .documents
                .get(document_id)
                .map(|doc| vec![Self::row(document_id, doc, &columns)])
                .unwrap_or_default()
        };

        Ok(Some(Box::new(MemoryCursor {
            columns,
            rows,
            position: None,
            _handle: HandleGuard::acquire(&self.open_handles),
        })))
    }

    fn open_input_stream(
        &self,
        identifier: &ResourceIdentifier,
    ) -> Result<Option<ContentStream>, HostError> {
        let state = self.lock();

        if !state.can_read(identifier) {
            return Err(Self::denied(identifier));
        }

        let not_found = || HostError::FileNotFound {
            identifier: identifier.to_string(),
        };

        let document_id = identifier.document_id().ok_or_else(not_found)?;
        let document = state.documents.get(document_id).ok_or_else(not_found)?;

        if document.mime_type.as_deref() == Some(MIME_TYPE_DIRECTORY) {
            return Err(not_found());
        }

        Ok(Some(Box::new(MemoryStream {
            content: document.content.clone(),
            position: 0,
            fail_after: state.fail_after.get(document_id).copied(),
            _handle: HandleGuard::acquire(&self.open_handles),
        })))
    }

    fn take_persistable_permission(
        &self,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError> {
        let mut state = self.lock();

        if state.refuse_persistence {
            return Err(HostError::Security {
                reason: format!("no persistable permission grants found for '{identifier}'"),
            });
        }

        let offered = state
            .session_grants
            .iter()
            .any(|(id, granted)| id == identifier && granted.contains(flags));
        if !offered {
            return Err(HostError::Security {
                reason: format!("'{identifier}' was not granted {} by a pick", flags.bits()),
            });
        }

        let existing = state
            .persisted_grants
            .iter()
            .position(|(id, _)| id == identifier);
        match existing {
            Some(position) => {
                let merged = state.persisted_grants[position].1 | flags;
                state.persisted_grants[position].1 = merged;
            }
            None => state.persisted_grants.push((identifier.clone(), flags)),
        }

        Ok(())
    }

    fn release_persistable_permission(
        &self,
        identifier: &ResourceIdentifier,
        flags: GrantFlags,
    ) -> Result<(), HostError> {
        let mut state = self.lock();

        let Some(position) = state
            .persisted_grants
            .iter()
            .position(|(id, _)| id == identifier)
        else {
            return Err(HostError::Security {
                reason: format!("no persisted grant for '{identifier}'"),
            });
        };

        let remaining = GrantFlags::from_bits_truncate(
            state.persisted_grants[position].1.bits() & !flags.bits(),
        );
        if remaining.is_empty() {
            state.persisted_grants.remove(position);
        } else {
            state.persisted_grants[position].1 = remaining;
        }

        Ok(())
    }

    fn persisted_permissions(&self) -> Result<Vec<Grant>, HostError> {
        Ok(self
            .lock()
            .persisted_grants
            .iter()
            .map(|(identifier, flags)| Grant {
                identifier: identifier.clone(),
                flags: *flags,
                persisted: true,
            })
            .collect())
    }
}

impl PickerLauncher for MemoryProvider {
    fn launch(&self, request: &PickRequest) -> Result<(), HostError> {
        let mut state = self.lock();

        if state.fail_launch {
            return Err(HostError::Provider {
                reason: "no activity found to handle the picker intent".to_string(),
            });
        }

        state.launched.push(request.clone());
        Ok(())
    }
}

/// Counts a live cursor or stream until dropped.
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    position: Option<usize>,
    _handle: HandleGuard,
}

impl Cursor for MemoryCursor {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn move_to_next(&mut self) -> Result<bool, HostError> {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.rows.len());
            Ok(false)
        }
    }

    fn get_string(&self, column: usize) -> Result<Option<String>, HostError> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| HostError::Provider {
                reason: "cursor is not positioned on a row".to_string(),
            })?;

        row.get(column).cloned().ok_or_else(|| HostError::Provider {
            reason: format!("column index {column} out of range"),
        })
    }
}

struct MemoryStream {
    content: Vec<u8>,
    position: usize,
    fail_after: Option<usize>,
    _handle: HandleGuard,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.fail_after.unwrap_or(usize::MAX);
        if self.position >= limit {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "document was deleted while being read",
            ));
        }

        let end = self
            .content
            .len()
            .min(self.position.saturating_add(buf.len()))
            .min(limit);
        let n = end - self.position;
        buf[..n].copy_from_slice(&self.content[self.position..end]);
        self.position = end;
        Ok(n)
    }
}
