// src/enumerator/mod.rs
//!
//! Directory enumeration
//!
//! Lists the immediate file children of a granted tree node. One level only,
//! no recursion, nothing cached between calls.
//!

mod filter;

pub use filter::ExtensionFilter;

use serde::Serialize;
use std::sync::Arc;

use crate::error::StorageError;
use crate::host::{
    ContentHost, COLUMN_DISPLAY_NAME, COLUMN_DOCUMENT_ID, COLUMN_MIME_TYPE, MIME_TYPE_DIRECTORY,
};
use crate::identifier::ResourceIdentifier;

/// A qualifying child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub identifier: ResourceIdentifier,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

pub struct DirectoryEnumerator {
    host: Arc<dyn ContentHost>,
}

impl DirectoryEnumerator {
    pub fn new(host: Arc<dyn ContentHost>) -> Self {
        Self { host }
    }

    /// Lists the file children of `tree` whose names pass `filter`.
    ///
    /// A child qualifies when the provider reports a non-directory MIME type
    /// and a non-empty display name. Order is whatever the provider returns.
    /// A failed or missing children query is an error, never an empty listing.
    pub fn list_children(
        &self,
        tree: &ResourceIdentifier,
        filter: &ExtensionFilter,
    ) -> Result<Vec<DirectoryEntry>, StorageError> {
        if !tree.is_tree() {
            return Err(StorageError::invalid_argument(format!(
                "'{tree}' is not a tree identifier"
            )));
        }

        let children = tree.children_query()?;
        let query_error = |e| StorageError::from_query(tree.as_str(), e);

        let mut cursor = self
            .host
            .query(
                &children,
                &[COLUMN_DOCUMENT_ID, COLUMN_DISPLAY_NAME, COLUMN_MIME_TYPE],
            )
            .map_err(query_error)?
            .ok_or_else(|| StorageError::ProviderQuery {
                identifier: tree.to_string(),
                reason: "provider returned no cursor for the children query".to_string(),
            })?;

        let id_column =
            cursor
                .column_index(COLUMN_DOCUMENT_ID)
                .ok_or_else(|| StorageError::ProviderQuery {
                    identifier: tree.to_string(),
                    reason: format!("children query has no '{COLUMN_DOCUMENT_ID}' column"),
                })?;
        let name_column = cursor.column_index(COLUMN_DISPLAY_NAME);
        let mime_column = cursor.column_index(COLUMN_MIME_TYPE);

        let mut entries = Vec::new();
        let mut skipped = 0usize;

        while cursor.move_to_next().map_err(query_error)? {
            let Some(document_id) = cursor.get_string(id_column).map_err(query_error)? else {
                skipped += 1;
                continue;
            };

            let mime_type = match mime_column {
                Some(column) => cursor.get_string(column).map_err(query_error)?,
                None => None,
            };
            let is_file = mime_type
                .as_deref()
                .is_some_and(|m| !m.is_empty() && m != MIME_TYPE_DIRECTORY);
            if !is_file {
                skipped += 1;
                continue;
            }

            let display_name = match name_column {
                Some(column) => cursor.get_string(column).map_err(query_error)?,
                None => None,
            };
            let Some(display_name) = display_name.filter(|n| !n.is_empty()) else {
                skipped += 1;
                continue;
            };

            if !filter.matches(&display_name) {
                skipped += 1;
                continue;
            }

            entries.push(DirectoryEntry {
                identifier: tree.child(&document_id)?,
                display_name,
                mime_type,
            });
        }

        tracing::debug!(%tree, matched = entries.len(), skipped, "listed directory");
        Ok(entries)
    }
}
