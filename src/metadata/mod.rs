// src/metadata/mod.rs
//!
//! Display-name resolution
//!

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::error::StorageError;
use crate::host::{ContentHost, COLUMN_DISPLAY_NAME};
use crate::identifier::ResourceIdentifier;

pub struct MetadataResolver {
    host: Arc<dyn ContentHost>,
}

impl MetadataResolver {
    pub fn new(host: Arc<dyn ContentHost>) -> Self {
        Self { host }
    }

    /// Resolves the user-visible name of `identifier` with one single-column query.
    ///
    /// No cursor, no row, no display-name column or an empty value all mean
    /// `Ok(None)`. Only host faults are errors.
    pub fn display_name(
        &self,
        identifier: &ResourceIdentifier,
    ) -> Result<Option<String>, StorageError> {
        let query_error = |e| StorageError::from_query(identifier.as_str(), e);

        let Some(mut cursor) = self
            .host
            .query(identifier, &[COLUMN_DISPLAY_NAME])
            .map_err(query_error)?
        else {
            tracing::debug!(%identifier, "provider returned no cursor");
            return Ok(None);
        };

        let Some(column) = cursor.column_index(COLUMN_DISPLAY_NAME) else {
            tracing::debug!(%identifier, "provider has no display-name column");
            return Ok(None);
        };

        if !cursor.move_to_next().map_err(query_error)? {
            return Ok(None);
        }

        let name = cursor.get_string(column).map_err(query_error)?;
        Ok(name.filter(|n| !n.is_empty()))
    }
}
