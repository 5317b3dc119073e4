// src/reader/mod.rs
//!
//! Whole-content reads of granted resources
//!

#[cfg(test)]
mod tests;

use std::io::{ErrorKind, Read};
use std::sync::Arc;

use crate::error::StorageError;
use crate::host::{ContentHost, HostError};
use crate::identifier::ResourceIdentifier;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Reads a resource to end-of-stream into one buffer
pub struct ContentReader {
    host: Arc<dyn ContentHost>,
    chunk_size: usize,
    max_bytes: Option<u64>,
}

impl ContentReader {
    pub fn new(host: Arc<dyn ContentHost>, chunk_size: usize, max_bytes: Option<u64>) -> Self {
        Self {
            host,
            chunk_size: chunk_size.max(1),
            max_bytes,
        }
    }

    /// Returns the complete content of `identifier`.
    ///
    /// A stream that cannot be opened is `NotFound`. A stream that breaks
    /// partway through discards what was read so far; truncated content is
    /// never returned. The stream is dropped, and so released, on every path.
    pub fn read_all(&self, identifier: &ResourceIdentifier) -> Result<Vec<u8>, StorageError> {
        let mut stream = match self.host.open_input_stream(identifier) {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                tracing::debug!(%identifier, "provider returned no stream");
                return Err(StorageError::not_found(identifier.as_str()));
            }
            Err(e) => {
                tracing::debug!(%identifier, error = %e, "failed to open stream");
                return Err(StorageError::from_stream(identifier.as_str(), e));
            }
        };

        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(%identifier, read = buffer.len(), "resource disappeared mid-read");
                    return Err(StorageError::not_found(identifier.as_str()));
                }
                Err(e) => {
                    tracing::warn!(%identifier, read = buffer.len(), error = %e, "read failed mid-stream");
                    return Err(StorageError::from_stream(identifier.as_str(), HostError::Io(e)));
                }
            };

            if let Some(limit) = self.max_bytes {
                if (buffer.len() + n) as u64 > limit {
                    tracing::warn!(%identifier, limit, "content exceeds read limit");
                    return Err(StorageError::TooLarge {
                        identifier: identifier.to_string(),
                        limit,
                    });
                }
            }

            buffer.extend_from_slice(&chunk[..n]);
        }

        tracing::debug!(%identifier, bytes = buffer.len(), "read complete");
        Ok(buffer)
    }
}
