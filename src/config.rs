// src/config.rs
//!
//! Bridge configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.
//!

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::correlator::RequestCodes;
use crate::error::StorageError;
use crate::reader::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_FILE_PICK_REQUEST_CODE: i32 = 1001;
pub const DEFAULT_DIRECTORY_PICK_REQUEST_CODE: i32 = 42;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Size of each read from a content stream
    pub read_chunk_size: usize,
    /// Reads of larger resources fail with `TooLarge`; `None` means unbounded
    pub max_read_bytes: Option<u64>,
    pub file_pick_request_code: i32,
    pub directory_pick_request_code: i32,
    /// Ask the host to keep picked grants across restarts
    pub persist_grants: bool,
    /// Fallback `tracing` filter directive when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            max_read_bytes: None,
            file_pick_request_code: DEFAULT_FILE_PICK_REQUEST_CODE,
            directory_pick_request_code: DEFAULT_DIRECTORY_PICK_REQUEST_CODE,
            persist_grants: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StorageError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StorageError::Config {
            reason: format!("Failed to read '{}': {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if self.read_chunk_size == 0 {
            return Err(StorageError::Config {
                reason: "readChunkSize must be greater than zero".to_string(),
            });
        }

        if self.file_pick_request_code == self.directory_pick_request_code {
            return Err(StorageError::Config {
                reason: format!(
                    "file and directory pickers share request code {}",
                    self.file_pick_request_code
                ),
            });
        }

        if self.max_read_bytes == Some(0) {
            return Err(StorageError::Config {
                reason: "maxReadBytes must be greater than zero when set".to_string(),
            });
        }

        Ok(())
    }

    pub fn request_codes(&self) -> RequestCodes {
        RequestCodes {
            file: self.file_pick_request_code,
            directory: self.directory_pick_request_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.file_pick_request_code, 1001);
        assert_eq!(config.directory_pick_request_code, 42);
        assert!(config.persist_grants);
    }

    #[test]
    fn test_camel_case_fields() {
        let config = BridgeConfig::from_json_str(
            r#"{"readChunkSize": 512, "maxReadBytes": 8388608, "persistGrants": false, "logFilter": "saf_bridge=debug"}"#,
        )
        .unwrap();

        assert_eq!(config.read_chunk_size, 512);
        assert_eq!(config.max_read_bytes, Some(8 * 1024 * 1024));
        assert!(!config.persist_grants);
        assert_eq!(config.log_filter, "saf_bridge=debug");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"readChunkSize": 0}"#),
            Err(StorageError::Config { .. })
        ));
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"filePickRequestCode": 7, "directoryPickRequestCode": 7}"#),
            Err(StorageError::Config { .. })
        ));
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{"maxReadBytes": 0}"#),
            Err(StorageError::Config { .. })
        ));
        assert!(matches!(
            BridgeConfig::from_json_str("not json"),
            Err(StorageError::Config { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"directoryPickRequestCode": 43}}"#).unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.request_codes().directory, 43);
        assert_eq!(config.request_codes().file, 1001);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = BridgeConfig::load(dir.path().join("bridge.json"));
        assert!(matches!(result, Err(StorageError::Config { .. })));
    }
}
