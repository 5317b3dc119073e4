// src/error.rs
use thiserror::Error;

use crate::host::HostError;

/// Error codes for callers on the other side of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    InvalidArgument = 1000,
    NotFound = 1001,
    Io = 2000,
    ProviderQuery = 2001,
    TooLarge = 2002,
    NotInitialized = 3000,
    AlreadyInitialized = 3001,
    PickerUnavailable = 3002,
    Config = 4000,
}

impl serde::Serialize for StorageErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u16(*self as u16)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Wrong identifier kind for the operation, or an identifier that does not parse.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Missing grant, deleted resource or a provider that cannot open it.
    #[error("Resource not found: {identifier}")]
    NotFound { identifier: String },

    #[error("I/O error while reading '{identifier}': {reason}")]
    Io { identifier: String, reason: String },

    #[error("Provider query failed for '{identifier}': {reason}")]
    ProviderQuery { identifier: String, reason: String },

    #[error("Content of '{identifier}' exceeds the {limit} byte read limit")]
    TooLarge { identifier: String, limit: u64 },

    #[error("Bridge not initialized: init() must run before any pick request")]
    NotInitialized,

    #[error("Bridge already initialized")]
    AlreadyInitialized,

    #[error("Picker UI could not be launched: {reason}")]
    PickerUnavailable { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl StorageError {
    pub fn code(&self) -> StorageErrorCode {
        match self {
            StorageError::InvalidArgument { .. } => StorageErrorCode::InvalidArgument,
            StorageError::NotFound { .. } => StorageErrorCode::NotFound,
            StorageError::Io { .. } => StorageErrorCode::Io,
            StorageError::ProviderQuery { .. } => StorageErrorCode::ProviderQuery,
            StorageError::TooLarge { .. } => StorageErrorCode::TooLarge,
            StorageError::NotInitialized => StorageErrorCode::NotInitialized,
            StorageError::AlreadyInitialized => StorageErrorCode::AlreadyInitialized,
            StorageError::PickerUnavailable { .. } => StorageErrorCode::PickerUnavailable,
            StorageError::Config { .. } => StorageErrorCode::Config,
        }
    }

    pub fn invalid_argument<S: Into<String>>(reason: S) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn not_found<S: Into<String>>(identifier: S) -> Self {
        Self::NotFound {
            identifier: identifier.into(),
        }
    }

    /// Maps a host fault raised while querying `identifier`.
    pub fn from_query(identifier: &str, err: HostError) -> Self {
        match err {
            HostError::FileNotFound { .. } | HostError::Security { .. } => {
                Self::not_found(identifier)
            }
            other => Self::ProviderQuery {
                identifier: identifier.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Maps a host fault raised while opening or reading a stream for `identifier`.
    pub fn from_stream(identifier: &str, err: HostError) -> Self {
        match err {
            HostError::FileNotFound { .. } | HostError::Security { .. } => {
                Self::not_found(identifier)
            }
            other => Self::Io {
                identifier: identifier.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// True for the outcomes a caller should treat as "resource unavailable".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    fn type_name(&self) -> &'static str {
        match self {
            StorageError::InvalidArgument { .. } => "InvalidArgument",
            StorageError::NotFound { .. } => "NotFound",
            StorageError::Io { .. } => "Io",
            StorageError::ProviderQuery { .. } => "ProviderQuery",
            StorageError::TooLarge { .. } => "TooLarge",
            StorageError::NotInitialized => "NotInitialized",
            StorageError::AlreadyInitialized => "AlreadyInitialized",
            StorageError::PickerUnavailable { .. } => "PickerUnavailable",
            StorageError::Config { .. } => "Config",
        }
    }
}

impl serde::Serialize for StorageError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("StorageError", 3)?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("type", self.type_name())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<StorageError> for String {
    fn from(error: StorageError) -> Self {
        serde_json::to_string(&error).unwrap_or_else(|_| error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Config {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_code_type_and_message() {
        let err = StorageError::ProviderQuery {
            identifier: "content://p/tree/root".to_string(),
            reason: "cursor was null".to_string(),
        };

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], 2001);
        assert_eq!(json["type"], "ProviderQuery");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("cursor was null"));
    }

    #[test]
    fn test_security_fault_degrades_to_not_found() {
        let err = StorageError::from_stream(
            "content://p/document/a",
            HostError::Security {
                reason: "no grant".to_string(),
            },
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_provider_fault_is_not_conflated_with_not_found() {
        let err = StorageError::from_query(
            "content://p/tree/root",
            HostError::Provider {
                reason: "remote exception".to_string(),
            },
        );
        assert_eq!(err.code(), StorageErrorCode::ProviderQuery);

        let err = StorageError::from_stream(
            "content://p/document/a",
            HostError::Io(std::io::Error::other("pipe closed")),
        );
        assert_eq!(err.code(), StorageErrorCode::Io);
    }

    #[test]
    fn test_error_into_string_is_json() {
        let s: String = StorageError::NotInitialized.into();
        assert!(s.contains("\"code\":3000"));
    }
}
