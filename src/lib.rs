pub mod bridge;
pub mod config;
pub mod correlator;
pub mod enumerator;
pub mod error;
pub mod host;
pub mod identifier;
pub mod metadata;
pub mod permissions;
pub mod reader;
#[cfg(target_os = "android")]
pub mod android;

pub use crate::bridge::{HostEvents, PickCallbacks, PickEvents, PickResult, StorageBridge};
pub use crate::config::BridgeConfig;
pub use crate::correlator::{PickKind, PickOutcome, PickToken};
pub use crate::enumerator::{DirectoryEntry, ExtensionFilter};
pub use crate::error::{StorageError, StorageErrorCode};
pub use crate::host::{ContentHost, Cursor, HostError, PickerLauncher};
pub use crate::identifier::ResourceIdentifier;
pub use crate::permissions::{Grant, GrantFlags};

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: logcat on Android, fmt to stdout elsewhere.
///
/// `RUST_LOG` wins over `default_filter`. Does nothing when the embedding
/// process already installed a subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if tracing_subscriber::registry()
        .with(filter)
        .with(output_layer())
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

// stdout of an app process is discarded on Android
#[cfg(target_os = "android")]
fn output_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    paranoid_android::layer(env!("CARGO_PKG_NAME"))
}

#[cfg(not(target_os = "android"))]
fn output_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer().with_target(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("saf_bridge=debug");
        init_tracing("info");
        tracing::info!("still logging after a second init");
    }

    #[test]
    fn test_output_layer_formats_events() {
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("trace"))
            .with(output_layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(token = 7, "pick launched");
        });
    }
}
