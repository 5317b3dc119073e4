// src/bridge/callbacks.rs
//!
//! Callback table for pick results
//!
//! Registered once at `init()` and keyed by pick kind. Each begin-pick call
//! ends in exactly one invocation of the callback of its kind.
//!

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

use crate::correlator::{PickKind, PickToken};
use crate::identifier::ResourceIdentifier;

/// Terminal result of one pick request. `identifier` is `None` when nothing was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickResult {
    pub kind: PickKind,
    pub token: PickToken,
    pub identifier: Option<ResourceIdentifier>,
}

pub type PickCallback = Box<dyn Fn(PickResult) + Send + Sync>;

pub struct PickCallbacks {
    on_file_picked: PickCallback,
    on_directory_picked: PickCallback,
}

impl PickCallbacks {
    pub fn new<F, D>(on_file_picked: F, on_directory_picked: D) -> Self
    where
        F: Fn(PickResult) + Send + Sync + 'static,
        D: Fn(PickResult) + Send + Sync + 'static,
    {
        Self {
            on_file_picked: Box::new(on_file_picked),
            on_directory_picked: Box::new(on_directory_picked),
        }
    }

    /// Callbacks that forward every result into a channel, for consumers that
    /// prefer to await results over handling them in place.
    pub fn channel() -> (Self, PickEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dir_tx = tx.clone();

        let callbacks = Self::new(
            move |result| {
                if tx.send(result).is_err() {
                    tracing::debug!("pick result dropped, receiver is gone");
                }
            },
            move |result| {
                if dir_tx.send(result).is_err() {
                    tracing::debug!("pick result dropped, receiver is gone");
                }
            },
        );

        (callbacks, PickEvents { rx })
    }

    pub(crate) fn deliver(&self, result: PickResult) {
        match result.kind {
            PickKind::File => (self.on_file_picked)(result),
            PickKind::Directory => (self.on_directory_picked)(result),
        }
    }
}

impl fmt::Debug for PickCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PickCallbacks").finish_non_exhaustive()
    }
}

/// Receiving end of [`PickCallbacks::channel`]
#[derive(Debug)]
pub struct PickEvents {
    rx: mpsc::UnboundedReceiver<PickResult>,
}

impl PickEvents {
    pub async fn recv(&mut self) -> Option<PickResult> {
        self.rx.recv().await
    }

    /// Blocks the current thread until the next result. Must not be called
    /// from inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<PickResult> {
        self.rx.blocking_recv()
    }

    pub fn try_recv(&mut self) -> Option<PickResult> {
        self.rx.try_recv().ok()
    }
}
