// src/correlator/mod.rs
//!
//! Pick request correlation
//!
//! At most one request per kind is outstanding. Tokens are never reused, so a
//! late result for a superseded or already resolved request is recognised by
//! its token and dropped instead of being routed to the current request.
//!


use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::identifier::ResourceIdentifier;
use crate::permissions::GrantFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PickKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickToken(u64);

impl PickToken {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PickToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outstanding pick, destroyed by its single resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub kind: PickKind,
    pub token: PickToken,
}

/// What the host is asked to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub kind: PickKind,
    pub token: PickToken,
    /// Host-side request code for this kind of picker
    pub request_code: i32,
    /// Access bits the picker should offer
    pub requested: GrantFlags,
}

/// How the host's picker UI ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected {
        identifier: ResourceIdentifier,
        granted: GrantFlags,
    },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCodes {
    pub file: i32,
    pub directory: i32,
}

impl RequestCodes {
    pub fn for_kind(&self, kind: PickKind) -> i32 {
        match kind {
            PickKind::File => self.file,
            PickKind::Directory => self.directory,
        }
    }
}

pub struct RequestCorrelator {
    codes: RequestCodes,
    next_token: AtomicU64,
    pending: Mutex<HashMap<PickKind, PendingRequest>>,
}

impl RequestCorrelator {
    pub fn new(codes: RequestCodes) -> Self {
        Self {
            codes,
            next_token: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new pending request for `kind`.
    ///
    /// Returns the request to launch and, if one was outstanding, the request
    /// it supersedes. The caller must still resolve the superseded one.
    pub fn register(
        &self,
        kind: PickKind,
        requested: GrantFlags,
    ) -> (PickRequest, Option<PendingRequest>) {
        let token = PickToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let superseded = self.lock().insert(kind, PendingRequest { kind, token });

        let request = PickRequest {
            kind,
            token,
            request_code: self.codes.for_kind(kind),
            requested,
        };

        (request, superseded)
    }

    /// Clears and returns the pending request carrying `token`.
    ///
    /// `None` means the token is stale (superseded, already resolved) or was never issued.
    pub fn resolve(&self, token: PickToken) -> Option<PendingRequest> {
        let mut pending = self.lock();
        let kind = pending
            .values()
            .find(|p| p.token == token)
            .map(|p| p.kind)?;
        pending.remove(&kind)
    }

    pub fn pending(&self, kind: PickKind) -> Option<PendingRequest> {
        self.lock().get(&kind).copied()
    }

    pub fn request_codes(&self) -> RequestCodes {
        self.codes
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PickKind, PendingRequest>> {
        // The table stays consistent even if a holder panicked: every update is a single insert/remove.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
