// src/identifier/mod.rs
//!
//! Resource identifiers
//!
//! Parses and classifies the opaque `content://` tokens the host hands out
//! for picked documents and directory trees. The raw string is kept verbatim
//! so it round-trips through the host's grant table unchanged; only
//! identifiers derived here (children queries, child documents) are built
//! from decoded parts.
//!

#[cfg(test)]
mod tests;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::StorageError;

pub const CONTENT_SCHEME: &str = "content";

const PATH_TREE: &str = "tree";
const PATH_DOCUMENT: &str = "document";
const PATH_CHILDREN: &str = "children";

/// Characters the host leaves unescaped inside a path segment.
const DOCUMENT_ID_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'!')
    .remove(b'.')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// What an identifier refers to in the host's content-addressing scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentifierKind {
    /// `content://<authority>/document/<docId>`, a single picked document
    Document,
    /// `content://<authority>/tree/<treeDocId>`, the root of a granted tree
    Tree,
    /// `content://<authority>/tree/<treeDocId>/document/<docId>`, a node inside a granted tree
    TreeDocument,
    /// Any other absolute URI the host can open (media store, file, ...)
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceIdentifier {
    raw: String,
    kind: IdentifierKind,
    authority: Option<String>,
    tree_id: Option<String>,
    document_id: Option<String>,
}

impl ResourceIdentifier {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StorageError::invalid_argument("empty resource identifier"));
        }

        let url = Url::parse(trimmed).map_err(|e| {
            StorageError::invalid_argument(format!("'{trimmed}' is not a valid URI: {e}"))
        })?;

        let authority = url.host_str().filter(|h| !h.is_empty()).map(str::to_string);

        let mut identifier = Self {
            raw: trimmed.to_string(),
            kind: IdentifierKind::Opaque,
            authority,
            tree_id: None,
            document_id: None,
        };

        if url.scheme() != CONTENT_SCHEME || identifier.authority.is_none() {
            return Ok(identifier);
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [PATH_DOCUMENT, doc] => {
                identifier.kind = IdentifierKind::Document;
                identifier.document_id = Some(decode_segment(doc)?);
            }
            [PATH_TREE, tree] => {
                identifier.kind = IdentifierKind::Tree;
                identifier.tree_id = Some(decode_segment(tree)?);
            }
            [PATH_TREE, tree, PATH_DOCUMENT, doc] => {
                identifier.kind = IdentifierKind::TreeDocument;
                identifier.tree_id = Some(decode_segment(tree)?);
                identifier.document_id = Some(decode_segment(doc)?);
            }
            _ => {}
        }

        Ok(identifier)
    }

    /// Builds `content://<authority>/document/<docId>`.
    pub fn document(authority: &str, document_id: &str) -> Self {
        Self {
            raw: format!(
                "{CONTENT_SCHEME}://{authority}/{PATH_DOCUMENT}/{}",
                encode_segment(document_id)
            ),
            kind: IdentifierKind::Document,
            authority: Some(authority.to_string()),
            tree_id: None,
            document_id: Some(document_id.to_string()),
        }
    }

    /// Builds `content://<authority>/tree/<treeDocId>`.
    pub fn tree(authority: &str, tree_id: &str) -> Self {
        Self {
            raw: format!(
                "{CONTENT_SCHEME}://{authority}/{PATH_TREE}/{}",
                encode_segment(tree_id)
            ),
            kind: IdentifierKind::Tree,
            authority: Some(authority.to_string()),
            tree_id: Some(tree_id.to_string()),
            document_id: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Decoded document id of the tree this identifier belongs to.
    pub fn tree_document_id(&self) -> Option<&str> {
        self.tree_id.as_deref()
    }

    /// Decoded id of the document itself. For a tree root this is the tree's own document id.
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref().or(self.tree_id.as_deref())
    }

    pub fn is_tree(&self) -> bool {
        matches!(self.kind, IdentifierKind::Tree | IdentifierKind::TreeDocument)
    }

    /// Identifier of the children query for this tree node:
    /// `content://<authority>/tree/<treeDocId>/document/<docId>/children`.
    pub fn children_query(&self) -> Result<Self, StorageError> {
        let (authority, tree_id, parent_id) = self.tree_parts()?;

        Ok(Self {
            raw: format!(
                "{CONTENT_SCHEME}://{authority}/{PATH_TREE}/{}/{PATH_DOCUMENT}/{}/{PATH_CHILDREN}",
                encode_segment(tree_id),
                encode_segment(parent_id)
            ),
            kind: IdentifierKind::Opaque,
            authority: Some(authority.to_string()),
            tree_id: Some(tree_id.to_string()),
            document_id: Some(parent_id.to_string()),
        })
    }

    /// Identifier of a document inside the same granted tree.
    pub fn child(&self, document_id: &str) -> Result<Self, StorageError> {
        let (authority, tree_id, _) = self.tree_parts()?;

        Ok(Self {
            raw: format!(
                "{CONTENT_SCHEME}://{authority}/{PATH_TREE}/{}/{PATH_DOCUMENT}/{}",
                encode_segment(tree_id),
                encode_segment(document_id)
            ),
            kind: IdentifierKind::TreeDocument,
            authority: Some(authority.to_string()),
            tree_id: Some(tree_id.to_string()),
            document_id: Some(document_id.to_string()),
        })
    }

    /// True when a grant held on `self` names `other` by its identifier shape.
    ///
    /// A tree grant matches every `tree/<same>/document/<any>` identifier;
    /// whether that document really sits below the tree root is only known to
    /// the host, which rejects escaping identifiers when they are opened.
    pub fn covers(&self, other: &ResourceIdentifier) -> bool {
        if self.raw == other.raw {
            return true;
        }

        match self.kind {
            IdentifierKind::Tree => {
                self.authority == other.authority
                    && other.tree_id.is_some()
                    && self.tree_id == other.tree_id
            }
            IdentifierKind::Document => {
                self.authority == other.authority
                    && other.kind == IdentifierKind::Document
                    && self.document_id == other.document_id
            }
            _ => false,
        }
    }

    fn tree_parts(&self) -> Result<(&str, &str, &str), StorageError> {
        if !self.is_tree() {
            return Err(StorageError::invalid_argument(format!(
                "'{}' is not a tree identifier",
                self.raw
            )));
        }

        match (self.authority(), self.tree_document_id(), self.document_id()) {
            (Some(authority), Some(tree_id), Some(doc_id)) => Ok((authority, tree_id, doc_id)),
            _ => Err(StorageError::invalid_argument(format!(
                "'{}' is missing tree components",
                self.raw
            ))),
        }
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, DOCUMENT_ID_SEGMENT).to_string()
}

fn decode_segment(segment: &str) -> Result<String, StorageError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| StorageError::invalid_argument(format!("undecodable path segment '{segment}': {e}")))
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for ResourceIdentifier {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ResourceIdentifier {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceIdentifier {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceIdentifier> for String {
    fn from(value: ResourceIdentifier) -> Self {
        value.raw
    }
}
