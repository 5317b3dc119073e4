// src/identifier/tests.rs

use super::*;

const AUTHORITY: &str = "com.android.externalstorage.documents";

#[test]
fn test_parse_single_document() {
    let id = ResourceIdentifier::parse(
        "content://com.android.externalstorage.documents/document/primary%3ARoms%2Fa.gb",
    )
    .unwrap();

    assert_eq!(id.kind(), IdentifierKind::Document);
    assert_eq!(id.authority(), Some(AUTHORITY));
    assert_eq!(id.document_id(), Some("primary:Roms/a.gb"));
    assert_eq!(id.tree_document_id(), None);
    assert!(!id.is_tree());
}

#[test]
fn test_parse_tree_root() {
    let id =
        ResourceIdentifier::parse("content://com.android.externalstorage.documents/tree/primary%3ARoms")
            .unwrap();

    assert_eq!(id.kind(), IdentifierKind::Tree);
    assert_eq!(id.tree_document_id(), Some("primary:Roms"));
    // A tree root names its own document
    assert_eq!(id.document_id(), Some("primary:Roms"));
    assert!(id.is_tree());
}

#[test]
fn test_parse_tree_document() {
    let id = ResourceIdentifier::parse(
        "content://com.android.externalstorage.documents/tree/primary%3ARoms/document/primary%3ARoms%2Fgbc",
    )
    .unwrap();

    assert_eq!(id.kind(), IdentifierKind::TreeDocument);
    assert_eq!(id.tree_document_id(), Some("primary:Roms"));
    assert_eq!(id.document_id(), Some("primary:Roms/gbc"));
}

#[test]
fn test_parse_keeps_raw_string_verbatim() {
    let raw = "content://com.android.providers.downloads.documents/document/msf%3A1000000034";
    let id = ResourceIdentifier::parse(raw).unwrap();
    assert_eq!(id.as_str(), raw);
    assert_eq!(id.to_string(), raw);
}

#[test]
fn test_parse_other_uris_as_opaque() {
    let media = ResourceIdentifier::parse("content://media/external/images/media/31").unwrap();
    assert_eq!(media.kind(), IdentifierKind::Opaque);

    let file = ResourceIdentifier::parse("file:///sdcard/Roms/a.gb").unwrap();
    assert_eq!(file.kind(), IdentifierKind::Opaque);
    assert_eq!(file.authority(), None);
}

#[test]
fn test_parse_rejects_empty_and_relative() {
    assert!(matches!(
        ResourceIdentifier::parse(""),
        Err(StorageError::InvalidArgument { .. })
    ));
    assert!(matches!(
        ResourceIdentifier::parse("   "),
        Err(StorageError::InvalidArgument { .. })
    ));
    assert!(matches!(
        ResourceIdentifier::parse("Roms/a.gb"),
        Err(StorageError::InvalidArgument { .. })
    ));
}

#[test]
fn test_built_identifiers_parse_back_to_same_parts() {
    let tree = ResourceIdentifier::tree(AUTHORITY, "primary:My Roms");
    assert_eq!(
        tree.as_str(),
        "content://com.android.externalstorage.documents/tree/primary%3AMy%20Roms"
    );

    let reparsed = ResourceIdentifier::parse(tree.as_str()).unwrap();
    assert_eq!(reparsed, tree);

    let doc = ResourceIdentifier::document(AUTHORITY, "primary:a (1).gb");
    let reparsed = ResourceIdentifier::parse(doc.as_str()).unwrap();
    assert_eq!(reparsed.document_id(), Some("primary:a (1).gb"));
}

#[test]
fn test_children_query_of_tree_root() {
    let tree = ResourceIdentifier::tree(AUTHORITY, "primary:Roms");
    let children = tree.children_query().unwrap();

    assert_eq!(
        children.as_str(),
        "content://com.android.externalstorage.documents/tree/primary%3ARoms/document/primary%3ARoms/children"
    );
}

#[test]
fn test_children_query_of_nested_directory() {
    let tree = ResourceIdentifier::tree(AUTHORITY, "primary:Roms");
    let nested = tree.child("primary:Roms/gbc").unwrap();
    let children = nested.children_query().unwrap();

    assert!(children
        .as_str()
        .ends_with("/document/primary%3ARoms%2Fgbc/children"));
    assert_eq!(children.tree_document_id(), Some("primary:Roms"));
}

#[test]
fn test_children_query_rejects_single_document() {
    let doc = ResourceIdentifier::document(AUTHORITY, "primary:a.gb");
    assert!(matches!(
        doc.children_query(),
        Err(StorageError::InvalidArgument { .. })
    ));
    assert!(doc.child("x").is_err());
}

#[test]
fn test_child_stays_in_tree() {
    let tree = ResourceIdentifier::tree(AUTHORITY, "primary:Roms");
    let child = tree.child("primary:Roms/a.gb").unwrap();

    assert_eq!(child.kind(), IdentifierKind::TreeDocument);
    assert_eq!(child.tree_document_id(), Some("primary:Roms"));
    assert_eq!(child.document_id(), Some("primary:Roms/a.gb"));
}

#[test]
fn test_tree_grant_covers_descendants_only() {
    let tree = ResourceIdentifier::tree(AUTHORITY, "primary:Roms");
    let inside = tree.child("primary:Roms/a.gb").unwrap();
    let other_tree = ResourceIdentifier::tree(AUTHORITY, "primary:Music");
    let outside = other_tree.child("primary:Music/a.mp3").unwrap();

    assert!(tree.covers(&tree));
    assert!(tree.covers(&inside));
    assert!(!tree.covers(&outside));
    assert!(!inside.covers(&tree));
}

#[test]
fn test_serde_as_plain_string() {
    let id = ResourceIdentifier::tree(AUTHORITY, "primary:Roms");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(
        json,
        "\"content://com.android.externalstorage.documents/tree/primary%3ARoms\""
    );

    let back: ResourceIdentifier = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);

    assert!(serde_json::from_str::<ResourceIdentifier>("\"\"").is_err());
}
