// src/metadata/tests.rs

use super::*;
use crate::host::memory::MemoryProvider;
use crate::permissions::GrantFlags;

fn provider() -> Arc<MemoryProvider> {
    let provider = Arc::new(MemoryProvider::new("com.android.externalstorage.documents"));
    provider.add_directory(None, "primary:Roms", "Roms");
    provider.add_file(Some("primary:Roms"), "primary:Roms/a.gb", "Tetris (World).gb", vec![0]);
    provider.user_selects(&provider.tree("primary:Roms"), GrantFlags::READ);
    provider
}

#[test]
fn test_resolves_display_name() {
    let provider = provider();
    let resolver = MetadataResolver::new(provider.clone());
    let id = provider.tree("primary:Roms").child("primary:Roms/a.gb").unwrap();

    assert_eq!(
        resolver.display_name(&id).unwrap().as_deref(),
        Some("Tetris (World).gb")
    );
    assert_eq!(provider.open_handles(), 0);
}

#[test]
fn test_tree_root_name() {
    let provider = provider();
    let resolver = MetadataResolver::new(provider.clone());

    assert_eq!(
        resolver
            .display_name(&provider.tree("primary:Roms"))
            .unwrap()
            .as_deref(),
        Some("Roms")
    );
}

#[test]
fn test_missing_column_is_absent_not_error() {
    let provider = provider();
    provider.set_omit_display_name(true);
    let resolver = MetadataResolver::new(provider.clone());
    let id = provider.tree("primary:Roms").child("primary:Roms/a.gb").unwrap();

    assert_eq!(resolver.display_name(&id).unwrap(), None);
    assert_eq!(provider.open_handles(), 0);
}

#[test]
fn test_no_row_is_absent() {
    let provider = provider();
    let resolver = MetadataResolver::new(provider.clone());
    let id = provider
        .tree("primary:Roms")
        .child("primary:Roms/missing.gb")
        .unwrap();

    assert_eq!(resolver.display_name(&id).unwrap(), None);
    assert_eq!(provider.open_handles(), 0);
}

#[test]
fn test_null_or_empty_name_is_absent() {
    let provider = provider();
    provider.add_document(Some("primary:Roms"), "primary:Roms/n", None, Some("text/plain"), vec![]);
    provider.add_document(Some("primary:Roms"), "primary:Roms/e", Some(""), Some("text/plain"), vec![]);
    let resolver = MetadataResolver::new(provider.clone());
    let tree = provider.tree("primary:Roms");

    assert_eq!(resolver.display_name(&tree.child("primary:Roms/n").unwrap()).unwrap(), None);
    assert_eq!(resolver.display_name(&tree.child("primary:Roms/e").unwrap()).unwrap(), None);
}

#[test]
fn test_query_fault_is_reported() {
    let provider = provider();
    provider.set_fail_queries(true);
    let resolver = MetadataResolver::new(provider.clone());

    let result = resolver.display_name(&provider.tree("primary:Roms"));
    assert!(matches!(result, Err(StorageError::ProviderQuery { .. })));
}

#[test]
fn test_ungranted_identifier_is_not_found() {
    let provider = provider();
    provider.add_file(None, "secret", "secret.txt", vec![]);
    let resolver = MetadataResolver::new(provider.clone());

    let result = resolver.display_name(&provider.document("secret"));
    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}
