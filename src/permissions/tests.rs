// src/permissions/tests.rs

use super::*;
use crate::host::memory::MemoryProvider;
use crate::host::ContentHost;
use crate::identifier::ResourceIdentifier;
use std::sync::Arc;

const AUTHORITY: &str = "com.example.documents";

fn setup(persist: bool) -> (Arc<MemoryProvider>, PermissionStore) {
    let provider = Arc::new(MemoryProvider::new(AUTHORITY));
    provider.add_directory(None, "root", "Root");
    provider.add_file(Some("root"), "root/game.gb", "game.gb", b"rom".to_vec());
    let store = PermissionStore::new(provider.clone(), persist);
    (provider, store)
}

#[test]
fn test_flags_bit_operations() {
    let rw = GrantFlags::READ | GrantFlags::WRITE;

    assert_eq!(rw.bits(), 0x3);
    assert!(rw.contains(GrantFlags::READ));
    assert!(!GrantFlags::READ.contains(rw));
    assert_eq!(rw & GrantFlags::WRITE, GrantFlags::WRITE);
    assert!(GrantFlags::empty().is_empty());
    assert!(GrantFlags::READ.can_read());
    assert!(!GrantFlags::READ.can_write());

    // Unknown host bits are dropped
    assert_eq!(GrantFlags::from_bits_truncate(0x41), GrantFlags::READ);
}

#[test]
fn test_grant_serializes_camel_case() {
    let grant = Grant {
        identifier: ResourceIdentifier::tree(AUTHORITY, "root"),
        flags: GrantFlags::READ,
        persisted: true,
    };

    let json = serde_json::to_value(&grant).unwrap();
    assert_eq!(json["flags"], 1);
    assert_eq!(json["persisted"], true);
    assert_eq!(json["identifier"], grant.identifier.as_str());
}

#[test]
fn test_record_pick_intersects_and_persists() {
    let (provider, store) = setup(true);
    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::READ | GrantFlags::WRITE);

    let grant = store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ | GrantFlags::WRITE);

    assert_eq!(grant.flags, GrantFlags::READ);
    assert!(grant.persisted);

    let persisted = store.persisted_grants().unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].flags, GrantFlags::READ);
}

#[test]
fn test_record_pick_with_nothing_granted() {
    let (provider, store) = setup(true);
    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::WRITE);

    let grant = store.record_pick(&tree, GrantFlags::READ, GrantFlags::WRITE);

    assert!(grant.flags.is_empty());
    assert!(!grant.persisted);
    assert!(store.persisted_grants().unwrap().is_empty());
}

#[test]
fn test_persist_refusal_is_not_an_error() {
    let (provider, store) = setup(true);
    provider.set_refuse_persistence(true);
    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::READ);

    let grant = store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ);

    assert!(!grant.persisted);
    assert_eq!(store.session_grant(&tree), Some(grant));
}

#[test]
fn test_persistence_disabled_skips_host() {
    let (provider, store) = setup(false);
    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::READ);

    let grant = store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ);

    assert!(!grant.persisted);
    assert!(provider.persisted_permissions().unwrap().is_empty());
}

#[test]
fn test_session_grant_covers_tree_children() {
    let (provider, store) = setup(true);
    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::READ);
    store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ);

    let child = tree.child("root/game.gb").unwrap();
    assert_eq!(store.session_grant(&child).map(|g| g.identifier), Some(tree));

    let elsewhere = provider.document("root/game.gb");
    assert!(store.session_grant(&elsewhere).is_none());
}

#[test]
fn test_release_gives_grant_back() {
    let (provider, store) = setup(true);
    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::READ);
    store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ);

    assert!(store.release(&tree));
    assert!(store.session_grant(&tree).is_none());
    assert!(store.persisted_grants().unwrap().is_empty());
    assert!(!store.release(&tree));
}

#[test]
fn test_refresh_reports_revoked_grants() {
    let (provider, store) = setup(true);
    let tree = provider.tree("root");
    let file = provider.document("root/game.gb");
    provider.user_selects(&tree, GrantFlags::READ);
    provider.user_selects(&file, GrantFlags::READ);
    store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ);
    store.record_pick(&file, GrantFlags::READ, GrantFlags::READ);

    assert!(store.refresh().is_empty());

    provider.revoke(&tree);
    assert_eq!(store.refresh(), vec![tree.clone()]);
    assert_eq!(store.session_grant(&tree).map(|g| g.persisted), Some(false));
    assert_eq!(store.session_grant(&file).map(|g| g.persisted), Some(true));

    // Already reported
    assert!(store.refresh().is_empty());
}

#[test]
fn test_poisoned_session_table_keeps_recording() {
    let (provider, store) = setup(true);
    let store = Arc::new(store);

    let holder = Arc::clone(&store);
    let _ = std::thread::spawn(move || {
        let _session = holder.session.lock().unwrap();
        panic!("panicked while holding the session table");
    })
    .join();
    assert!(store.session.is_poisoned());

    let tree = provider.tree("root");
    provider.user_selects(&tree, GrantFlags::READ);
    store.record_pick(&tree, GrantFlags::READ, GrantFlags::READ);

    assert_eq!(store.session_grant(&tree).map(|g| g.persisted), Some(true));
    provider.revoke(&tree);
    assert_eq!(store.refresh(), vec![tree.clone()]);

    // Nothing left on the host side, but the session entry still goes away
    assert!(!store.release(&tree));
    assert!(store.session_grant(&tree).is_none());
}
