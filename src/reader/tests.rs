// src/reader/tests.rs

use super::*;
use crate::host::memory::MemoryProvider;
use crate::permissions::GrantFlags;

fn provider_with_rom(size: usize) -> (Arc<MemoryProvider>, ResourceIdentifier, Vec<u8>) {
    let provider = Arc::new(MemoryProvider::new("com.android.providers.downloads.documents"));
    let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    provider.add_file(None, "msf:1000", "tetris.gb", content.clone());

    let id = provider.document("msf:1000");
    provider.user_selects(&id, GrantFlags::READ);
    (provider, id, content)
}

#[test]
fn test_reads_entire_content_across_chunks() {
    let (provider, id, content) = provider_with_rom(10_000);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    let bytes = reader.read_all(&id).unwrap();
    assert_eq!(bytes.len(), 10_000);
    assert_eq!(bytes, content);
}

#[test]
fn test_small_chunk_size_reads_same_bytes() {
    let (provider, id, content) = provider_with_rom(1000);
    let reader = ContentReader::new(provider.clone(), 7, None);

    assert_eq!(reader.read_all(&id).unwrap(), content);
}

#[test]
fn test_empty_resource_reads_as_empty_buffer() {
    let (provider, id, _) = provider_with_rom(0);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    assert!(reader.read_all(&id).unwrap().is_empty());
}

#[test]
fn test_ungranted_resource_is_not_found() {
    let (provider, _, _) = provider_with_rom(16);
    provider.add_file(None, "msf:2000", "other.gb", vec![1]);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    let result = reader.read_all(&provider.document("msf:2000"));
    assert!(matches!(result, Err(StorageError::NotFound { .. })));
}

#[test]
fn test_deleted_resource_is_not_found() {
    let (provider, id, _) = provider_with_rom(16);
    provider.remove_document("msf:1000");
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    assert!(reader.read_all(&id).unwrap_err().is_not_found());
}

#[test]
fn test_revoked_grant_is_not_found() {
    let (provider, id, _) = provider_with_rom(16);
    provider.revoke(&id);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    assert!(reader.read_all(&id).unwrap_err().is_not_found());
}

#[test]
fn test_deleted_mid_stream_never_returns_truncated_content() {
    let (provider, id, _) = provider_with_rom(10_000);
    provider.fail_stream_after("msf:1000", 5000);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    let result = reader.read_all(&id);
    assert!(matches!(result, Err(StorageError::NotFound { .. })));
    assert_eq!(provider.open_handles(), 0);
}

#[test]
fn test_read_limit_aborts_without_partial_content() {
    let (provider, id, _) = provider_with_rom(10_000);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, Some(8192));

    match reader.read_all(&id) {
        Err(StorageError::TooLarge { limit, .. }) => assert_eq!(limit, 8192),
        other => panic!("expected TooLarge, got {other:?}"),
    }
    assert_eq!(provider.open_handles(), 0);

    let exact = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, Some(10_000));
    assert_eq!(exact.read_all(&id).unwrap().len(), 10_000);
}

#[test]
fn test_stream_released_after_successful_read() {
    let (provider, id, _) = provider_with_rom(64);
    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);

    reader.read_all(&id).unwrap();
    assert_eq!(provider.open_handles(), 0);
}

#[test]
fn test_directory_cannot_be_read() {
    let provider = Arc::new(MemoryProvider::new("p"));
    provider.add_directory(None, "dir", "dir");
    let tree = provider.tree("dir");
    provider.user_selects(&tree, GrantFlags::READ);

    let reader = ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None);
    assert!(reader.read_all(&tree).unwrap_err().is_not_found());
}

#[test]
fn test_concurrent_reads_are_independent() {
    let (provider, id, content) = provider_with_rom(50_000);
    let reader = Arc::new(ContentReader::new(provider.clone(), DEFAULT_CHUNK_SIZE, None));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reader = Arc::clone(&reader);
            let id = id.clone();
            std::thread::spawn(move || reader.read_all(&id))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), content);
    }
    assert_eq!(provider.open_handles(), 0);
}
