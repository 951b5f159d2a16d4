use super::*;
use crate::emulator::lifecycle::SessionState;
use crate::emulator::test_support::FakeCollaborators;

fn registry(root: &std::path::Path, fakes: &FakeCollaborators) -> SessionRegistry {
    SessionRegistry::new(SessionFactory {
        workspace_root: root.to_path_buf(),
        preserve_workspaces: false,
        default_location: Location::default(),
        collaborators: fakes.collaborators(),
    })
}

#[tokio::test]
async fn test_create_starts_in_definition_with_default_location() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let registry = registry(dir.path(), &fakes);

    let session = registry.create().await;
    let inner = session.lock().await;

    assert_eq!(session.id(), 1);
    assert_eq!(inner.state(), SessionState::Definition);
    assert_eq!(inner.location(), Location::default());
    assert_eq!(inner.workspace(), dir.path().join("netemu-session-1"));
}

#[tokio::test]
async fn test_ids_are_unique_and_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let registry = registry(dir.path(), &fakes);

    let first = registry.create().await.id();
    assert!(registry.delete(first).await);
    let second = registry.create().await.id();

    assert_ne!(first, second);
    assert!(registry.get(first).await.is_none());
    assert!(registry.get(second).await.is_some());
}

#[tokio::test]
async fn test_delete_is_idempotent_and_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let registry = registry(dir.path(), &fakes);
    let id = registry.create().await.id();

    assert!(registry.delete(id).await);
    assert!(!registry.delete(id).await);
    assert_eq!(fakes.emulator.shutdown_count(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let registry = Arc::new(registry(dir.path(), &fakes));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move { registry.create().await.id() }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 16);
    assert_eq!(registry.list().await.len(), 16);
}

#[tokio::test]
async fn test_shutdown_all_empties_registry() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let registry = registry(dir.path(), &fakes);
    registry.create().await;
    registry.create().await;

    registry.shutdown_all().await;

    assert!(registry.list().await.is_empty());
    assert_eq!(fakes.emulator.shutdown_count(), 2);
}
