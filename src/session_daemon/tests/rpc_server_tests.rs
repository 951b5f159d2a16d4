use super::*;
use crate::emulator::node::{NodeOptions, NodeType};
use crate::emulator::test_support::FakeCollaborators;

#[tokio::test]
async fn test_lookup_helpers_report_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let config = DaemonConfig {
        workspace_root: dir.path().to_path_buf(),
        ..DaemonConfig::default()
    };
    let registry = build_registry(&config, fakes.collaborators());

    assert_eq!(
        find_session(&registry, 9).await.err(),
        Some(ApiError::SessionNotFound { session_id: 9 })
    );

    let session = registry.create().await;
    let session_id = session.id();
    let mut inner = session.lock().await;
    inner
        .add_node(NodeType::Default, Some(1), NodeOptions::default())
        .unwrap();

    assert!(require_node(&inner, 1).is_ok());
    assert_eq!(
        require_node(&inner, 2).err(),
        Some(ApiError::NodeNotFound {
            session_id,
            node_id: 2
        })
    );
}
