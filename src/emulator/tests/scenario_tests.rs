use super::*;
use crate::emulator::events::EventKind;
use crate::emulator::lifecycle::SessionState;
use crate::emulator::link::{LinkKey, LinkOptions, LinkType};
use crate::emulator::models::NS2_SCRIPT;
use crate::emulator::node::{NodeOptions, NodeType};
use crate::emulator::test_support::{test_session, FakeCollaborators};

#[tokio::test]
async fn test_export_import_reproduces_counts() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let source = test_session(dir.path(), &fakes);
    let encoded = {
        let mut inner = source.lock().await;
        for id in 1..=3 {
            inner.add_node(NodeType::Default, Some(id), NodeOptions::default()).unwrap();
        }
        inner.add_link(1, 2, None, None, LinkType::Wired, LinkOptions::default()).unwrap();
        inner.add_link(2, 3, None, None, LinkType::Wired, LinkOptions::default()).unwrap();
        inner
            .mobility_mut()
            .set_model_config(3, NS2_SCRIPT, ModelValues::new())
            .unwrap();
        inner.add_hook(Hook {
            state: SessionState::Runtime,
            file: "hook.sh".to_string(),
            data: "true".to_string(),
        });
        JsonScenarioCodec.encode(&inner.export_scenario()).unwrap()
    };

    let target_dir = tempfile::tempdir().unwrap();
    let target = test_session(target_dir.path(), &fakes);
    let mut nodes = target.hub().subscribe(EventKind::Node);
    let mut inner = target.lock().await;
    let document = JsonScenarioCodec.decode(&encoded).unwrap();
    inner.import_scenario(document).unwrap();

    assert_eq!(inner.topology().node_count(), 3);
    assert_eq!(inner.topology().link_count(), 2);
    assert!(inner.mobility().has_config(3, NS2_SCRIPT));
    assert_eq!(inner.hooks().count(), 1);
    assert_eq!(std::iter::from_fn(|| nodes.try_recv()).count(), 3);
}

#[test]
fn test_decode_rejects_garbage_and_unknown_versions() {
    assert!(JsonScenarioCodec.decode("not json").is_err());

    let document = ScenarioDocument {
        version: 99,
        location: Location::default(),
        nodes: Vec::new(),
        links: Vec::new(),
        hooks: Vec::new(),
        options: ModelValues::new(),
        metadata: BTreeMap::new(),
        mobility: Vec::new(),
        emane: Vec::new(),
        emane_config: ModelValues::new(),
        service_defaults: BTreeMap::new(),
        custom_services: Vec::new(),
    };
    let encoded = serde_json::to_string(&document).unwrap();
    let err = JsonScenarioCodec.decode(&encoded).unwrap_err();
    assert!(err.to_string().contains("unsupported scenario version 99"));
}

#[tokio::test]
async fn test_inconsistent_document_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let session = test_session(dir.path(), &fakes);
    let mut inner = session.lock().await;
    inner.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();

    let mut document = inner.export_scenario();
    document.links.push(Link {
        node_one: 1,
        node_two: 5,
        iface_one: None,
        iface_two: None,
        link_type: LinkType::Wired,
        options: LinkOptions::default(),
    });

    assert!(inner.import_scenario(document).is_err());
    assert_eq!(inner.topology().node_count(), 1);
    assert_eq!(inner.topology().link_count(), 0);
}

#[tokio::test]
async fn test_configs_for_missing_nodes_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let session = test_session(dir.path(), &fakes);
    let mut inner = session.lock().await;
    inner.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();

    let mut document = inner.export_scenario();
    document.mobility.push(NodeModelConfig {
        node_id: 99,
        model: NS2_SCRIPT.to_string(),
        values: ModelValues::new(),
    });

    let err = inner.import_scenario(document).unwrap_err();
    assert!(err.to_string().contains("unknown node 99"));
    assert!(!inner.mobility().has_config(99, NS2_SCRIPT));
}

#[tokio::test]
async fn test_links_added_after_import_get_fresh_macs() {
    let dir = tempfile::tempdir().unwrap();
    let fakes = FakeCollaborators::default();
    let source = test_session(dir.path(), &fakes);
    let document = {
        let mut inner = source.lock().await;
        for id in 1..=3 {
            inner.add_node(NodeType::Default, Some(id), NodeOptions::default()).unwrap();
        }
        inner.add_link(1, 2, None, None, LinkType::Wired, LinkOptions::default()).unwrap();
        inner.add_link(1, 3, None, None, LinkType::Wired, LinkOptions::default()).unwrap();
        assert!(inner.delete_link(&LinkKey::new(1, None, 2, None)));
        inner.export_scenario()
    };

    let target_dir = tempfile::tempdir().unwrap();
    let target = test_session(target_dir.path(), &fakes);
    let mut inner = target.lock().await;
    inner.import_scenario(document).unwrap();
    inner.add_link(2, 3, None, None, LinkType::Wired, LinkOptions::default()).unwrap();

    let mut macs: Vec<String> = inner
        .topology()
        .nodes()
        .flat_map(|node| node.interfaces.values())
        .filter_map(|iface| iface.mac.clone())
        .collect();
    macs.sort();
    macs.dedup();
    assert_eq!(macs.len(), 4);
}
