use super::*;
use proptest::prelude::*;

fn named(name: &str) -> NodeOptions {
    NodeOptions {
        name: Some(name.to_string()),
        position: Some(Position {
            x: 10.0,
            y: 20.0,
            z: 0.0,
        }),
        ..NodeOptions::default()
    }
}

fn wired(topology: &mut Topology, one: NodeId, two: NodeId) -> Link {
    topology
        .add_link(one, two, None, None, LinkType::Wired, LinkOptions::default())
        .unwrap()
        .clone()
}

#[test]
fn test_add_node_then_get_returns_same_fields() {
    let mut topology = Topology::new();
    let id = topology
        .add_node(NodeType::Default, Some(1), named("n1"))
        .unwrap()
        .id;

    let node = topology.node(id).unwrap();
    assert_eq!(node.id, 1);
    assert_eq!(node.name, "n1");
    assert_eq!(node.position.x, 10.0);
    assert_eq!(node.position.y, 20.0);
}

#[test]
fn test_node_ids_fill_smallest_gap() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();
    topology.add_node(NodeType::Default, Some(3), NodeOptions::default()).unwrap();

    let node = topology.add_node(NodeType::Switch, None, NodeOptions::default()).unwrap();
    assert_eq!(node.id, 2);
    assert_eq!(node.name, "switch2");
}

#[test]
fn test_duplicate_node_id_is_rejected() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();
    let err = topology
        .add_node(NodeType::Default, Some(1), NodeOptions::default())
        .unwrap_err();
    assert_eq!(err, TopologyError::DuplicateNode(1));
}

#[test]
fn test_update_node_only_moves() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), named("n1")).unwrap();

    let geo = GeoPosition {
        lat: 1.0,
        lon: 2.0,
        alt: 3.0,
    };
    let moved = topology
        .update_node(1, Some(Position { x: 5.0, y: 6.0, z: 0.0 }), Some(geo))
        .unwrap();
    assert_eq!(moved.position.x, 5.0);
    assert_eq!(moved.geo, Some(geo));
    assert_eq!(moved.name, "n1");

    assert!(topology.update_node(9, None, None).is_none());
}

#[test]
fn test_point_to_point_link_creates_interfaces_on_both_hosts() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();
    topology.add_node(NodeType::Default, Some(2), NodeOptions::default()).unwrap();

    let link = wired(&mut topology, 1, 2);

    assert_eq!(link.iface_one, Some(0));
    assert_eq!(link.iface_two, Some(0));
    let iface = topology.interface(1, 0).unwrap();
    assert_eq!(iface.name, "eth0");
    assert_eq!(iface.mtu, DEFAULT_MTU);
    assert_eq!(iface.mac.as_deref(), Some("00:00:00:aa:00:01"));
    assert_eq!(iface.net_id, None);
    assert_eq!(
        topology.interface(2, 0).unwrap().mac.as_deref(),
        Some("00:00:00:aa:00:02")
    );
}

#[test]
fn test_link_to_switch_has_no_switch_interface() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();
    topology.add_node(NodeType::Switch, Some(2), NodeOptions::default()).unwrap();

    let data = InterfaceData {
        id: Some(4),
        ip4: Some("10.0.0.1".to_string()),
        ip4_mask: 24,
        ..InterfaceData::default()
    };
    let link = topology
        .add_link(1, 2, Some(data), None, LinkType::Wired, LinkOptions::default())
        .unwrap()
        .clone();

    assert_eq!(link.iface_one, Some(4));
    assert_eq!(link.iface_two, None);
    let iface = topology.interface(1, 4).unwrap();
    assert_eq!(iface.ip4.as_deref(), Some("10.0.0.1"));
    assert_eq!(iface.net_id, Some(2));
    assert!(topology.node(2).unwrap().interfaces.is_empty());
}

#[test]
fn test_add_link_rejects_bad_input() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();
    topology.add_node(NodeType::Default, Some(2), NodeOptions::default()).unwrap();

    let self_link = topology.add_link(1, 1, None, None, LinkType::Wired, LinkOptions::default());
    assert_eq!(self_link.unwrap_err(), TopologyError::SelfLink(1));

    let missing = topology.add_link(1, 7, None, None, LinkType::Wired, LinkOptions::default());
    assert_eq!(missing.unwrap_err(), TopologyError::UnknownNode(7));

    let bad_ip = InterfaceData {
        ip4: Some("10.0.0.300".to_string()),
        ..InterfaceData::default()
    };
    let invalid = topology.add_link(
        1,
        2,
        Some(bad_ip),
        None,
        LinkType::Wired,
        LinkOptions::default(),
    );
    assert!(matches!(invalid, Err(TopologyError::InvalidAddress(_))));
    assert_eq!(topology.link_count(), 0);
    assert!(topology.node(1).unwrap().interfaces.is_empty());
}

#[test]
fn test_update_and_delete_link_in_reverse_order() {
    let mut topology = Topology::new();
    topology.add_node(NodeType::Default, Some(1), NodeOptions::default()).unwrap();
    topology.add_node(NodeType::Default, Some(2), NodeOptions::default()).unwrap();
    wired(&mut topology, 1, 2);

    let options = LinkOptions {
        delay: Some(250),
        ..LinkOptions::default()
    };
    let reversed = LinkKey::new(2, Some(0), 1, Some(0));
    assert_eq!(
        topology.update_link(&reversed, &options).unwrap().options.delay,
        Some(250)
    );

    let wildcard = LinkKey::new(2, None, 1, None);
    let removed = topology.delete_link(&wildcard).unwrap();
    assert_eq!((removed.node_one, removed.node_two), (1, 2));
    assert_eq!(topology.link_count(), 0);
    assert!(topology.node(1).unwrap().interfaces.is_empty());
    assert!(topology.delete_link(&wildcard).is_none());
}

#[test]
fn test_delete_node_cascades_to_links_and_peer_interfaces() {
    let mut topology = Topology::new();
    for id in 1..=3 {
        topology.add_node(NodeType::Default, Some(id), NodeOptions::default()).unwrap();
    }
    wired(&mut topology, 1, 2);
    wired(&mut topology, 2, 3);

    let (node, removed) = topology.delete_node(1).unwrap();
    assert_eq!(node.id, 1);
    assert_eq!(removed.len(), 1);
    assert_eq!(topology.link_count(), 1);
    assert_eq!(topology.node(2).unwrap().interfaces.len(), 1);
    assert!(topology.delete_node(1).is_none());
}

#[test]
fn test_from_parts_rejects_dangling_link() {
    let node = Node::new(1, NodeType::Default, NodeOptions::default());
    let link = Link {
        node_one: 1,
        node_two: 2,
        iface_one: None,
        iface_two: None,
        link_type: LinkType::Wired,
        options: LinkOptions::default(),
    };
    let err = Topology::from_parts(vec![node], vec![link]).unwrap_err();
    assert_eq!(err, TopologyError::UnknownNode(2));
}

#[test]
fn test_rebuilt_graph_never_reuses_macs() {
    let mut topology = Topology::new();
    for id in 1..=3 {
        topology.add_node(NodeType::Default, Some(id), NodeOptions::default()).unwrap();
    }
    wired(&mut topology, 1, 2);
    wired(&mut topology, 1, 3);
    topology.delete_link(&LinkKey::new(1, None, 2, None)).unwrap();

    let nodes: Vec<Node> = topology.nodes().cloned().collect();
    let mut rebuilt = Topology::from_parts(nodes, topology.links().to_vec()).unwrap();
    wired(&mut rebuilt, 2, 3);

    let mut macs: Vec<String> = rebuilt
        .nodes()
        .flat_map(|node| node.interfaces.values())
        .filter_map(|iface| iface.mac.clone())
        .collect();
    assert_eq!(macs.len(), 4);
    macs.sort();
    macs.dedup();
    assert_eq!(macs.len(), 4);
}

proptest! {
    #[test]
    fn prop_link_found_from_either_endpoint(one in 1u32..50, two in 1u32..50, reverse in any::<bool>()) {
        prop_assume!(one != two);
        let mut topology = Topology::new();
        topology.add_node(NodeType::Default, Some(one), NodeOptions::default()).unwrap();
        topology.add_node(NodeType::Default, Some(two), NodeOptions::default()).unwrap();
        wired(&mut topology, one, two);

        for endpoint in [one, two] {
            let links: Vec<&Link> = topology.node_links(endpoint).collect();
            prop_assert_eq!(links.len(), 1);
            let mut pair = [links[0].node_one, links[0].node_two];
            pair.sort_unstable();
            let mut expected = [one, two];
            expected.sort_unstable();
            prop_assert_eq!(pair, expected);
        }

        let key = if reverse {
            LinkKey::new(two, None, one, None)
        } else {
            LinkKey::new(one, None, two, None)
        };
        prop_assert!(topology.delete_link(&key).is_some());
    }
}
