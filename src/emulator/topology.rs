//! The node/interface/link graph of one session.
//!
//! The graph validates references and owns id allocation; it publishes
//! nothing itself. Callers hold the session lock and turn the returned
//! values into events.

use crate::emulator::link::{Link, LinkKey, LinkOptions, LinkType};
use crate::emulator::node::{
    GeoPosition, Interface, InterfaceData, InterfaceId, Node, NodeId, NodeOptions, NodeType,
    Position, DEFAULT_MTU,
};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

const MAC_PREFIX: &str = "00:00:00:aa:";

/// Serial number of a MAC handed out by `allocate_mac`.
fn allocated_serial(mac: &str) -> Option<u32> {
    let (high, low) = mac.strip_prefix(MAC_PREFIX)?.split_once(':')?;
    let high = u32::from_str_radix(high, 16).ok()?;
    let low = u32::from_str_radix(low, 16).ok()?;
    Some((high << 8) | low)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    UnknownNode(NodeId),
    DuplicateNode(NodeId),
    SelfLink(NodeId),
    InvalidAddress(String),
    UnknownInterface { node: NodeId, iface: InterfaceId },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::UnknownNode(id) => write!(f, "node {} does not exist", id),
            TopologyError::DuplicateNode(id) => write!(f, "node {} already exists", id),
            TopologyError::SelfLink(id) => write!(f, "node {} cannot link to itself", id),
            TopologyError::InvalidAddress(addr) => write!(f, "invalid address: {}", addr),
            TopologyError::UnknownInterface { node, iface } => {
                write!(f, "node {} has no interface {}", node, iface)
            }
        }
    }
}

impl std::error::Error for TopologyError {}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    links: Vec<Link>,
    mac_counter: u32,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a graph from stored parts, checking that every link
    /// references existing nodes and interfaces.
    pub fn from_parts(nodes: Vec<Node>, links: Vec<Link>) -> Result<Self, TopologyError> {
        let mut topology = Topology::new();
        for node in nodes {
            if topology.nodes.contains_key(&node.id) {
                return Err(TopologyError::DuplicateNode(node.id));
            }
            let highest = node
                .interfaces
                .values()
                .filter_map(|iface| iface.mac.as_deref().and_then(allocated_serial))
                .max()
                .unwrap_or_default();
            topology.mac_counter = topology.mac_counter.max(highest);
            topology.nodes.insert(node.id, node);
        }
        for link in &links {
            topology.check_endpoint(link.node_one, link.iface_one)?;
            topology.check_endpoint(link.node_two, link.iface_two)?;
        }
        topology.links = links;
        Ok(topology)
    }

    fn check_endpoint(
        &self,
        node: NodeId,
        iface: Option<InterfaceId>,
    ) -> Result<(), TopologyError> {
        let owner = self.nodes.get(&node).ok_or(TopologyError::UnknownNode(node))?;
        match iface {
            Some(iface) if owner.interface(iface).is_none() => {
                Err(TopologyError::UnknownInterface { node, iface })
            }
            _ => Ok(()),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node_links(&self, node: NodeId) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |link| link.touches(node))
    }

    pub fn interface(&self, node: NodeId, iface: InterfaceId) -> Option<&Interface> {
        self.nodes.get(&node).and_then(|n| n.interface(iface))
    }

    /// Smallest unused node id, starting at 1.
    pub fn next_node_id(&self) -> NodeId {
        (1..)
            .find(|id| !self.nodes.contains_key(id))
            .unwrap_or_default()
    }

    pub fn add_node(
        &mut self,
        node_type: NodeType,
        id: Option<NodeId>,
        options: NodeOptions,
    ) -> Result<&Node, TopologyError> {
        let id = match id {
            Some(id) if self.nodes.contains_key(&id) => {
                return Err(TopologyError::DuplicateNode(id))
            }
            Some(id) => id,
            None => self.next_node_id(),
        };
        let node = Node::new(id, node_type, options);
        Ok(self.nodes.entry(id).or_insert(node))
    }

    /// Moves a node. Only position fields are touched.
    pub fn update_node(
        &mut self,
        id: NodeId,
        position: Option<Position>,
        geo: Option<GeoPosition>,
    ) -> Option<&Node> {
        let node = self.nodes.get_mut(&id)?;
        if let Some(position) = position {
            node.position = position;
        }
        if geo.is_some() {
            node.geo = geo;
        }
        Some(node)
    }

    /// Removes a node together with every link touching it. Interfaces the
    /// removed links held on surviving nodes are released.
    pub fn delete_node(&mut self, id: NodeId) -> Option<(Node, Vec<Link>)> {
        let node = self.nodes.remove(&id)?;
        let (removed, kept): (Vec<Link>, Vec<Link>) =
            self.links.drain(..).partition(|link| link.touches(id));
        self.links = kept;
        for link in &removed {
            self.release_interfaces(link);
        }
        Some((node, removed))
    }

    pub fn add_link(
        &mut self,
        node_one: NodeId,
        node_two: NodeId,
        iface_one: Option<InterfaceData>,
        iface_two: Option<InterfaceData>,
        link_type: LinkType,
        options: LinkOptions,
    ) -> Result<&Link, TopologyError> {
        if node_one == node_two {
            return Err(TopologyError::SelfLink(node_one));
        }
        let type_one = self.node_type(node_one)?;
        let type_two = self.node_type(node_two)?;
        for data in [&iface_one, &iface_two].into_iter().flatten() {
            validate_addresses(data)?;
        }

        let net_for_one = type_two.is_network().then_some(node_two);
        let net_for_two = type_one.is_network().then_some(node_one);
        let iface_one = self.attach(node_one, type_one, iface_one, net_for_one);
        let iface_two = self.attach(node_two, type_two, iface_two, net_for_two);

        self.links.push(Link {
            node_one,
            node_two,
            iface_one,
            iface_two,
            link_type,
            options,
        });
        Ok(&self.links[self.links.len() - 1])
    }

    /// Applies `options` to the first link selected by `key`.
    pub fn update_link(&mut self, key: &LinkKey, options: &LinkOptions) -> Option<&Link> {
        let link = self.links.iter_mut().find(|link| key.selects(link))?;
        link.options.merge(options);
        Some(link)
    }

    /// Removes the first link selected by `key`.
    pub fn delete_link(&mut self, key: &LinkKey) -> Option<Link> {
        let index = self.links.iter().position(|link| key.selects(link))?;
        let link = self.links.remove(index);
        self.release_interfaces(&link);
        Some(link)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }

    fn node_type(&self, id: NodeId) -> Result<NodeType, TopologyError> {
        self.nodes
            .get(&id)
            .map(|node| node.node_type)
            .ok_or(TopologyError::UnknownNode(id))
    }

    /// Creates or reuses the interface a link uses on `node_id`. Broadcast
    /// networks never get one.
    fn attach(
        &mut self,
        node_id: NodeId,
        node_type: NodeType,
        data: Option<InterfaceData>,
        net_id: Option<NodeId>,
    ) -> Option<InterfaceId> {
        if node_type.is_network() {
            return None;
        }
        let data = data.unwrap_or_default();
        let mac = match data.mac {
            Some(mac) => Some(mac),
            None => Some(self.allocate_mac()),
        };
        let node = self.nodes.get_mut(&node_id)?;
        let id = data.id.unwrap_or_else(|| node.next_interface_id());
        let iface = node.interfaces.entry(id).or_insert_with(|| Interface {
            id,
            node_id,
            name: data.name.unwrap_or_else(|| format!("eth{}", id)),
            mac,
            ip4: data.ip4,
            ip4_mask: data.ip4_mask,
            ip6: data.ip6,
            ip6_mask: data.ip6_mask,
            mtu: DEFAULT_MTU,
            flow_id: None,
            net_id: None,
        });
        iface.net_id = net_id;
        Some(id)
    }

    fn allocate_mac(&mut self) -> String {
        self.mac_counter += 1;
        let counter = self.mac_counter;
        format!("{}{:02x}:{:02x}", MAC_PREFIX, (counter >> 8) & 0xff, counter & 0xff)
    }

    fn release_interfaces(&mut self, link: &Link) {
        let endpoints = [
            (link.node_one, link.iface_one),
            (link.node_two, link.iface_two),
        ];
        for (node_id, iface) in endpoints {
            let Some(iface) = iface else { continue };
            let still_used = self
                .links
                .iter()
                .any(|other| other.uses_interface(node_id, iface));
            if still_used {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.interfaces.remove(&iface);
            }
        }
    }
}

fn validate_addresses(data: &InterfaceData) -> Result<(), TopologyError> {
    if let Some(ip4) = &data.ip4 {
        ip4.parse::<Ipv4Addr>()
            .map_err(|_| TopologyError::InvalidAddress(ip4.clone()))?;
    }
    if let Some(ip6) = &data.ip6 {
        ip6.parse::<Ipv6Addr>()
            .map_err(|_| TopologyError::InvalidAddress(ip6.clone()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/topology_tests.rs"]
mod tests;
