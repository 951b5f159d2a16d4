//! Nodes and the interfaces they own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NodeId = u32;
pub type InterfaceId = u32;

/// Closed set of node kinds, with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Default,
    Physical,
    Switch,
    Hub,
    Wlan,
    Rj45,
    Tunnel,
    Ktunnel,
    Emane,
    TapBridge,
    PeerToPeer,
    ControlNet,
    EmaneNet,
}

impl NodeType {
    pub const ALL: [NodeType; 13] = [
        NodeType::Default,
        NodeType::Physical,
        NodeType::Switch,
        NodeType::Hub,
        NodeType::Wlan,
        NodeType::Rj45,
        NodeType::Tunnel,
        NodeType::Ktunnel,
        NodeType::Emane,
        NodeType::TapBridge,
        NodeType::PeerToPeer,
        NodeType::ControlNet,
        NodeType::EmaneNet,
    ];

    pub fn code(self) -> u32 {
        match self {
            NodeType::Default => 0,
            NodeType::Physical => 1,
            NodeType::Switch => 4,
            NodeType::Hub => 5,
            NodeType::Wlan => 6,
            NodeType::Rj45 => 7,
            NodeType::Tunnel => 8,
            NodeType::Ktunnel => 9,
            NodeType::Emane => 10,
            NodeType::TapBridge => 11,
            NodeType::PeerToPeer => 12,
            NodeType::ControlNet => 13,
            NodeType::EmaneNet => 14,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Broadcast networks join other nodes' interfaces instead of owning
    /// interfaces of their own.
    pub fn is_network(self) -> bool {
        match self {
            NodeType::Switch
            | NodeType::Hub
            | NodeType::Wlan
            | NodeType::Emane
            | NodeType::EmaneNet
            | NodeType::TapBridge
            | NodeType::PeerToPeer
            | NodeType::ControlNet
            | NodeType::Tunnel
            | NodeType::Ktunnel => true,
            NodeType::Default | NodeType::Physical | NodeType::Rj45 => false,
        }
    }

    pub fn is_wireless(self) -> bool {
        matches!(self, NodeType::Wlan | NodeType::Emane)
    }

    /// Prefix used for generated node names.
    pub fn name_prefix(self) -> &'static str {
        match self {
            NodeType::Default => "n",
            NodeType::Physical => "phys",
            NodeType::Switch => "switch",
            NodeType::Hub => "hub",
            NodeType::Wlan => "wlan",
            NodeType::Rj45 => "rj45",
            NodeType::Tunnel => "tunnel",
            NodeType::Ktunnel => "ktunnel",
            NodeType::Emane => "emane",
            NodeType::TapBridge => "tap",
            NodeType::PeerToPeer => "ptp",
            NodeType::ControlNet => "ctrlnet",
            NodeType::EmaneNet => "emanenet",
        }
    }
}

/// Canvas position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Geographic position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
}

/// Caller-supplied attributes for a new node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOptions {
    pub name: Option<String>,
    pub model: Option<String>,
    pub icon: Option<String>,
    pub opaque: Option<String>,
    pub services: Vec<String>,
    pub position: Option<Position>,
    pub geo: Option<GeoPosition>,
    pub radio_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub model: Option<String>,
    pub icon: Option<String>,
    pub opaque: Option<String>,
    pub services: Vec<String>,
    pub position: Position,
    pub geo: Option<GeoPosition>,
    pub radio_model: Option<String>,
    pub interfaces: BTreeMap<InterfaceId, Interface>,
}

impl Node {
    pub fn new(id: NodeId, node_type: NodeType, options: NodeOptions) -> Self {
        let name = options
            .name
            .unwrap_or_else(|| format!("{}{}", node_type.name_prefix(), id));
        Self {
            id,
            name,
            node_type,
            model: options.model,
            icon: options.icon,
            opaque: options.opaque,
            services: options.services,
            position: options.position.unwrap_or_default(),
            geo: options.geo,
            radio_model: options.radio_model,
            interfaces: BTreeMap::new(),
        }
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.get(&id)
    }

    pub fn next_interface_id(&self) -> InterfaceId {
        (0..)
            .find(|id| !self.interfaces.contains_key(id))
            .unwrap_or_default()
    }
}

/// Attachment point owned by exactly one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub node_id: NodeId,
    pub name: String,
    pub mac: Option<String>,
    pub ip4: Option<String>,
    pub ip4_mask: u32,
    pub ip6: Option<String>,
    pub ip6_mask: u32,
    pub mtu: u32,
    pub flow_id: Option<u32>,
    /// Broadcast network this interface is joined to, if any.
    pub net_id: Option<NodeId>,
}

pub const DEFAULT_MTU: u32 = 1500;

/// Caller-supplied attributes for an interface created by a link.
/// Empty strings have already been normalised to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceData {
    pub id: Option<InterfaceId>,
    pub name: Option<String>,
    pub mac: Option<String>,
    pub ip4: Option<String>,
    pub ip4_mask: u32,
    pub ip6: Option<String>,
    pub ip6_mask: u32,
}
