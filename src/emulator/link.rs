//! Links between nodes and their composite lookup key.

use crate::emulator::node::{InterfaceId, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Wireless,
    #[default]
    Wired,
}

impl LinkType {
    pub fn code(self) -> u32 {
        match self {
            LinkType::Wireless => 0,
            LinkType::Wired => 1,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(LinkType::Wireless),
            1 => Some(LinkType::Wired),
            _ => None,
        }
    }
}

/// Traffic shaping and bookkeeping options of a link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkOptions {
    pub delay: Option<u64>,
    pub bandwidth: Option<u64>,
    /// Loss percentage.
    pub per: Option<f64>,
    /// Duplication percentage.
    pub dup: Option<u32>,
    pub jitter: Option<u64>,
    pub mer: Option<u32>,
    pub burst: Option<u32>,
    pub mburst: Option<u32>,
    pub unidirectional: bool,
    pub key: Option<u32>,
    pub opaque: Option<String>,
}

impl LinkOptions {
    /// Overwrites every option set in `other`.
    pub fn merge(&mut self, other: &LinkOptions) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.delay, &other.delay);
        take(&mut self.bandwidth, &other.bandwidth);
        take(&mut self.per, &other.per);
        take(&mut self.dup, &other.dup);
        take(&mut self.jitter, &other.jitter);
        take(&mut self.mer, &other.mer);
        take(&mut self.burst, &other.burst);
        take(&mut self.mburst, &other.mburst);
        take(&mut self.key, &other.key);
        take(&mut self.opaque, &other.opaque);
        self.unidirectional = other.unidirectional;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub node_one: NodeId,
    pub node_two: NodeId,
    pub iface_one: Option<InterfaceId>,
    pub iface_two: Option<InterfaceId>,
    pub link_type: LinkType,
    pub options: LinkOptions,
}

impl Link {
    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.node_one, self.iface_one, self.node_two, self.iface_two)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.node_one == node || self.node_two == node
    }

    pub fn uses_interface(&self, node: NodeId, iface: InterfaceId) -> bool {
        (self.node_one == node && self.iface_one == Some(iface))
            || (self.node_two == node && self.iface_two == Some(iface))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkEndpoint {
    pub node: NodeId,
    pub iface: Option<InterfaceId>,
}

/// Order-independent identity of a link.
///
/// Endpoints are stored sorted by node id, so `(a, b)` and `(b, a)` build
/// the same key. As a lookup pattern an endpoint without an interface id
/// matches any interface on that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkKey {
    first: LinkEndpoint,
    second: LinkEndpoint,
}

impl LinkKey {
    pub fn new(
        node_one: NodeId,
        iface_one: Option<InterfaceId>,
        node_two: NodeId,
        iface_two: Option<InterfaceId>,
    ) -> Self {
        let one = LinkEndpoint {
            node: node_one,
            iface: iface_one,
        };
        let two = LinkEndpoint {
            node: node_two,
            iface: iface_two,
        };
        if one <= two {
            Self {
                first: one,
                second: two,
            }
        } else {
            Self {
                first: two,
                second: one,
            }
        }
    }

    pub fn endpoints(&self) -> (LinkEndpoint, LinkEndpoint) {
        (self.first, self.second)
    }

    /// True when `self`, used as a lookup pattern, selects `link`.
    pub fn selects(&self, link: &Link) -> bool {
        let candidate = link.key();
        endpoint_matches(&self.first, &candidate.first)
            && endpoint_matches(&self.second, &candidate.second)
    }
}

fn endpoint_matches(pattern: &LinkEndpoint, actual: &LinkEndpoint) -> bool {
    pattern.node == actual.node && (pattern.iface.is_none() || pattern.iface == actual.iface)
}
