//! Wire schema shared by the API service, the event sink and clients.
//!
//! Optional text fields travel as strings where empty means unset, and
//! numeric link options travel as plain numbers where zero means unset.
//! `emulator::translate` owns the mapping to and from domain types.

use crate::emulator::events::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ConfigMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: u32,
    pub state: u32,
    pub nodes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLocation {
    pub position: Position,
    pub scale: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    pub name: String,
    pub node_type: u32,
    pub model: String,
    pub position: Position,
    pub services: Vec<String>,
    /// Radio model of wireless networks.
    pub emane: String,
    pub icon: String,
    pub opaque: String,
}

/// Node creation request. A missing id is allocated by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub id: Option<u32>,
    pub name: String,
    pub node_type: u32,
    pub model: String,
    pub position: Position,
    pub services: Vec<String>,
    pub emane: String,
    pub icon: String,
    pub opaque: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: Option<u32>,
    pub name: String,
    pub mac: String,
    pub ip4: String,
    pub ip4mask: u32,
    pub ip6: String,
    pub ip6mask: u32,
    pub netid: Option<u32>,
    pub flowid: Option<u32>,
    pub mtu: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkOptions {
    pub opaque: String,
    pub jitter: u64,
    pub key: u32,
    pub mburst: u32,
    pub mer: u32,
    pub per: f64,
    pub bandwidth: u64,
    pub burst: u32,
    pub delay: u64,
    pub dup: u32,
    pub unidirectional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub node_one: u32,
    pub node_two: u32,
    pub link_type: u32,
    pub interface_one: Option<Interface>,
    pub interface_two: Option<Interface>,
    pub options: Option<LinkOptions>,
}

/// Selects a link for edit/delete. Endpoint order does not matter; a
/// missing interface id matches any interface on that node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkSelector {
    pub node_one: u32,
    pub node_two: u32,
    pub interface_one: Option<u32>,
    pub interface_two: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: u32,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub node: Node,
    pub interfaces: Vec<Interface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOption {
    pub label: String,
    pub name: String,
    pub value: String,
    pub config_type: u32,
    pub select: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub name: String,
    pub options: Vec<ConfigOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub node_id: u32,
    pub model: String,
    pub groups: Vec<ConfigGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub state: u32,
    pub file: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub group: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefaults {
    pub node_type: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeServiceData {
    pub executables: Vec<String>,
    pub dependencies: Vec<String>,
    pub dirs: Vec<String>,
    pub configs: Vec<String>,
    pub startup: Vec<String>,
    pub validate: Vec<String>,
    pub validation_mode: u32,
    pub validation_timer: u32,
    pub shutdown: Vec<String>,
    pub meta: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeServiceUpdate {
    pub service: String,
    pub startup: Vec<String>,
    pub validate: Vec<String>,
    pub shutdown: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenResult {
    pub result: bool,
    pub session_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    pub message_type: u32,
    pub node: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEvent {
    pub message_type: u32,
    pub link: Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub node_id: Option<u32>,
    pub event: u32,
    pub name: String,
    pub data: String,
    pub time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEvent {
    pub message_type: u32,
    pub node_id: Option<u32>,
    pub object: String,
    pub config_type: u32,
    pub data_types: Vec<u32>,
    pub data_values: String,
    pub captions: String,
    pub bitmap: String,
    pub possible_values: String,
    pub groups: String,
    pub session: String,
    pub interface: Option<u32>,
    pub network_id: Option<u32>,
    pub opaque: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEvent {
    pub node_id: Option<u32>,
    pub session: u32,
    pub level: u32,
    pub source: String,
    /// RFC 3339 timestamp.
    pub date: String,
    pub text: String,
    pub opaque: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    pub message_type: u32,
    pub node_id: Option<u32>,
    pub name: String,
    pub mode: String,
    pub number: u32,
    pub file_type: String,
    pub source: String,
    pub session: String,
    pub data: String,
    pub compressed_data: String,
}

/// One message on an event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Node(NodeEvent),
    Link(LinkEvent),
    Session(SessionEvent),
    Config(ConfigEvent),
    Exception(ExceptionEvent),
    File(FileEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Node(_) => EventKind::Node,
            Event::Link(_) => EventKind::Link,
            Event::Session(_) => EventKind::Session,
            Event::Config(_) => EventKind::Config,
            Event::Exception(_) => EventKind::Exception,
            Event::File(_) => EventKind::File,
        }
    }
}

/// What an observer wants to receive, answered from its `hello` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub session_id: u32,
    pub kind: EventKind,
    /// Replay current session state before live events.
    pub resync: bool,
}
