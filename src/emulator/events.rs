//! Domain events published by session mutations.
//!
//! Each payload carries everything needed to build the matching wire event,
//! so observers never have to read session state back.

use crate::emulator::link::{LinkOptions, LinkType};
use crate::emulator::node::{GeoPosition, Interface, NodeId, NodeType, Position};
use serde::{Deserialize, Serialize};

/// The six independent event channels of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Node,
    Link,
    Session,
    Config,
    Exception,
    File,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Node,
        EventKind::Link,
        EventKind::Session,
        EventKind::Config,
        EventKind::Exception,
        EventKind::File,
    ];

    pub fn index(self) -> usize {
        match self {
            EventKind::Node => 0,
            EventKind::Link => 1,
            EventKind::Session => 2,
            EventKind::Config => 3,
            EventKind::Exception => 4,
            EventKind::File => 5,
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "node" => Ok(EventKind::Node),
            "link" => Ok(EventKind::Link),
            "session" => Ok(EventKind::Session),
            "config" => Ok(EventKind::Config),
            "exception" => Ok(EventKind::Exception),
            "file" => Ok(EventKind::File),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

/// Message flags, as carried in `message_type` wire fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageFlag {
    None,
    Add,
    Delete,
}

impl MessageFlag {
    pub fn code(self) -> u32 {
        match self {
            MessageFlag::None => 0,
            MessageFlag::Add => 1,
            MessageFlag::Delete => 2,
        }
    }
}

/// Config message type flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigFlag {
    None,
    Request,
    Update,
    Reset,
}

impl ConfigFlag {
    pub fn code(self) -> u32 {
        match self {
            ConfigFlag::None => 0,
            ConfigFlag::Request => 1,
            ConfigFlag::Update => 2,
            ConfigFlag::Reset => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionLevel {
    Fatal,
    Error,
    Warning,
    Notice,
}

impl ExceptionLevel {
    pub fn code(self) -> u32 {
        match self {
            ExceptionLevel::Fatal => 1,
            ExceptionLevel::Error => 2,
            ExceptionLevel::Warning => 3,
            ExceptionLevel::Notice => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub message_flag: MessageFlag,
    pub id: NodeId,
    pub node_type: NodeType,
    pub name: String,
    pub model: Option<String>,
    pub icon: Option<String>,
    pub opaque: Option<String>,
    pub services: Vec<String>,
    pub position: Position,
    pub geo: Option<GeoPosition>,
    pub radio_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkData {
    pub message_flag: MessageFlag,
    pub node_one: NodeId,
    pub node_two: NodeId,
    pub link_type: LinkType,
    pub iface_one: Option<Interface>,
    pub iface_two: Option<Interface>,
    pub options: LinkOptions,
}

/// Session-level event such as a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub node: Option<NodeId>,
    pub event_type: u32,
    pub name: Option<String>,
    pub data: Option<String>,
    /// Seconds since the unix epoch.
    pub time: Option<f64>,
}

/// Legacy config payload: one subsystem's values flattened into pipe
/// separated strings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigData {
    pub message_type: u32,
    pub node: Option<NodeId>,
    pub object: String,
    pub config_type: u32,
    pub data_types: Vec<u32>,
    pub data_values: String,
    pub captions: Option<String>,
    pub bitmap: Option<String>,
    pub possible_values: Option<String>,
    pub groups: Option<String>,
    pub session: Option<u32>,
    pub interface: Option<u32>,
    pub network_id: Option<u32>,
    pub opaque: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionData {
    pub node: Option<NodeId>,
    pub session: u32,
    pub level: ExceptionLevel,
    pub source: String,
    /// Seconds since the unix epoch.
    pub date: f64,
    pub text: String,
    pub opaque: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileData {
    pub message_type: u32,
    pub node: Option<NodeId>,
    pub name: String,
    pub mode: Option<String>,
    pub number: Option<u32>,
    pub file_type: Option<String>,
    pub source: Option<String>,
    pub session: Option<u32>,
    pub data: Option<String>,
    pub compressed_data: Option<String>,
}

/// Everything a session can tell its observers. Events are immutable once
/// published and each subscriber queue sees each event at most once.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Node(NodeData),
    Link(LinkData),
    Session(EventData),
    Config(ConfigData),
    Exception(ExceptionData),
    File(FileData),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::Node(_) => EventKind::Node,
            DomainEvent::Link(_) => EventKind::Link,
            DomainEvent::Session(_) => EventKind::Session,
            DomainEvent::Config(_) => EventKind::Config,
            DomainEvent::Exception(_) => EventKind::Exception,
            DomainEvent::File(_) => EventKind::File,
        }
    }
}

/// Current time as fractional unix seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
