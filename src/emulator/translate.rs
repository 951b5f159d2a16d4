//! Conversion between domain entities, domain events and the wire schema.
//!
//! Incoming text fields are normalised here: an empty string means unset,
//! and so does a zero link option.

use crate::emulator::configurable::{ConfigGroup, ConfigOptionView};
use crate::emulator::events::{
    ConfigData, DomainEvent, EventData, ExceptionData, FileData, LinkData, MessageFlag, NodeData,
};
use crate::emulator::lifecycle::{Hook, InvalidState, SessionState};
use crate::emulator::link::{Link, LinkOptions};
use crate::emulator::node::{GeoPosition, Interface, InterfaceData, Node, NodeOptions, Position};
use crate::emulator::services::ServiceSpec;
use crate::emulator::session::Location;
use crate::emulator::topology::Topology;
use crate::rpc::wire;

/// `None` for an empty string.
pub fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn node_data(node: &Node, message_flag: MessageFlag) -> NodeData {
    NodeData {
        message_flag,
        id: node.id,
        node_type: node.node_type,
        name: node.name.clone(),
        model: node.model.clone(),
        icon: node.icon.clone(),
        opaque: node.opaque.clone(),
        services: node.services.clone(),
        position: node.position,
        geo: node.geo,
        radio_model: node.radio_model.clone(),
    }
}

/// Link payload with both interfaces resolved from `topology`. An
/// interface that no longer exists (after a delete) keeps only its id.
pub fn link_data(topology: &Topology, link: &Link, message_flag: MessageFlag) -> LinkData {
    let resolve = |node_id, iface: Option<u32>| {
        iface.map(|id| {
            topology
                .interface(node_id, id)
                .cloned()
                .unwrap_or_else(|| Interface {
                    id,
                    node_id,
                    name: String::new(),
                    mac: None,
                    ip4: None,
                    ip4_mask: 0,
                    ip6: None,
                    ip6_mask: 0,
                    mtu: 0,
                    flow_id: None,
                    net_id: None,
                })
        })
    };
    LinkData {
        message_flag,
        node_one: link.node_one,
        node_two: link.node_two,
        link_type: link.link_type,
        iface_one: resolve(link.node_one, link.iface_one),
        iface_two: resolve(link.node_two, link.iface_two),
        options: link.options.clone(),
    }
}

pub fn position_to_wire(position: Position, geo: Option<GeoPosition>) -> wire::Position {
    wire::Position {
        x: position.x,
        y: position.y,
        z: position.z,
        lat: geo.map(|g| g.lat),
        lon: geo.map(|g| g.lon),
        alt: geo.map(|g| g.alt),
    }
}

/// Canvas position plus a geo position when both lat and lon are given.
pub fn position_from_wire(position: &wire::Position) -> (Position, Option<GeoPosition>) {
    let canvas = Position {
        x: position.x,
        y: position.y,
        z: position.z,
    };
    let geo = match (position.lat, position.lon) {
        (Some(lat), Some(lon)) => Some(GeoPosition {
            lat,
            lon,
            alt: position.alt.unwrap_or_default(),
        }),
        _ => None,
    };
    (canvas, geo)
}

pub fn node_to_wire(data: &NodeData) -> wire::Node {
    wire::Node {
        id: data.id,
        name: data.name.clone(),
        node_type: data.node_type.code(),
        model: data.model.clone().unwrap_or_default(),
        position: position_to_wire(data.position, data.geo),
        services: data.services.clone(),
        emane: data.radio_model.clone().unwrap_or_default(),
        icon: data.icon.clone().unwrap_or_default(),
        opaque: data.opaque.clone().unwrap_or_default(),
    }
}

pub fn node_options_from_wire(node: &wire::NewNode) -> NodeOptions {
    let (position, geo) = position_from_wire(&node.position);
    NodeOptions {
        name: non_empty(&node.name),
        model: non_empty(&node.model),
        icon: non_empty(&node.icon),
        opaque: non_empty(&node.opaque),
        services: node.services.clone(),
        position: Some(position),
        geo,
        radio_model: non_empty(&node.emane),
    }
}

pub fn interface_to_wire(iface: &Interface) -> wire::Interface {
    wire::Interface {
        id: Some(iface.id),
        name: iface.name.clone(),
        mac: iface.mac.clone().unwrap_or_default(),
        ip4: iface.ip4.clone().unwrap_or_default(),
        ip4mask: iface.ip4_mask,
        ip6: iface.ip6.clone().unwrap_or_default(),
        ip6mask: iface.ip6_mask,
        netid: iface.net_id,
        flowid: iface.flow_id,
        mtu: iface.mtu,
    }
}

pub fn interface_from_wire(iface: &wire::Interface) -> InterfaceData {
    InterfaceData {
        id: iface.id,
        name: non_empty(&iface.name),
        mac: non_empty(&iface.mac),
        ip4: non_empty(&iface.ip4),
        ip4_mask: iface.ip4mask,
        ip6: non_empty(&iface.ip6),
        ip6_mask: iface.ip6mask,
    }
}

pub fn link_options_to_wire(options: &LinkOptions) -> wire::LinkOptions {
    wire::LinkOptions {
        opaque: options.opaque.clone().unwrap_or_default(),
        jitter: options.jitter.unwrap_or_default(),
        key: options.key.unwrap_or_default(),
        mburst: options.mburst.unwrap_or_default(),
        mer: options.mer.unwrap_or_default(),
        per: options.per.unwrap_or_default(),
        bandwidth: options.bandwidth.unwrap_or_default(),
        burst: options.burst.unwrap_or_default(),
        delay: options.delay.unwrap_or_default(),
        dup: options.dup.unwrap_or_default(),
        unidirectional: options.unidirectional,
    }
}

/// Numeric options are taken as given so an update can reset them to zero.
pub fn link_options_from_wire(options: &wire::LinkOptions) -> LinkOptions {
    LinkOptions {
        delay: Some(options.delay),
        bandwidth: Some(options.bandwidth),
        per: Some(options.per),
        dup: Some(options.dup),
        jitter: Some(options.jitter),
        mer: Some(options.mer),
        burst: Some(options.burst),
        mburst: Some(options.mburst),
        unidirectional: options.unidirectional,
        key: Some(options.key),
        opaque: non_empty(&options.opaque),
    }
}

pub fn link_to_wire(data: &LinkData) -> wire::Link {
    wire::Link {
        node_one: data.node_one,
        node_two: data.node_two,
        link_type: data.link_type.code(),
        interface_one: data.iface_one.as_ref().map(interface_to_wire),
        interface_two: data.iface_two.as_ref().map(interface_to_wire),
        options: Some(link_options_to_wire(&data.options)),
    }
}

fn option_to_wire(option: &ConfigOptionView) -> wire::ConfigOption {
    wire::ConfigOption {
        label: option.label.clone(),
        name: option.id.clone(),
        value: option.value.clone(),
        config_type: option.data_type.code(),
        select: option.choices.clone(),
    }
}

pub fn groups_to_wire(groups: Vec<ConfigGroup>) -> Vec<wire::ConfigGroup> {
    groups
        .into_iter()
        .map(|group| wire::ConfigGroup {
            name: group.name,
            options: group.options.iter().map(option_to_wire).collect(),
        })
        .collect()
}

pub fn hook_to_wire(hook: &Hook) -> wire::Hook {
    wire::Hook {
        state: hook.state.code(),
        file: hook.file.clone(),
        data: hook.data.clone(),
    }
}

pub fn hook_from_wire(hook: &wire::Hook) -> Result<Hook, InvalidState> {
    Ok(Hook {
        state: SessionState::from_code(hook.state)?,
        file: hook.file.clone(),
        data: hook.data.clone(),
    })
}

pub fn location_to_wire(location: &Location) -> wire::SessionLocation {
    wire::SessionLocation {
        position: wire::Position {
            x: location.x,
            y: location.y,
            z: location.z,
            lat: Some(location.lat),
            lon: Some(location.lon),
            alt: Some(location.alt),
        },
        scale: location.scale,
    }
}

/// Applies a wire location on top of `current`; geo fields left unset keep
/// their current values.
pub fn location_from_wire(location: &wire::SessionLocation, current: &Location) -> Location {
    Location {
        x: location.position.x,
        y: location.position.y,
        z: location.position.z,
        lat: location.position.lat.unwrap_or(current.lat),
        lon: location.position.lon.unwrap_or(current.lon),
        alt: location.position.alt.unwrap_or(current.alt),
        scale: location.scale,
    }
}

pub fn service_to_wire(spec: &ServiceSpec) -> wire::NodeServiceData {
    wire::NodeServiceData {
        executables: spec.executables.clone(),
        dependencies: spec.dependencies.clone(),
        dirs: spec.dirs.clone(),
        configs: spec.configs.clone(),
        startup: spec.startup.clone(),
        validate: spec.validate.clone(),
        validation_mode: spec.validation_mode.code(),
        validation_timer: spec.validation_timer,
        shutdown: spec.shutdown.clone(),
        meta: spec.meta.clone().unwrap_or_default(),
    }
}

fn session_event_to_wire(data: &EventData) -> wire::SessionEvent {
    wire::SessionEvent {
        node_id: data.node,
        event: data.event_type,
        name: data.name.clone().unwrap_or_default(),
        data: data.data.clone().unwrap_or_default(),
        time: data.time.unwrap_or_default(),
    }
}

fn config_event_to_wire(data: &ConfigData) -> wire::ConfigEvent {
    wire::ConfigEvent {
        message_type: data.message_type,
        node_id: data.node,
        object: data.object.clone(),
        config_type: data.config_type,
        data_types: data.data_types.clone(),
        data_values: data.data_values.clone(),
        captions: data.captions.clone().unwrap_or_default(),
        bitmap: data.bitmap.clone().unwrap_or_default(),
        possible_values: data.possible_values.clone().unwrap_or_default(),
        groups: data.groups.clone().unwrap_or_default(),
        session: data.session.map(|s| s.to_string()).unwrap_or_default(),
        interface: data.interface,
        network_id: data.network_id,
        opaque: data.opaque.clone().unwrap_or_default(),
    }
}

fn exception_event_to_wire(data: &ExceptionData) -> wire::ExceptionEvent {
    let secs = data.date.trunc() as i64;
    let nanos = (data.date.fract() * 1e9) as u32;
    let date = chrono::DateTime::from_timestamp(secs, nanos)
        .map(|date| date.to_rfc3339())
        .unwrap_or_default();
    wire::ExceptionEvent {
        node_id: data.node,
        session: data.session,
        level: data.level.code(),
        source: data.source.clone(),
        date,
        text: data.text.clone(),
        opaque: data.opaque.clone().unwrap_or_default(),
    }
}

fn file_event_to_wire(data: &FileData) -> wire::FileEvent {
    wire::FileEvent {
        message_type: data.message_type,
        node_id: data.node,
        name: data.name.clone(),
        mode: data.mode.clone().unwrap_or_default(),
        number: data.number.unwrap_or_default(),
        file_type: data.file_type.clone().unwrap_or_default(),
        source: data.source.clone().unwrap_or_default(),
        session: data.session.map(|s| s.to_string()).unwrap_or_default(),
        data: data.data.clone().unwrap_or_default(),
        compressed_data: data.compressed_data.clone().unwrap_or_default(),
    }
}

pub fn event_to_wire(event: &DomainEvent) -> wire::Event {
    match event {
        DomainEvent::Node(data) => wire::Event::Node(wire::NodeEvent {
            message_type: data.message_flag.code(),
            node: node_to_wire(data),
        }),
        DomainEvent::Link(data) => wire::Event::Link(wire::LinkEvent {
            message_type: data.message_flag.code(),
            link: link_to_wire(data),
        }),
        DomainEvent::Session(data) => wire::Event::Session(session_event_to_wire(data)),
        DomainEvent::Config(data) => wire::Event::Config(config_event_to_wire(data)),
        DomainEvent::Exception(data) => wire::Event::Exception(exception_event_to_wire(data)),
        DomainEvent::File(data) => wire::Event::File(file_event_to_wire(data)),
    }
}

#[cfg(test)]
#[path = "tests/translate_tests.rs"]
mod tests;
