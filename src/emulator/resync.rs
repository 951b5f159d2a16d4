//! Full-state replay for observers that attach to a live session.
//!
//! Events come out in dependency order: nodes, links, mobility configs,
//! EMANE configs, service customisations with their files, hooks by state,
//! session options, session metadata. Nothing refers to a node before the
//! node itself has been sent.

use crate::emulator::configurable::ConfigDataType;
use crate::emulator::events::{
    ConfigData, ConfigFlag, DomainEvent, EventKind, FileData, MessageFlag,
};
use crate::emulator::models::{ModelConfigStore, SESSION_METADATA};
use crate::emulator::services::service_config_values;
use crate::emulator::session::SessionInner;
use crate::emulator::translate::{link_data, node_data};

/// Every event needed to rebuild the session's observable state.
pub fn snapshot_events(session: &SessionInner) -> Vec<DomainEvent> {
    let mut events = Vec::new();
    let topology = session.topology();

    events.extend(
        topology
            .nodes()
            .map(|node| DomainEvent::Node(node_data(node, MessageFlag::Add))),
    );
    events.extend(
        topology
            .links()
            .iter()
            .map(|link| DomainEvent::Link(link_data(topology, link, MessageFlag::Add))),
    );

    model_configs(session.mobility(), &mut events);
    model_configs(session.emane(), &mut events);
    service_configs(session, &mut events);

    for hook in session.hooks() {
        events.push(DomainEvent::File(FileData {
            message_type: MessageFlag::Add.code(),
            name: hook.file.clone(),
            file_type: Some(format!("hook:{}", hook.state.code())),
            data: Some(hook.data.clone()),
            ..FileData::default()
        }));
    }

    events.push(DomainEvent::Config(session.options_schema().config_data(
        None,
        ConfigFlag::Update,
        &session.options(),
    )));

    let metadata = session.metadata();
    events.push(DomainEvent::Config(ConfigData {
        object: SESSION_METADATA.to_string(),
        config_type: ConfigFlag::None.code(),
        data_types: vec![ConfigDataType::String.code(); metadata.len()],
        data_values: metadata
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("|"),
        ..ConfigData::default()
    }));

    events
}

/// Snapshot events of a single kind, in replay order.
pub fn snapshot_events_of(session: &SessionInner, kind: EventKind) -> Vec<DomainEvent> {
    snapshot_events(session)
        .into_iter()
        .filter(|event| event.kind() == kind)
        .collect()
}

fn model_configs(store: &ModelConfigStore, events: &mut Vec<DomainEvent>) {
    for config in store.all_configs() {
        let Some(schema) = store.schema(&config.model) else {
            continue;
        };
        events.push(DomainEvent::Config(schema.config_data(
            Some(config.node_id),
            ConfigFlag::Update,
            &config.values,
        )));
    }
}

fn service_configs(session: &SessionInner, events: &mut Vec<DomainEvent>) {
    let services = session.services();
    for custom in services.custom_services() {
        let opaque = format!("service:{}", custom.spec.name);
        events.push(DomainEvent::Config(ConfigData {
            node: Some(custom.node_id),
            object: "services".to_string(),
            config_type: ConfigFlag::Update.code(),
            data_types: vec![ConfigDataType::String.code(); 8],
            data_values: service_config_values(&custom.spec),
            session: Some(session.id()),
            opaque: Some(opaque.clone()),
            ..ConfigData::default()
        }));

        let Some(node) = session.topology().node(custom.node_id) else {
            continue;
        };
        for (name, data) in services.service_files(node, &custom.spec.name) {
            events.push(DomainEvent::File(FileData {
                message_type: MessageFlag::Add.code(),
                node: Some(custom.node_id),
                name,
                file_type: Some(opaque.clone()),
                data: Some(data),
                ..FileData::default()
            }));
        }
    }
}

#[cfg(test)]
#[path = "tests/resync_tests.rs"]
mod tests;
