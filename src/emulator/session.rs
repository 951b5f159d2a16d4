//! One emulated network: its graph, configuration and lifecycle state,
//! all guarded by a single per-session lock.
//!
//! Every mutation goes through [`SessionInner`], reached only via
//! [`Session::lock`]. Mutators publish their events while the lock is held,
//! so observers see events in the same order the mutations happened.

use crate::emulator::collaborators::Collaborators;
use crate::emulator::configurable::{ConfigError, ConfigSchema};
use crate::emulator::events::{unix_now, DomainEvent, ExceptionData, ExceptionLevel, MessageFlag};
use crate::emulator::hub::EventHub;
use crate::emulator::lifecycle::{Hook, SessionState};
use crate::emulator::link::{LinkKey, LinkOptions, LinkType};
use crate::emulator::models::{
    emane_global_schema, session_options_schema, MobilityAction, ModelConfigStore, ModelValues,
    NS2_SCRIPT,
};
use crate::emulator::node::{GeoPosition, InterfaceData, NodeId, NodeOptions, NodeType, Position};
use crate::emulator::services::{ServiceAction, ServiceManager};
use crate::emulator::topology::{Topology, TopologyError};
use crate::emulator::translate::{link_data, node_data};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Reference point mapping canvas coordinates onto the globe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    pub scale: f32,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            lat: 47.57917,
            lon: -122.13232,
            alt: 2.0,
            scale: 150_000.0,
        }
    }
}

/// Per-session settings decided by whoever creates the session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub workspace: PathBuf,
    pub preserve_workspace: bool,
    pub location: Location,
}

pub struct Session {
    id: u32,
    hub: EventHub,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(id: u32, settings: SessionSettings, collab: Collaborators) -> Self {
        let hub = EventHub::new();
        let inner = SessionInner {
            id,
            state: SessionState::Definition,
            workspace: settings.workspace,
            preserve_workspace: settings.preserve_workspace,
            location: settings.location,
            topology: Topology::new(),
            options: BTreeMap::new(),
            options_schema: session_options_schema(),
            metadata: BTreeMap::new(),
            hooks: BTreeMap::new(),
            mobility: ModelConfigStore::mobility(),
            emane: ModelConfigStore::emane(),
            emane_config: BTreeMap::new(),
            emane_schema: emane_global_schema(),
            services: ServiceManager::default(),
            hub: hub.clone(),
            collab,
        };
        Self {
            id,
            hub,
            inner: Mutex::new(inner),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The hub can be subscribed to without taking the session lock.
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().await
    }
}

pub struct SessionInner {
    pub(crate) id: u32,
    pub(crate) state: SessionState,
    pub(crate) workspace: PathBuf,
    pub(crate) preserve_workspace: bool,
    pub(crate) location: Location,
    pub(crate) topology: Topology,
    pub(crate) options: ModelValues,
    pub(crate) options_schema: ConfigSchema,
    pub(crate) metadata: BTreeMap<String, String>,
    pub(crate) hooks: BTreeMap<SessionState, Vec<Hook>>,
    pub(crate) mobility: ModelConfigStore,
    pub(crate) emane: ModelConfigStore,
    pub(crate) emane_config: ModelValues,
    pub(crate) emane_schema: ConfigSchema,
    pub(crate) services: ServiceManager,
    pub(crate) hub: EventHub,
    pub(crate) collab: Collaborators,
}

impl SessionInner {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn workspace(&self) -> &std::path::Path {
        &self.workspace
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub fn publish(&self, event: DomainEvent) {
        let delivered = self.hub.publish(event);
        debug!(session_id = self.id, delivered, "event published");
    }

    pub fn publish_exception(&self, level: ExceptionLevel, node: Option<NodeId>, text: String) {
        warn!(session_id = self.id, ?node, "{}", text);
        self.publish(DomainEvent::Exception(ExceptionData {
            node,
            session: self.id,
            level,
            source: "netemud".to_string(),
            date: unix_now(),
            text,
            opaque: None,
        }));
    }

    /// Adds a node, filling in default services for host-like nodes and
    /// registering a radio model on wireless networks.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        id: Option<NodeId>,
        mut options: NodeOptions,
    ) -> Result<NodeId, TopologyError> {
        if node_type == NodeType::Default {
            let model = options.model.get_or_insert_with(|| "router".to_string());
            if options.services.is_empty() {
                options.services = self.services.default_services(model);
            }
        }
        let radio_model = options.radio_model.clone();
        let node = self.topology.add_node(node_type, id, options)?;
        let node_id = node.id;
        let event = node_data(node, MessageFlag::Add);

        if let (true, Some(model)) = (node_type.is_wireless(), radio_model) {
            let store = if node_type == NodeType::Wlan {
                &mut self.mobility
            } else {
                &mut self.emane
            };
            if let Err(err) = store.set_model_config(node_id, &model, ModelValues::new()) {
                warn!(node_id, model = %model, "radio model not registered: {}", err);
            }
        }
        self.publish(DomainEvent::Node(event));
        Ok(node_id)
    }

    pub fn edit_node(
        &mut self,
        id: NodeId,
        position: Option<Position>,
        geo: Option<GeoPosition>,
    ) -> bool {
        let Some(node) = self.topology.update_node(id, position, geo) else {
            return false;
        };
        let event = node_data(node, MessageFlag::None);
        self.publish(DomainEvent::Node(event));
        true
    }

    /// Removes a node, its links and everything configured for it.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        let Some((node, links)) = self.topology.delete_node(id) else {
            return false;
        };
        self.mobility.remove_node(id);
        self.emane.remove_node(id);
        self.services.remove_node(id);
        for link in &links {
            let event = link_data(&self.topology, link, MessageFlag::Delete);
            self.publish(DomainEvent::Link(event));
        }
        self.publish(DomainEvent::Node(node_data(&node, MessageFlag::Delete)));
        true
    }

    pub fn add_link(
        &mut self,
        node_one: NodeId,
        node_two: NodeId,
        iface_one: Option<InterfaceData>,
        iface_two: Option<InterfaceData>,
        link_type: LinkType,
        options: LinkOptions,
    ) -> Result<(), TopologyError> {
        let link = self
            .topology
            .add_link(node_one, node_two, iface_one, iface_two, link_type, options)?
            .clone();
        let event = link_data(&self.topology, &link, MessageFlag::Add);
        self.publish(DomainEvent::Link(event));
        Ok(())
    }

    pub fn edit_link(&mut self, key: &LinkKey, options: &LinkOptions) -> bool {
        let Some(link) = self.topology.update_link(key, options).cloned() else {
            return false;
        };
        let event = link_data(&self.topology, &link, MessageFlag::None);
        self.publish(DomainEvent::Link(event));
        true
    }

    pub fn delete_link(&mut self, key: &LinkKey) -> bool {
        let Some(link) = self.topology.delete_link(key) else {
            return false;
        };
        let event = link_data(&self.topology, &link, MessageFlag::Delete);
        self.publish(DomainEvent::Link(event));
        true
    }

    /// Hooks ordered by state, then by registration order.
    pub fn hooks(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.values().flatten()
    }

    pub fn add_hook(&mut self, hook: Hook) {
        self.hooks.entry(hook.state).or_default().push(hook);
    }

    /// Current options, defaults filled in.
    pub fn options(&self) -> ModelValues {
        let mut values = self.options_schema.defaults();
        values.extend(self.options.clone());
        values
    }

    pub fn options_schema(&self) -> &ConfigSchema {
        &self.options_schema
    }

    pub fn set_options(&mut self, values: ModelValues) -> Result<(), ConfigError> {
        self.options_schema.apply(&mut self.options, values)
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Replaces the metadata map.
    pub fn set_metadata(&mut self, metadata: BTreeMap<String, String>) {
        self.metadata = metadata;
    }

    pub fn mobility(&self) -> &ModelConfigStore {
        &self.mobility
    }

    pub fn mobility_mut(&mut self) -> &mut ModelConfigStore {
        &mut self.mobility
    }

    pub fn emane(&self) -> &ModelConfigStore {
        &self.emane
    }

    pub fn emane_mut(&mut self) -> &mut ModelConfigStore {
        &mut self.emane
    }

    /// EMANE global configuration, defaults filled in.
    pub fn emane_config(&self) -> ModelValues {
        let mut values = self.emane_schema.defaults();
        values.extend(self.emane_config.clone());
        values
    }

    pub fn emane_schema(&self) -> &ConfigSchema {
        &self.emane_schema
    }

    pub fn set_emane_config(&mut self, values: ModelValues) -> Result<(), ConfigError> {
        self.emane_schema.apply(&mut self.emane_config, values)
    }

    pub fn services(&self) -> &ServiceManager {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut ServiceManager {
        &mut self.services
    }

    /// Forwards a mobility action for a node carrying a scripted mobility
    /// configuration. False when the node has none or the emulator fails.
    pub async fn mobility_action(&self, node_id: NodeId, action: MobilityAction) -> bool {
        if !self.mobility.has_config(node_id, NS2_SCRIPT) {
            return false;
        }
        let emulator = self.collab.emulator.clone();
        match emulator.mobility_action(self.id, node_id, action).await {
            Ok(()) => true,
            Err(err) => {
                self.publish_exception(
                    ExceptionLevel::Error,
                    Some(node_id),
                    format!("mobility {:?} failed: {:#}", action, err),
                );
                false
            }
        }
    }

    /// Runs a service action on a node. False when the node is unknown.
    pub async fn service_action(
        &self,
        node_id: NodeId,
        service: &str,
        action: ServiceAction,
    ) -> bool {
        let Some(node) = self.topology.node(node_id) else {
            return false;
        };
        let runner = self.collab.runner.clone();
        let cwd = if self.workspace.is_dir() {
            self.workspace.clone()
        } else {
            std::env::temp_dir()
        };
        self.services
            .run_action(node, service, action, runner.as_ref(), &cwd)
            .await
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
