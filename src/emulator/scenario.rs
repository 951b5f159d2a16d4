//! Whole-session export and import.

use crate::emulator::events::{DomainEvent, MessageFlag};
use crate::emulator::lifecycle::Hook;
use crate::emulator::link::Link;
use crate::emulator::models::{ModelValues, NodeModelConfig};
use crate::emulator::node::Node;
use crate::emulator::services::CustomService;
use crate::emulator::session::{Location, SessionInner};
use crate::emulator::topology::Topology;
use crate::emulator::translate::{link_data, node_data};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCENARIO_VERSION: u32 = 1;

/// Everything needed to recreate a session elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub version: u32,
    pub location: Location,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(default)]
    pub options: ModelValues,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub mobility: Vec<NodeModelConfig>,
    #[serde(default)]
    pub emane: Vec<NodeModelConfig>,
    #[serde(default)]
    pub emane_config: ModelValues,
    #[serde(default)]
    pub service_defaults: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub custom_services: Vec<CustomService>,
}

/// Serialises scenario documents.
pub trait ScenarioCodec: Send + Sync {
    fn encode(&self, document: &ScenarioDocument) -> Result<String>;
    fn decode(&self, data: &str) -> Result<ScenarioDocument>;
}

#[derive(Debug, Default)]
pub struct JsonScenarioCodec;

impl ScenarioCodec for JsonScenarioCodec {
    fn encode(&self, document: &ScenarioDocument) -> Result<String> {
        serde_json::to_string_pretty(document).context("failed to encode scenario")
    }

    fn decode(&self, data: &str) -> Result<ScenarioDocument> {
        let document: ScenarioDocument =
            serde_json::from_str(data).context("failed to decode scenario")?;
        if document.version != SCENARIO_VERSION {
            bail!("unsupported scenario version {}", document.version);
        }
        Ok(document)
    }
}

impl SessionInner {
    pub fn export_scenario(&self) -> ScenarioDocument {
        ScenarioDocument {
            version: SCENARIO_VERSION,
            location: self.location,
            nodes: self.topology.nodes().cloned().collect(),
            links: self.topology.links().to_vec(),
            hooks: self.hooks().cloned().collect(),
            options: self.options.clone(),
            metadata: self.metadata.clone(),
            mobility: self.mobility.all_configs(),
            emane: self.emane.all_configs(),
            emane_config: self.emane_config.clone(),
            service_defaults: self.services.defaults().clone(),
            custom_services: self.services.custom_services().cloned().collect(),
        }
    }

    /// Replaces the session contents with `document`. Nothing is changed
    /// when the document is inconsistent.
    pub fn import_scenario(&mut self, document: ScenarioDocument) -> Result<()> {
        let topology =
            Topology::from_parts(document.nodes, document.links).context("invalid topology")?;
        let configured = document
            .mobility
            .iter()
            .chain(&document.emane)
            .map(|config| config.node_id)
            .chain(document.custom_services.iter().map(|custom| custom.node_id));
        for node_id in configured {
            if topology.node(node_id).is_none() {
                bail!("configuration refers to unknown node {}", node_id);
            }
        }

        let mut mobility = self.mobility.clone();
        mobility.reset();
        for config in document.mobility {
            mobility
                .set_model_config(config.node_id, &config.model, config.values)
                .context("invalid mobility configuration")?;
        }
        let mut emane = self.emane.clone();
        emane.reset();
        for config in document.emane {
            emane
                .set_model_config(config.node_id, &config.model, config.values)
                .context("invalid EMANE configuration")?;
        }
        let mut options = ModelValues::new();
        self.options_schema
            .apply(&mut options, document.options)
            .context("invalid session options")?;
        let mut emane_config = ModelValues::new();
        self.emane_schema
            .apply(&mut emane_config, document.emane_config)
            .context("invalid EMANE configuration")?;

        self.topology = topology;
        self.mobility = mobility;
        self.emane = emane;
        self.options = options;
        self.emane_config = emane_config;
        self.metadata = document.metadata;
        self.location = document.location;
        self.hooks.clear();
        for hook in document.hooks {
            self.add_hook(hook);
        }
        self.services.reset();
        if !document.service_defaults.is_empty() {
            self.services.set_defaults(document.service_defaults);
        }
        for custom in document.custom_services {
            self.services.restore_custom(custom);
        }

        for node in self.topology.nodes() {
            self.publish(DomainEvent::Node(node_data(node, MessageFlag::Add)));
        }
        for link in self.topology.links() {
            let event = link_data(&self.topology, link, MessageFlag::Add);
            self.publish(DomainEvent::Link(event));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/scenario_tests.rs"]
mod tests;
