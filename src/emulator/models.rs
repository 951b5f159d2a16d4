//! Per-node model configuration stores for the mobility and EMANE
//! subsystems, plus the schemas of every model they know about.

use crate::emulator::configurable::{ConfigError, ConfigSchema, ConfigurableOption};
use crate::emulator::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const BASIC_RANGE: &str = "basic_range";
pub const NS2_SCRIPT: &str = "ns2script";
pub const EMANE_GLOBAL: &str = "emane";
pub const SESSION_OPTIONS: &str = "session";
pub const SESSION_METADATA: &str = "metadata";

pub type ModelValues = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    UnknownModel(String),
    Invalid(ConfigError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownModel(name) => write!(f, "unknown model: {}", name),
            ModelError::Invalid(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Invalid(err)
    }
}

/// Start, pause or stop a scripted mobility model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobilityAction {
    Start,
    Pause,
    Stop,
}

impl MobilityAction {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(MobilityAction::Start),
            1 => Some(MobilityAction::Pause),
            2 => Some(MobilityAction::Stop),
            _ => None,
        }
    }
}

/// Configured values of one model on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeModelConfig {
    pub node_id: NodeId,
    pub model: String,
    pub values: ModelValues,
}

/// Model configurations of one subsystem, keyed by node and model name.
///
/// Each store owns its own schemas, built fresh by [`ModelConfigStore::mobility`]
/// or [`ModelConfigStore::emane`], so no two sessions share mutable defaults.
#[derive(Debug, Clone)]
pub struct ModelConfigStore {
    name: String,
    schemas: BTreeMap<String, ConfigSchema>,
    configs: BTreeMap<NodeId, BTreeMap<String, ModelValues>>,
}

impl ModelConfigStore {
    pub fn new(name: &str, schemas: Vec<ConfigSchema>) -> Self {
        Self {
            name: name.to_string(),
            schemas: schemas
                .into_iter()
                .map(|schema| (schema.name().to_string(), schema))
                .collect(),
            configs: BTreeMap::new(),
        }
    }

    pub fn mobility() -> Self {
        Self::new("MobilityManager", vec![basic_range_schema(), ns2script_schema()])
    }

    pub fn emane() -> Self {
        Self::new(
            "emane",
            vec![
                emane_rfpipe_schema(),
                emane_ieee80211abg_schema(),
                emane_tdma_schema(),
                emane_commeffect_schema(),
                emane_bypass_schema(),
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self, model: &str) -> Option<&ConfigSchema> {
        self.schemas.get(model)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Stored values of `model` on `node`, or its defaults when nothing was
    /// set. `None` only for an unknown model.
    pub fn get_model_config(&self, node: NodeId, model: &str) -> Option<ModelValues> {
        let schema = self.schemas.get(model)?;
        let stored = self.configs.get(&node).and_then(|models| models.get(model));
        Some(stored.cloned().unwrap_or_else(|| schema.defaults()))
    }

    /// Merges `values` onto the current (or default) configuration.
    pub fn set_model_config(
        &mut self,
        node: NodeId,
        model: &str,
        values: ModelValues,
    ) -> Result<(), ModelError> {
        let schema = self
            .schemas
            .get(model)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))?;
        let mut current = self
            .configs
            .get(&node)
            .and_then(|models| models.get(model))
            .cloned()
            .unwrap_or_else(|| schema.defaults());
        schema.apply(&mut current, values)?;
        self.configs
            .entry(node)
            .or_default()
            .insert(model.to_string(), current);
        Ok(())
    }

    pub fn has_config(&self, node: NodeId, model: &str) -> bool {
        self.configs
            .get(&node)
            .is_some_and(|models| models.contains_key(model))
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.configs.keys().copied().collect()
    }

    /// Every stored (node, model, values) triple, ordered by node then model.
    pub fn all_configs(&self) -> Vec<NodeModelConfig> {
        self.configs
            .iter()
            .flat_map(|(node_id, models)| {
                models.iter().map(|(model, values)| NodeModelConfig {
                    node_id: *node_id,
                    model: model.clone(),
                    values: values.clone(),
                })
            })
            .collect()
    }

    pub fn remove_node(&mut self, node: NodeId) {
        self.configs.remove(&node);
    }

    pub fn reset(&mut self) {
        self.configs.clear();
    }
}

/// EMANE model names are `emane_<model>`; anything else registered with
/// the subsystem is not offered as a model.
pub fn is_emane_model_name(name: &str) -> bool {
    name.split('_').count() == 2
}

pub fn basic_range_schema() -> ConfigSchema {
    ConfigSchema::builder(BASIC_RANGE)
        .option(ConfigurableOption::int("range", "wireless range (pixels)", 275))
        .option(ConfigurableOption::int("bandwidth", "bandwidth (bps)", 54_000_000))
        .option(ConfigurableOption::int("jitter", "transmission jitter (usec)", 0))
        .option(ConfigurableOption::int("delay", "transmission delay (usec)", 5000))
        .option(ConfigurableOption::float("error", "loss (%)", 0.0))
        .group("Basic Range Parameters", 1, 5)
        .build()
}

pub fn ns2script_schema() -> ConfigSchema {
    ConfigSchema::builder(NS2_SCRIPT)
        .option(ConfigurableOption::string("file", "mobility script file", ""))
        .option(ConfigurableOption::int("refresh_ms", "refresh time (ms)", 50))
        .option(ConfigurableOption::boolean("loop", "loop", true))
        .option(ConfigurableOption::string("autostart", "auto-start seconds (0.0 for runtime)", ""))
        .option(ConfigurableOption::string("map", "node mapping (optional, e.g. 0:1,1:2,2:3)", ""))
        .option(ConfigurableOption::string("script_start", "script file to run upon start", ""))
        .option(ConfigurableOption::string("script_pause", "script file to run upon pause", ""))
        .option(ConfigurableOption::string("script_stop", "script file to run upon stop", ""))
        .group("ns-2 Mobility Script Parameters", 1, 8)
        .build()
}

pub fn emane_global_schema() -> ConfigSchema {
    ConfigSchema::builder(EMANE_GLOBAL)
        .option(ConfigurableOption::string(
            "antennaprofilemanifesturi",
            "antenna profile manifest URI",
            "",
        ))
        .option(ConfigurableOption::boolean("controlportendpoint", "control port endpoint", false))
        .option(ConfigurableOption::int("eventservicettl", "event service TTL", 1))
        .option(ConfigurableOption::boolean(
            "otamanagerchannelenable",
            "OTA manager channel enable",
            true,
        ))
        .option(ConfigurableOption::string("otamanagerdevice", "OTA manager device", "ctrl0"))
        .option(ConfigurableOption::string(
            "otamanagergroup",
            "OTA manager group",
            "224.1.2.8:45702",
        ))
        .option(ConfigurableOption::string("eventservicedevice", "event service device", "ctrl0"))
        .option(ConfigurableOption::string(
            "eventservicegroup",
            "event service group",
            "224.1.2.8:45703",
        ))
        .option(ConfigurableOption::int("platform_id_start", "starting platform id", 1))
        .option(ConfigurableOption::int("nem_id_start", "starting NEM id", 1))
        .option(ConfigurableOption::boolean("link_enabled", "link monitoring enabled", true))
        .option(ConfigurableOption::int("loss_threshold", "link loss threshold (%)", 30))
        .option(ConfigurableOption::float("link_interval", "link monitor interval (sec)", 1.0))
        .option(ConfigurableOption::float("link_timeout", "link timeout (sec)", 4.0))
        .group("Platform Attributes", 1, 8)
        .group("NEM Parameters", 9, 14)
        .build()
}

/// Options every session carries, with their defaults.
pub fn session_options_schema() -> ConfigSchema {
    ConfigSchema::builder(SESSION_OPTIONS)
        .option(ConfigurableOption::string("controlnet", "Control Network", ""))
        .option(ConfigurableOption::string("controlnet0", "Control Network 0", ""))
        .option(ConfigurableOption::string("controlnet1", "Control Network 1", ""))
        .option(ConfigurableOption::string("controlnet2", "Control Network 2", ""))
        .option(ConfigurableOption::string("controlnet3", "Control Network 3", ""))
        .option(ConfigurableOption::string(
            "controlnet_updown_script",
            "Control Network Script",
            "",
        ))
        .option(ConfigurableOption::boolean("enablerj45", "Enable RJ45s", true))
        .option(ConfigurableOption::boolean("preservedir", "Preserve session dir", false))
        .option(ConfigurableOption::boolean("enablesdt", "Enable SDT3D output", false))
        .option(ConfigurableOption::string("sdturl", "SDT3D URL", "tcp://127.0.0.1:50000/"))
        .group("Options", 1, 10)
        .bitmap("")
        .build()
}

/// Shared MAC, PHY and external option blocks of the EMANE radio models.
fn emane_model_schema(name: &str, mac: Vec<ConfigurableOption>) -> ConfigSchema {
    let phy = vec![
        ConfigurableOption::int("bandwidth", "rf bandwidth (Hz)", 1_000_000),
        ConfigurableOption::int("frequency", "frequency (Hz)", 2_347_000_000),
        ConfigurableOption::int("frequencyofinterest", "frequency of interest (Hz)", 2_347_000_000),
        ConfigurableOption::int("subid", "subid", 1),
        ConfigurableOption::float("systemnoisefigure", "system noise figure (dB)", 4.0),
        ConfigurableOption::float("txpower", "transmit power (dBm)", 0.0),
        ConfigurableOption::string("propagationmodel", "propagation model", "2ray")
            .with_choices(&["precomputed", "2ray", "freespace"]),
    ];
    let mac_len = mac.len();
    let phy_len = phy.len();
    let mut builder = ConfigSchema::builder(name);
    for option in mac.into_iter().chain(phy) {
        builder = builder.option(option);
    }
    if mac_len > 0 {
        builder = builder.group("MAC Parameters", 1, mac_len);
    }
    builder
        .option(ConfigurableOption::boolean("external", "external", false))
        .group("PHY Parameters", mac_len + 1, mac_len + phy_len)
        .group("External Parameters", mac_len + phy_len + 1, mac_len + phy_len + 1)
        .build()
}

pub fn emane_rfpipe_schema() -> ConfigSchema {
    emane_model_schema(
        "emane_rfpipe",
        vec![
            ConfigurableOption::int("datarate", "data rate (bps)", 1_000_000),
            ConfigurableOption::float("delay", "delay (sec)", 0.0),
            ConfigurableOption::boolean("enablepromiscuousmode", "promiscuous mode", false),
            ConfigurableOption::boolean("flowcontrolenable", "flow control", false),
            ConfigurableOption::int("flowcontroltokens", "flow control tokens", 10),
            ConfigurableOption::float("jitter", "jitter (sec)", 0.0),
            ConfigurableOption::string("pcrcurveuri", "SINR/PCR curve file", ""),
        ],
    )
}

pub fn emane_ieee80211abg_schema() -> ConfigSchema {
    emane_model_schema(
        "emane_ieee80211abg",
        vec![
            ConfigurableOption::int("mode", "mode", 0).with_choices(&[
                "0 802.11b (DSSS only)",
                "1 802.11b (DSSS only)",
                "2 802.11a or g (OFDM)",
                "3 802.11b/g (DSSS and OFDM)",
            ]),
            ConfigurableOption::boolean("enablepromiscuousmode", "promiscuous mode", false),
            ConfigurableOption::int("distance", "max distance (m)", 1000),
            ConfigurableOption::int("unicastrate", "unicast rate (Mbps)", 4),
            ConfigurableOption::int("multicastrate", "multicast rate (Mbps)", 1),
            ConfigurableOption::int("rtsthreshold", "RTS threshold (bytes)", 0),
            ConfigurableOption::string("pcrcurveuri", "SINR/PCR curve file", ""),
        ],
    )
}

pub fn emane_tdma_schema() -> ConfigSchema {
    emane_model_schema(
        "emane_tdma",
        vec![
            ConfigurableOption::boolean("enablepromiscuousmode", "promiscuous mode", false),
            ConfigurableOption::int("fragmentcheckthreshold", "fragment check threshold (sec)", 2),
            ConfigurableOption::int(
                "fragmenttimeoutthreshold",
                "fragment timeout threshold (sec)",
                5,
            ),
            ConfigurableOption::int("queue.depth", "queue depth", 256),
            ConfigurableOption::string("schedule", "TDMA schedule file", ""),
            ConfigurableOption::string("pcrcurveuri", "SINR/PCR curve file", ""),
        ],
    )
}

pub fn emane_commeffect_schema() -> ConfigSchema {
    ConfigSchema::builder("emane_commeffect")
        .option(ConfigurableOption::boolean(
            "defaultconnectivitymode",
            "default connectivity",
            true,
        ))
        .option(ConfigurableOption::boolean("enablepromiscuousmode", "promiscuous mode", false))
        .option(ConfigurableOption::string("filterfile", "filter file", ""))
        .option(ConfigurableOption::int("groupid", "NEM group id", 0))
        .option(ConfigurableOption::boolean("receivebufferperiod", "receive buffer period", false))
        .group("CommEffect SHIM Parameters", 1, 5)
        .build()
}

pub fn emane_bypass_schema() -> ConfigSchema {
    ConfigSchema::builder("emane_bypass")
        .option(ConfigurableOption::boolean(
            "none",
            "There are no parameters for the bypass model.",
            false,
        ))
        .group("Bypass Parameters", 1, 1)
        .build()
}

#[cfg(test)]
#[path = "tests/models_tests.rs"]
mod tests;
