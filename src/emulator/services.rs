//! Service catalogue, per-model default service sets, per-node service
//! customisation and service actions.

use crate::emulator::collaborators::ServiceRunner;
use crate::emulator::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationMode {
    #[default]
    Blocking,
    NonBlocking,
    Timer,
}

impl ValidationMode {
    pub fn code(self) -> u32 {
        match self {
            ValidationMode::Blocking => 0,
            ValidationMode::NonBlocking => 1,
            ValidationMode::Timer => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub group: String,
    pub executables: Vec<String>,
    pub dependencies: Vec<String>,
    pub dirs: Vec<String>,
    pub configs: Vec<String>,
    pub startup: Vec<String>,
    pub validate: Vec<String>,
    pub shutdown: Vec<String>,
    pub validation_mode: ValidationMode,
    pub validation_timer: u32,
    pub meta: Option<String>,
    /// File name to template. `{node_name}` and `{node_id}` are substituted.
    pub templates: BTreeMap<String, String>,
}

impl ServiceSpec {
    fn new(name: &str, group: &str) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            ..Self::default()
        }
    }

    fn file(mut self, name: &str, template: &str) -> Self {
        self.configs.push(name.to_string());
        self.templates
            .insert(name.to_string(), template.to_string());
        self
    }

    fn startup(mut self, commands: &[&str]) -> Self {
        self.startup = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    fn validate(mut self, commands: &[&str]) -> Self {
        self.validate = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    fn shutdown(mut self, commands: &[&str]) -> Self {
        self.shutdown = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    fn needs(mut self, executables: &[&str], dependencies: &[&str]) -> Self {
        self.executables = executables.iter().map(|c| c.to_string()).collect();
        self.dependencies = dependencies.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Start, stop, restart or validate a service on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
    Validate,
}

impl ServiceAction {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ServiceAction::Start),
            1 => Some(ServiceAction::Stop),
            2 => Some(ServiceAction::Restart),
            3 => Some(ServiceAction::Validate),
            _ => None,
        }
    }
}

/// A node-specific copy of a catalogue service plus its custom files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomService {
    pub node_id: NodeId,
    pub spec: ServiceSpec,
    pub files: BTreeMap<String, String>,
}

pub fn builtin_catalogue() -> Vec<ServiceSpec> {
    vec![
        ServiceSpec::new("zebra", "Quagga")
            .needs(&["zebra"], &[])
            .file("/usr/local/etc/quagga/Quagga.conf", "hostname {node_name}\n")
            .startup(&["sh quaggaboot.sh zebra"])
            .validate(&["pidof zebra"])
            .shutdown(&["killall zebra"]),
        ServiceSpec::new("OSPFv2", "Quagga")
            .needs(&["ospfd"], &["zebra"])
            .validate(&["pidof ospfd"])
            .shutdown(&["killall ospfd"]),
        ServiceSpec::new("OSPFv3", "Quagga")
            .needs(&["ospf6d"], &["zebra"])
            .validate(&["pidof ospf6d"])
            .shutdown(&["killall ospf6d"]),
        ServiceSpec::new("OSPFv3MDR", "Quagga")
            .needs(&["ospf6d"], &["zebra"])
            .validate(&["pidof ospf6d"])
            .shutdown(&["killall ospf6d"]),
        ServiceSpec::new("IPForward", "Utility")
            .file(
                "ipforward.sh",
                "#!/bin/sh\n# auto-generated by IPForward service for {node_name}\n\
                 sysctl -w net.ipv4.ip_forward=1\n",
            )
            .startup(&["sh ipforward.sh"]),
        ServiceSpec::new("DefaultRoute", "Utility")
            .file(
                "defaultroute.sh",
                "#!/bin/sh\n# auto-generated by DefaultRoute service (node {node_id})\n",
            )
            .startup(&["sh defaultroute.sh"]),
        ServiceSpec::new("SSH", "Utility")
            .needs(&["sshd"], &[])
            .file(
                "startsshd.sh",
                "#!/bin/sh\n# auto-generated by SSH service for {node_name}\n\
                 /usr/sbin/sshd -f /etc/ssh/sshd_config\n",
            )
            .startup(&["sh startsshd.sh"])
            .shutdown(&["killall sshd"]),
        ServiceSpec::new("HTTP", "Utility")
            .needs(&["apache2ctl"], &[])
            .startup(&["apache2ctl start"])
            .shutdown(&["apache2ctl stop"]),
        ServiceSpec::new("pcap", "Utility")
            .needs(&["tcpdump"], &[])
            .file("pcap.sh", "#!/bin/sh\n# capture on {node_name}\n")
            .startup(&["sh pcap.sh start"])
            .shutdown(&["sh pcap.sh stop"]),
    ]
}

pub fn builtin_defaults() -> BTreeMap<String, Vec<String>> {
    let sets: [(&str, &[&str]); 5] = [
        ("router", &["zebra", "OSPFv2", "OSPFv3", "IPForward"]),
        ("host", &["DefaultRoute", "SSH"]),
        ("PC", &["DefaultRoute"]),
        ("mdr", &["zebra", "OSPFv3MDR", "IPForward"]),
        ("prouter", &[]),
    ];
    sets.into_iter()
        .map(|(model, services)| {
            (
                model.to_string(),
                services.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

/// Per-session service state.
#[derive(Debug, Clone)]
pub struct ServiceManager {
    catalogue: BTreeMap<String, ServiceSpec>,
    defaults: BTreeMap<String, Vec<String>>,
    custom: BTreeMap<(NodeId, String), CustomService>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new(builtin_catalogue(), builtin_defaults())
    }
}

impl ServiceManager {
    pub fn new(catalogue: Vec<ServiceSpec>, defaults: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            catalogue: catalogue
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
            defaults,
            custom: BTreeMap::new(),
        }
    }

    pub fn catalogue(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.catalogue.values()
    }

    pub fn defaults(&self) -> &BTreeMap<String, Vec<String>> {
        &self.defaults
    }

    /// Replaces every default set.
    pub fn set_defaults(&mut self, defaults: BTreeMap<String, Vec<String>>) {
        self.defaults = defaults;
    }

    pub fn default_services(&self, model: &str) -> Vec<String> {
        self.defaults.get(model).cloned().unwrap_or_default()
    }

    /// The node's custom copy of `name`, else the catalogue entry.
    pub fn get_service(&self, node_id: NodeId, name: &str) -> Option<&ServiceSpec> {
        self.custom
            .get(&(node_id, name.to_string()))
            .map(|custom| &custom.spec)
            .or_else(|| self.catalogue.get(name))
    }

    fn customise(&mut self, node_id: NodeId, name: &str) -> Option<&mut CustomService> {
        let key = (node_id, name.to_string());
        if !self.custom.contains_key(&key) {
            let spec = self.catalogue.get(name)?.clone();
            self.custom.insert(
                key.clone(),
                CustomService {
                    node_id,
                    spec,
                    files: BTreeMap::new(),
                },
            );
        }
        self.custom.get_mut(&key)
    }

    /// Stores custom startup, validate and shutdown commands for a node.
    /// False when the service is not in the catalogue.
    pub fn set_service(
        &mut self,
        node_id: NodeId,
        name: &str,
        startup: Vec<String>,
        validate: Vec<String>,
        shutdown: Vec<String>,
    ) -> bool {
        let Some(custom) = self.customise(node_id, name) else {
            return false;
        };
        custom.spec.startup = startup;
        custom.spec.validate = validate;
        custom.spec.shutdown = shutdown;
        info!(node_id, service = name, "custom service commands stored");
        true
    }

    pub fn set_service_file(
        &mut self,
        node_id: NodeId,
        name: &str,
        file: &str,
        data: String,
    ) -> bool {
        let Some(custom) = self.customise(node_id, name) else {
            return false;
        };
        if !custom.spec.configs.iter().any(|config| config == file) {
            custom.spec.configs.push(file.to_string());
        }
        custom.files.insert(file.to_string(), data);
        true
    }

    /// Custom file data, or the rendered template.
    pub fn get_service_file(&self, node: &Node, name: &str, file: &str) -> Option<String> {
        let key = (node.id, name.to_string());
        if let Some(data) = self.custom.get(&key).and_then(|c| c.files.get(file)) {
            return Some(data.clone());
        }
        let spec = self.get_service(node.id, name)?;
        if !spec.configs.iter().any(|config| config == file) {
            return None;
        }
        Some(render_template(
            spec.templates.get(file).map(String::as_str).unwrap_or(""),
            node,
        ))
    }

    /// Every configured file of a service on a node with its content.
    pub fn service_files(&self, node: &Node, name: &str) -> Vec<(String, String)> {
        let Some(spec) = self.get_service(node.id, name) else {
            return Vec::new();
        };
        spec.configs
            .iter()
            .filter_map(|file| {
                self.get_service_file(node, name, file)
                    .map(|data| (file.clone(), data))
            })
            .collect()
    }

    pub fn custom_services(&self) -> impl Iterator<Item = &CustomService> {
        self.custom.values()
    }

    pub fn restore_custom(&mut self, custom: CustomService) {
        self.custom
            .insert((custom.node_id, custom.spec.name.clone()), custom);
    }

    pub fn remove_node(&mut self, node_id: NodeId) {
        self.custom.retain(|(node, _), _| *node != node_id);
    }

    pub fn reset(&mut self) {
        self.custom.clear();
    }

    /// Runs `action` for a service assigned to `node`. Success means every
    /// command exited with status 0; restart only starts when stop did.
    pub async fn run_action(
        &self,
        node: &Node,
        name: &str,
        action: ServiceAction,
        runner: &dyn ServiceRunner,
        cwd: &Path,
    ) -> bool {
        if !node.services.iter().any(|service| service == name) {
            return false;
        }
        let Some(spec) = self.get_service(node.id, name) else {
            return false;
        };
        let status = match action {
            ServiceAction::Start => run_commands(runner, cwd, &spec.startup).await,
            ServiceAction::Stop => run_commands(runner, cwd, &spec.shutdown).await,
            ServiceAction::Validate => run_commands(runner, cwd, &spec.validate).await,
            ServiceAction::Restart => {
                let status = run_commands(runner, cwd, &spec.shutdown).await;
                if status == 0 {
                    run_commands(runner, cwd, &spec.startup).await
                } else {
                    status
                }
            }
        };
        info!(node_id = node.id, service = name, ?action, status, "service action");
        status == 0
    }
}

/// Runs commands in order, stopping at the first non-zero status.
async fn run_commands(runner: &dyn ServiceRunner, cwd: &Path, commands: &[String]) -> i32 {
    for command in commands {
        let status = match runner.run(cwd, command).await {
            Ok(status) => status,
            Err(err) => {
                warn!(command = %command, "command failed: {:#}", err);
                -1
            }
        };
        if status != 0 {
            return status;
        }
    }
    0
}

pub fn render_template(template: &str, node: &Node) -> String {
    template
        .replace("{node_name}", &node.name)
        .replace("{node_id}", &node.id.to_string())
}

/// Legacy `key=value|...` payload describing a service.
pub fn service_config_values(spec: &ServiceSpec) -> String {
    let list = |items: &[String]| format!("({})", items.join(","));
    [
        format!("executables={}", list(&spec.executables)),
        format!("dependencies={}", list(&spec.dependencies)),
        format!("dirs={}", list(&spec.dirs)),
        format!("configs={}", list(&spec.configs)),
        format!("startup={}", list(&spec.startup)),
        format!("validate={}", list(&spec.validate)),
        format!("shutdown={}", list(&spec.shutdown)),
        format!("meta={}", spec.meta.as_deref().unwrap_or("")),
    ]
    .join("|")
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
