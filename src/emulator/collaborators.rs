//! Narrow interfaces to the parts of the system that touch the host:
//! materialising a topology, and running service and hook commands.

use crate::emulator::models::MobilityAction;
use crate::emulator::node::NodeId;
use crate::emulator::scenario::{JsonScenarioCodec, ScenarioCodec};
use crate::emulator::topology::Topology;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Upper bound for a single service or hook command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// What a lifecycle side effect gets to see of its session.
pub struct EmulationContext<'a> {
    pub session_id: u32,
    pub workspace: &'a Path,
    pub topology: &'a Topology,
}

/// Turns a session's topology into (or out of) a running emulation.
#[async_trait]
pub trait Emulator: Send + Sync {
    async fn instantiate(&self, ctx: &EmulationContext<'_>) -> Result<()>;
    async fn shutdown(&self, ctx: &EmulationContext<'_>) -> Result<()>;
    async fn data_collect(&self, ctx: &EmulationContext<'_>) -> Result<()>;
    async fn mobility_action(
        &self,
        session_id: u32,
        node_id: NodeId,
        action: MobilityAction,
    ) -> Result<()>;
}

/// Runs one shell command and reports its exit status.
#[async_trait]
pub trait ServiceRunner: Send + Sync {
    async fn run(&self, cwd: &Path, command: &str) -> Result<i32>;
}

/// Emulator that only records what it would do in the log. Used when the
/// daemon runs without a host emulation backend.
#[derive(Debug, Default)]
pub struct DryRunEmulator;

#[async_trait]
impl Emulator for DryRunEmulator {
    async fn instantiate(&self, ctx: &EmulationContext<'_>) -> Result<()> {
        info!(
            session_id = ctx.session_id,
            nodes = ctx.topology.node_count(),
            links = ctx.topology.link_count(),
            workspace = %ctx.workspace.display(),
            "instantiate"
        );
        Ok(())
    }

    async fn shutdown(&self, ctx: &EmulationContext<'_>) -> Result<()> {
        info!(session_id = ctx.session_id, "shutdown");
        Ok(())
    }

    async fn data_collect(&self, ctx: &EmulationContext<'_>) -> Result<()> {
        info!(session_id = ctx.session_id, "data collect");
        Ok(())
    }

    async fn mobility_action(
        &self,
        session_id: u32,
        node_id: NodeId,
        action: MobilityAction,
    ) -> Result<()> {
        info!(session_id, node_id, ?action, "mobility action");
        Ok(())
    }
}

/// Runs commands through `sh -c` in the given directory.
#[derive(Debug, Default)]
pub struct ShellServiceRunner;

#[async_trait]
impl ServiceRunner for ShellServiceRunner {
    async fn run(&self, cwd: &Path, command: &str) -> Result<i32> {
        debug!(cwd = %cwd.display(), command, "running command");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", command))?;

        match tokio::time::timeout(COMMAND_TIMEOUT, child.wait()).await {
            Ok(status) => {
                let status = status.with_context(|| format!("failed to wait for '{}'", command))?;
                Ok(status.code().unwrap_or(-1))
            }
            Err(_) => {
                warn!(command, "command timed out");
                Ok(-1)
            }
        }
    }
}

/// The external collaborators a session drives.
#[derive(Clone)]
pub struct Collaborators {
    pub emulator: Arc<dyn Emulator>,
    pub runner: Arc<dyn ServiceRunner>,
    pub codec: Arc<dyn ScenarioCodec>,
}

impl Collaborators {
    /// Collaborators used by the daemon binary.
    pub fn host() -> Self {
        Self {
            emulator: Arc::new(DryRunEmulator),
            runner: Arc::new(ShellServiceRunner),
            codec: Arc::new(JsonScenarioCodec),
        }
    }
}
