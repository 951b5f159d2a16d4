//! Recording fakes for the host-facing collaborators.

use crate::emulator::collaborators::{Collaborators, EmulationContext, Emulator, ServiceRunner};
use crate::emulator::models::MobilityAction;
use crate::emulator::node::NodeId;
use crate::emulator::scenario::JsonScenarioCodec;
use crate::emulator::session::{Location, Session, SessionSettings};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct RecordingEmulator {
    pub instantiated: AtomicUsize,
    pub shut_down: AtomicUsize,
    pub collected: AtomicUsize,
    pub fail_instantiate: AtomicBool,
    pub mobility: Mutex<Vec<(u32, NodeId, MobilityAction)>>,
    /// Node count seen by the last instantiate call.
    pub last_node_count: AtomicUsize,
}

impl RecordingEmulator {
    pub fn instantiate_count(&self) -> usize {
        self.instantiated.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn collect_count(&self) -> usize {
        self.collected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Emulator for RecordingEmulator {
    async fn instantiate(&self, ctx: &EmulationContext<'_>) -> Result<()> {
        self.instantiated.fetch_add(1, Ordering::SeqCst);
        self.last_node_count
            .store(ctx.topology.node_count(), Ordering::SeqCst);
        if self.fail_instantiate.load(Ordering::SeqCst) {
            bail!("instantiate failed");
        }
        Ok(())
    }

    async fn shutdown(&self, _ctx: &EmulationContext<'_>) -> Result<()> {
        self.shut_down.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn data_collect(&self, _ctx: &EmulationContext<'_>) -> Result<()> {
        self.collected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mobility_action(
        &self,
        session_id: u32,
        node_id: NodeId,
        action: MobilityAction,
    ) -> Result<()> {
        self.mobility
            .lock()
            .unwrap()
            .push((session_id, node_id, action));
        Ok(())
    }
}

/// Runner returning scripted exit statuses per command (0 by default) and
/// recording every command it was asked to run.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    pub statuses: Mutex<BTreeMap<String, i32>>,
    pub commands: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn with_status(self, command: &str, status: i32) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(command.to_string(), status);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceRunner for ScriptedRunner {
    async fn run(&self, _cwd: &Path, command: &str) -> Result<i32> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(command)
            .copied()
            .unwrap_or(0))
    }
}

pub struct FakeCollaborators {
    pub emulator: Arc<RecordingEmulator>,
    pub runner: Arc<ScriptedRunner>,
}

impl Default for FakeCollaborators {
    fn default() -> Self {
        Self::with_runner(ScriptedRunner::default())
    }
}

impl FakeCollaborators {
    pub fn with_runner(runner: ScriptedRunner) -> Self {
        Self {
            emulator: Arc::new(RecordingEmulator::default()),
            runner: Arc::new(runner),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            emulator: self.emulator.clone(),
            runner: self.runner.clone(),
            codec: Arc::new(JsonScenarioCodec),
        }
    }
}

/// Session 1 with its workspace under `root`.
pub fn test_session(root: &Path, fakes: &FakeCollaborators) -> Session {
    Session::new(
        1,
        SessionSettings {
            workspace: root.join("session-1"),
            preserve_workspace: false,
            location: Location::default(),
        },
        fakes.collaborators(),
    )
}
