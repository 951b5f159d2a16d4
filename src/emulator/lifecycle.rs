//! Session lifecycle: state codes, transitions and their side effects.
//!
//! Side effects fire on every call, including a repeated call for the state
//! the session is already in.

use crate::emulator::collaborators::EmulationContext;
use crate::emulator::events::{unix_now, DomainEvent, EventData, ExceptionLevel};
use crate::emulator::session::SessionInner;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Definition,
    Configuration,
    Instantiation,
    Runtime,
    DataCollect,
    Shutdown,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::Definition,
        SessionState::Configuration,
        SessionState::Instantiation,
        SessionState::Runtime,
        SessionState::DataCollect,
        SessionState::Shutdown,
    ];

    pub fn code(self) -> u32 {
        match self {
            SessionState::Definition => 1,
            SessionState::Configuration => 2,
            SessionState::Instantiation => 3,
            SessionState::Runtime => 4,
            SessionState::DataCollect => 5,
            SessionState::Shutdown => 6,
        }
    }

    pub fn from_code(code: u32) -> Result<Self, InvalidState> {
        Self::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or(InvalidState(code))
    }

    pub fn name(self) -> &'static str {
        match self {
            SessionState::Definition => "DEFINITION_STATE",
            SessionState::Configuration => "CONFIGURATION_STATE",
            SessionState::Instantiation => "INSTANTIATION_STATE",
            SessionState::Runtime => "RUNTIME_STATE",
            SessionState::DataCollect => "DATACOLLECT_STATE",
            SessionState::Shutdown => "SHUTDOWN_STATE",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidState(pub u32);

impl fmt::Display for InvalidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session state code: {}", self.0)
    }
}

impl std::error::Error for InvalidState {}

/// Script run when the session enters `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub state: SessionState,
    pub file: String,
    pub data: String,
}

impl SessionInner {
    /// Creates the session workspace if missing. Safe to call repeatedly.
    pub fn ensure_workspace(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.workspace).with_context(|| {
            format!(
                "failed to create session workspace {}",
                self.workspace.display()
            )
        })?;
        Ok(&self.workspace)
    }

    /// Transition by wire code. Unknown codes change nothing.
    pub async fn set_state_code(&mut self, code: u32) -> Result<bool, InvalidState> {
        let state = SessionState::from_code(code)?;
        Ok(self.set_state(state).await)
    }

    /// Enters `state` and runs its side effect. Returns false when the side
    /// effect failed; the failure is also published as an exception event.
    pub async fn set_state(&mut self, state: SessionState) -> bool {
        info!(session_id = self.id, %state, "state transition");
        match state {
            SessionState::Instantiation => {
                if let Err(err) = self.ensure_workspace() {
                    self.publish_exception(ExceptionLevel::Fatal, None, format!("{:#}", err));
                    return false;
                }
                self.enter(SessionState::Instantiation).await;
                let emulator = self.collab.emulator.clone();
                let result = emulator.instantiate(&self.context()).await;
                if !self.side_effect_ok("instantiate", result) {
                    return false;
                }
                self.enter(SessionState::Runtime).await;
                true
            }
            SessionState::Shutdown => {
                self.enter(SessionState::Shutdown).await;
                let emulator = self.collab.emulator.clone();
                let result = emulator.shutdown(&self.context()).await;
                self.side_effect_ok("shutdown", result)
            }
            SessionState::DataCollect => {
                self.enter(SessionState::DataCollect).await;
                let emulator = self.collab.emulator.clone();
                let result = emulator.data_collect(&self.context()).await;
                self.side_effect_ok("data collect", result)
            }
            SessionState::Definition => {
                self.clear();
                self.enter(SessionState::Definition).await;
                true
            }
            SessionState::Configuration | SessionState::Runtime => {
                self.enter(state).await;
                true
            }
        }
    }

    /// Shuts the session down for good and removes its workspace unless it
    /// is preserved.
    pub async fn teardown(&mut self) {
        if self.state != SessionState::Shutdown {
            self.set_state(SessionState::Shutdown).await;
        }
        let preserve = self.preserve_workspace
            || self.options().get("preservedir").map(String::as_str) == Some("1");
        if preserve || !self.workspace.exists() {
            return;
        }
        if let Err(err) = tokio::fs::remove_dir_all(&self.workspace).await {
            warn!(session_id = self.id, "failed to remove workspace: {}", err);
        }
    }

    /// Empties the graph and every per-node configuration.
    fn clear(&mut self) {
        self.topology.clear();
        self.mobility.reset();
        self.emane.reset();
        self.services.reset();
    }

    fn context(&self) -> EmulationContext<'_> {
        EmulationContext {
            session_id: self.id,
            workspace: &self.workspace,
            topology: &self.topology,
        }
    }

    fn side_effect_ok(&self, what: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.publish_exception(
                    ExceptionLevel::Error,
                    None,
                    format!("{} failed: {:#}", what, err),
                );
                false
            }
        }
    }

    async fn enter(&mut self, state: SessionState) {
        self.state = state;
        self.publish(DomainEvent::Session(EventData {
            node: None,
            event_type: state.code(),
            name: Some(state.name().to_string()),
            data: None,
            time: Some(unix_now()),
        }));
        self.run_hooks(state).await;
    }

    async fn run_hooks(&self, state: SessionState) {
        let Some(hooks) = self.hooks.get(&state) else {
            return;
        };
        if hooks.is_empty() {
            return;
        }
        let workspace = match self.ensure_workspace() {
            Ok(workspace) => workspace.to_path_buf(),
            Err(err) => {
                self.publish_exception(ExceptionLevel::Error, None, format!("{:#}", err));
                return;
            }
        };
        let runner = self.collab.runner.clone();
        for hook in hooks {
            let Some(file_name) = Path::new(&hook.file).file_name() else {
                warn!(file = %hook.file, "skipping hook without a file name");
                continue;
            };
            let path = workspace.join(file_name);
            if let Err(err) = tokio::fs::write(&path, &hook.data).await {
                self.publish_exception(
                    ExceptionLevel::Error,
                    None,
                    format!("failed to write hook {}: {}", path.display(), err),
                );
                continue;
            }
            let command = format!("sh {}", file_name.to_string_lossy());
            let status = runner.run(&workspace, &command).await.unwrap_or(-1);
            if status != 0 {
                self.publish_exception(
                    ExceptionLevel::Warning,
                    None,
                    format!("hook {} exited with status {}", hook.file, status),
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
