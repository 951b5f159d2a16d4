//! Process-wide table of live sessions.

use crate::emulator::collaborators::Collaborators;
use crate::emulator::session::{Location, Session, SessionSettings};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Builds new sessions with the daemon-wide defaults.
#[derive(Clone)]
pub struct SessionFactory {
    pub workspace_root: PathBuf,
    pub preserve_workspaces: bool,
    pub default_location: Location,
    pub collaborators: Collaborators,
}

impl SessionFactory {
    fn build(&self, id: u32) -> Session {
        let settings = SessionSettings {
            workspace: self.workspace_root.join(format!("netemu-session-{}", id)),
            preserve_workspace: self.preserve_workspaces,
            location: self.default_location,
        };
        Session::new(id, settings, self.collaborators.clone())
    }
}

/// Owns every session by id. Ids are never reused within a process.
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<u32, Arc<Session>>>,
    next_id: AtomicU32,
    factory: SessionFactory,
}

impl SessionRegistry {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            sessions: Mutex::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
            factory,
        }
    }

    /// Creates a session in the Definition state.
    pub async fn create(&self) -> Arc<Session> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(self.factory.build(id));
        self.sessions.lock().await.insert(id, session.clone());
        info!(session_id = id, "session created");
        session
    }

    pub async fn get(&self, id: u32) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Sessions ordered by id.
    pub async fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().await.values().cloned().collect()
    }

    /// Removes a session and tears it down. False when it did not exist.
    pub async fn delete(&self, id: u32) -> bool {
        let removed = self.sessions.lock().await.remove(&id);
        let Some(session) = removed else {
            return false;
        };
        session.lock().await.teardown().await;
        session.hub().close();
        info!(session_id = id, "session deleted");
        true
    }

    /// Tears down every session. Used when the daemon stops.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<Session>> = {
            let mut map = self.sessions.lock().await;
            std::mem::take(&mut *map).into_values().collect()
        };
        for session in sessions {
            session.lock().await.teardown().await;
            session.hub().close();
        }
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
