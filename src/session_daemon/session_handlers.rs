//! Session lifecycle, snapshot and scenario calls.

use crate::emulator::events::MessageFlag;
use crate::emulator::lifecycle::{InvalidState, SessionState};
use crate::emulator::registry::SessionRegistry;
use crate::emulator::session::Session;
use crate::emulator::translate::{
    link_data, link_to_wire, location_from_wire, location_to_wire, node_data, node_to_wire,
};
use crate::rpc::wire::{OpenResult, SessionLocation, SessionSnapshot, SessionSummary};
use crate::rpc::{ApiError, ApiResult};
use crate::session_daemon::rpc_server::find_session;
use tracing::{debug, info, warn};

async fn summary(session: &Session) -> SessionSummary {
    let inner = session.lock().await;
    SessionSummary {
        id: session.id(),
        state: inner.state().code(),
        nodes: inner.topology().node_count() as u32,
    }
}

pub async fn create_session(registry: &SessionRegistry) -> SessionSummary {
    let session = registry.create().await;
    summary(&session).await
}

pub async fn delete_session(registry: &SessionRegistry, session_id: u32) -> bool {
    let deleted = registry.delete(session_id).await;
    if !deleted {
        debug!(session_id, "delete of unknown session");
    }
    deleted
}

pub async fn get_sessions(registry: &SessionRegistry) -> Vec<SessionSummary> {
    let mut summaries = Vec::new();
    for session in registry.list().await {
        summaries.push(summary(&session).await);
    }
    summaries
}

pub async fn get_session(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<SessionSnapshot> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    let topology = inner.topology();
    Ok(SessionSnapshot {
        state: inner.state().code(),
        nodes: topology
            .nodes()
            .map(|node| node_to_wire(&node_data(node, MessageFlag::None)))
            .collect(),
        links: topology
            .links()
            .iter()
            .map(|link| link_to_wire(&link_data(topology, link, MessageFlag::None)))
            .collect(),
    })
}

pub async fn get_session_location(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<SessionLocation> {
    let session = find_session(registry, session_id).await?;
    let location = session.lock().await.location();
    Ok(location_to_wire(&location))
}

pub async fn set_session_location(
    registry: &SessionRegistry,
    session_id: u32,
    location: SessionLocation,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    let updated = location_from_wire(&location, &inner.location());
    inner.set_location(updated);
    Ok(true)
}

pub async fn set_session_state(
    registry: &SessionRegistry,
    session_id: u32,
    state: u32,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    match inner.set_state_code(state).await {
        Ok(result) => {
            info!(session_id, state, result, "state change requested");
            Ok(result)
        }
        Err(InvalidState(code)) => {
            warn!(session_id, code, "rejected unknown session state");
            Ok(false)
        }
    }
}

pub async fn save_scenario(registry: &SessionRegistry, session_id: u32) -> ApiResult<String> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    let codec = inner.collab.codec.clone();
    codec
        .encode(&inner.export_scenario())
        .map_err(|err| ApiError::Internal {
            message: format!("{:#}", err),
        })
}

/// Loads `data` into a fresh session and instantiates it. Any failure
/// discards the new session.
pub async fn open_scenario(registry: &SessionRegistry, data: String) -> OpenResult {
    let session = registry.create().await;
    let session_id = session.id();
    let opened = {
        let mut inner = session.lock().await;
        inner.set_state(SessionState::Configuration).await;
        let codec = inner.collab.codec.clone();
        let loaded = codec
            .decode(&data)
            .and_then(|document| inner.import_scenario(document));
        match loaded {
            Ok(()) => inner.set_state(SessionState::Instantiation).await,
            Err(err) => {
                warn!(session_id, "scenario rejected: {:#}", err);
                false
            }
        }
    };

    if !opened {
        registry.delete(session_id).await;
        return OpenResult {
            result: false,
            session_id: 0,
        };
    }
    info!(session_id, "scenario opened");
    OpenResult {
        result: true,
        session_id,
    }
}
