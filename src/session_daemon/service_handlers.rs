//! Service catalogue, defaults and per-node service calls.

use crate::emulator::registry::SessionRegistry;
use crate::emulator::services::ServiceAction;
use crate::emulator::translate::service_to_wire;
use crate::rpc::wire::{NodeServiceData, NodeServiceUpdate, ServiceDefaults, ServiceSummary};
use crate::rpc::{ApiError, ApiResult};
use crate::session_daemon::rpc_server::{find_session, require_node};
use tracing::{info, warn};

pub async fn get_services(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<ServiceSummary>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    Ok(inner
        .services()
        .catalogue()
        .map(|spec| ServiceSummary {
            group: spec.group.clone(),
            name: spec.name.clone(),
        })
        .collect())
}

pub async fn get_service_defaults(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<ServiceDefaults>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    Ok(inner
        .services()
        .defaults()
        .iter()
        .map(|(node_type, services)| ServiceDefaults {
            node_type: node_type.clone(),
            services: services.clone(),
        })
        .collect())
}

pub async fn set_service_defaults(
    registry: &SessionRegistry,
    session_id: u32,
    defaults: Vec<ServiceDefaults>,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let defaults = defaults
        .into_iter()
        .map(|entry| (entry.node_type, entry.services))
        .collect();
    session.lock().await.services_mut().set_defaults(defaults);
    info!(session_id, "service defaults replaced");
    Ok(true)
}

pub async fn get_node_service(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    service: String,
) -> ApiResult<NodeServiceData> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    inner
        .services()
        .get_service(node_id, &service)
        .map(service_to_wire)
        .ok_or_else(|| ApiError::InvalidRequest {
            message: format!("unknown service {}", service),
        })
}

pub async fn get_node_service_file(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    service: String,
    file: String,
) -> ApiResult<String> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    let node = require_node(&inner, node_id)?;
    if !node.services.contains(&service) {
        return Ok(String::new());
    }
    Ok(inner
        .services()
        .get_service_file(node, &service, &file)
        .unwrap_or_default())
}

pub async fn set_node_service(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    update: NodeServiceUpdate,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    require_node(&inner, node_id)?;
    let stored = inner.services_mut().set_service(
        node_id,
        &update.service,
        update.startup,
        update.validate,
        update.shutdown,
    );
    if !stored {
        warn!(session_id, node_id, service = %update.service, "unknown service");
    }
    Ok(stored)
}

pub async fn set_node_service_file(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    service: String,
    file: String,
    data: String,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    require_node(&inner, node_id)?;
    let stored = inner
        .services_mut()
        .set_service_file(node_id, &service, &file, data);
    Ok(stored)
}

pub async fn service_action(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    service: String,
    action: u32,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    require_node(&inner, node_id)?;
    let Some(action) = ServiceAction::from_code(action) else {
        warn!(session_id, node_id, action, "unknown service action");
        return Ok(false);
    };
    Ok(inner.service_action(node_id, &service, action).await)
}
