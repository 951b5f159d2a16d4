//! Node, link and hook calls.

use crate::emulator::events::MessageFlag;
use crate::emulator::link::{LinkKey, LinkType};
use crate::emulator::node::NodeType;
use crate::emulator::registry::SessionRegistry;
use crate::emulator::topology::TopologyError;
use crate::emulator::translate::{
    hook_from_wire, hook_to_wire, interface_from_wire, interface_to_wire, link_data,
    link_options_from_wire, link_to_wire, node_data, node_options_from_wire, node_to_wire,
    position_from_wire,
};
use crate::rpc::wire::{
    Hook, Link, LinkOptions as WireLinkOptions, LinkSelector, NewNode, NodeDetails, Position,
};
use crate::rpc::{ApiError, ApiResult};
use crate::session_daemon::rpc_server::{find_session, require_node};
use tracing::{info, warn};

fn selector_key(selector: &LinkSelector) -> LinkKey {
    LinkKey::new(
        selector.node_one,
        selector.interface_one,
        selector.node_two,
        selector.interface_two,
    )
}

fn topology_error(session_id: u32, err: TopologyError) -> ApiError {
    match err {
        TopologyError::UnknownNode(node_id) => ApiError::NodeNotFound {
            session_id,
            node_id,
        },
        other => other.into(),
    }
}

pub async fn create_node(
    registry: &SessionRegistry,
    session_id: u32,
    node: NewNode,
) -> ApiResult<u32> {
    let session = find_session(registry, session_id).await?;
    let node_type = NodeType::from_code(node.node_type).ok_or_else(|| ApiError::InvalidRequest {
        message: format!("unknown node type {}", node.node_type),
    })?;
    let options = node_options_from_wire(&node);
    let node_id = session
        .lock()
        .await
        .add_node(node_type, node.id, options)
        .map_err(ApiError::from)?;
    info!(session_id, node_id, ?node_type, "node created");
    Ok(node_id)
}

pub async fn get_node(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
) -> ApiResult<NodeDetails> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    let node = require_node(&inner, node_id)?;
    Ok(NodeDetails {
        node: node_to_wire(&node_data(node, MessageFlag::None)),
        interfaces: node.interfaces.values().map(interface_to_wire).collect(),
    })
}

pub async fn edit_node(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    position: Position,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let (canvas, geo) = position_from_wire(&position);
    if !session.lock().await.edit_node(node_id, Some(canvas), geo) {
        return Err(ApiError::NodeNotFound {
            session_id,
            node_id,
        });
    }
    Ok(true)
}

pub async fn delete_node(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let deleted = session.lock().await.delete_node(node_id);
    info!(session_id, node_id, deleted, "node delete");
    Ok(deleted)
}

pub async fn get_node_links(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
) -> ApiResult<Vec<Link>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    require_node(&inner, node_id)?;
    let topology = inner.topology();
    Ok(topology
        .node_links(node_id)
        .map(|link| link_to_wire(&link_data(topology, link, MessageFlag::None)))
        .collect())
}

pub async fn create_link(
    registry: &SessionRegistry,
    session_id: u32,
    link: Link,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let link_type = LinkType::from_code(link.link_type).ok_or_else(|| ApiError::InvalidRequest {
        message: format!("unknown link type {}", link.link_type),
    })?;
    let options = link
        .options
        .as_ref()
        .map(link_options_from_wire)
        .unwrap_or_default();
    session
        .lock()
        .await
        .add_link(
            link.node_one,
            link.node_two,
            link.interface_one.as_ref().map(interface_from_wire),
            link.interface_two.as_ref().map(interface_from_wire),
            link_type,
            options,
        )
        .map_err(|err| topology_error(session_id, err))?;
    info!(session_id, link.node_one, link.node_two, "link created");
    Ok(true)
}

pub async fn edit_link(
    registry: &SessionRegistry,
    session_id: u32,
    selector: LinkSelector,
    options: WireLinkOptions,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let options = link_options_from_wire(&options);
    let edited = session
        .lock()
        .await
        .edit_link(&selector_key(&selector), &options);
    Ok(edited)
}

pub async fn delete_link(
    registry: &SessionRegistry,
    session_id: u32,
    selector: LinkSelector,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let deleted = session.lock().await.delete_link(&selector_key(&selector));
    info!(session_id, selector.node_one, selector.node_two, deleted, "link delete");
    Ok(deleted)
}

pub async fn get_hooks(registry: &SessionRegistry, session_id: u32) -> ApiResult<Vec<Hook>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    Ok(inner.hooks().map(hook_to_wire).collect())
}

pub async fn add_hook(registry: &SessionRegistry, session_id: u32, hook: Hook) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    match hook_from_wire(&hook) {
        Ok(hook) => {
            session.lock().await.add_hook(hook);
            Ok(true)
        }
        Err(err) => {
            warn!(session_id, file = %hook.file, "hook rejected: {}", err);
            Ok(false)
        }
    }
}

#[cfg(test)]
#[path = "tests/topology_handlers_tests.rs"]
mod tests;
