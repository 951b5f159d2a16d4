//! Session options, metadata, mobility and EMANE configuration calls.

use crate::emulator::configurable::{build_groups, ConfigSchema};
use crate::emulator::models::{
    is_emane_model_name, MobilityAction, ModelConfigStore, ModelValues, NodeModelConfig,
    BASIC_RANGE, NS2_SCRIPT,
};
use crate::emulator::registry::SessionRegistry;
use crate::emulator::translate::groups_to_wire;
use crate::rpc::wire::{ConfigGroup, ConfigMap, ModelConfig};
use crate::rpc::{ApiError, ApiResult};
use crate::session_daemon::rpc_server::{find_session, require_node};
use tracing::{info, warn};

fn groups(values: &ModelValues, schema: &ConfigSchema) -> Vec<ConfigGroup> {
    groups_to_wire(build_groups(values, schema))
}

/// Display groups of `model` on `node`, defaults when unset.
fn model_groups(
    store: &ModelConfigStore,
    node_id: u32,
    model: &str,
) -> ApiResult<Vec<ConfigGroup>> {
    match (store.get_model_config(node_id, model), store.schema(model)) {
        (Some(values), Some(schema)) => Ok(groups(&values, schema)),
        _ => Err(ApiError::InvalidRequest {
            message: format!("unknown {} model {}", store.name(), model),
        }),
    }
}

fn model_configs<'a>(
    store: &'a ModelConfigStore,
    configs: impl Iterator<Item = NodeModelConfig> + 'a,
) -> impl Iterator<Item = ModelConfig> + 'a {
    configs.filter_map(move |config| {
        let schema = store.schema(&config.model)?;
        Some(ModelConfig {
            node_id: config.node_id,
            groups: groups(&config.values, schema),
            model: config.model,
        })
    })
}

fn set_model(
    store: &mut ModelConfigStore,
    session_id: u32,
    node_id: u32,
    model: &str,
    config: ConfigMap,
) -> bool {
    match store.set_model_config(node_id, model, config) {
        Ok(()) => {
            info!(session_id, node_id, model, "model config updated");
            true
        }
        Err(err) => {
            warn!(session_id, node_id, model, "model config rejected: {}", err);
            false
        }
    }
}

pub async fn get_session_options(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<ConfigGroup>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    Ok(groups(&inner.options(), inner.options_schema()))
}

pub async fn set_session_options(
    registry: &SessionRegistry,
    session_id: u32,
    config: ConfigMap,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    let applied = match inner.set_options(config) {
        Ok(()) => true,
        Err(err) => {
            warn!(session_id, "session options rejected: {}", err);
            false
        }
    };
    Ok(applied)
}

pub async fn get_session_metadata(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<ConfigMap> {
    let session = find_session(registry, session_id).await?;
    let metadata = session.lock().await.metadata().clone();
    Ok(metadata)
}

pub async fn set_session_metadata(
    registry: &SessionRegistry,
    session_id: u32,
    config: ConfigMap,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    session.lock().await.set_metadata(config);
    Ok(true)
}

pub async fn get_mobility_configs(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<ModelConfig>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    let store = inner.mobility();
    let scripted = store
        .all_configs()
        .into_iter()
        .filter(|config| config.model == NS2_SCRIPT);
    Ok(model_configs(store, scripted).collect())
}

pub async fn get_mobility_config(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
) -> ApiResult<Vec<ConfigGroup>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    model_groups(inner.mobility(), node_id, NS2_SCRIPT)
}

pub async fn set_mobility_config(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    config: ConfigMap,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    require_node(&inner, node_id)?;
    Ok(set_model(inner.mobility_mut(), session_id, node_id, NS2_SCRIPT, config))
}

pub async fn mobility_action(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    action: u32,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    require_node(&inner, node_id)?;
    let Some(action) = MobilityAction::from_code(action) else {
        warn!(session_id, node_id, action, "unknown mobility action");
        return Ok(false);
    };
    Ok(inner.mobility_action(node_id, action).await)
}

pub async fn get_wlan_config(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
) -> ApiResult<Vec<ConfigGroup>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    model_groups(inner.mobility(), node_id, BASIC_RANGE)
}

pub async fn set_wlan_config(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    config: ConfigMap,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    require_node(&inner, node_id)?;
    Ok(set_model(inner.mobility_mut(), session_id, node_id, BASIC_RANGE, config))
}

pub async fn get_emane_config(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<ConfigGroup>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    Ok(groups(&inner.emane_config(), inner.emane_schema()))
}

pub async fn set_emane_config(
    registry: &SessionRegistry,
    session_id: u32,
    config: ConfigMap,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    let applied = match inner.set_emane_config(config) {
        Ok(()) => true,
        Err(err) => {
            warn!(session_id, "emane config rejected: {}", err);
            false
        }
    };
    Ok(applied)
}

pub async fn get_emane_models(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<String>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    Ok(inner
        .emane()
        .model_names()
        .filter(|name| is_emane_model_name(name))
        .map(str::to_string)
        .collect())
}

pub async fn get_emane_model_config(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    model: String,
) -> ApiResult<Vec<ConfigGroup>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    model_groups(inner.emane(), node_id, &model)
}

pub async fn set_emane_model_config(
    registry: &SessionRegistry,
    session_id: u32,
    node_id: u32,
    model: String,
    config: ConfigMap,
) -> ApiResult<bool> {
    let session = find_session(registry, session_id).await?;
    let mut inner = session.lock().await;
    require_node(&inner, node_id)?;
    Ok(set_model(inner.emane_mut(), session_id, node_id, &model, config))
}

pub async fn get_emane_model_configs(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Vec<ModelConfig>> {
    let session = find_session(registry, session_id).await?;
    let inner = session.lock().await;
    let store = inner.emane();
    Ok(model_configs(store, store.all_configs().into_iter()).collect())
}
