//! RPC server implementation for the emulation daemon.
//!
//! Implements the tarpc `CoreApi` trait by delegating to the handler
//! modules, and runs the API and event stream listeners.

use crate::config::DaemonConfig;
use crate::emulator::collaborators::Collaborators;
use crate::emulator::node::Node;
use crate::emulator::registry::{SessionFactory, SessionRegistry};
use crate::emulator::session::{Session, SessionInner};
use crate::rpc::api_service::CoreApi;
use crate::rpc::wire::{
    ConfigGroup, ConfigMap, Hook, Link, LinkOptions, LinkSelector, ModelConfig, NewNode,
    NodeDetails, NodeServiceData, NodeServiceUpdate, OpenResult, Position, ServiceDefaults,
    ServiceSummary, SessionLocation, SessionSnapshot, SessionSummary,
};
use crate::rpc::{ApiError, ApiResult};
use crate::session_daemon::event_stream::run_stream_listener;
use crate::session_daemon::{config_handlers, service_handlers, session_handlers, topology_handlers};
use crate::version::BUILD_SHA;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tarpc::context::Context;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Bincode;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Looks a session up, failing the call when it does not exist.
pub(crate) async fn find_session(
    registry: &SessionRegistry,
    session_id: u32,
) -> ApiResult<Arc<Session>> {
    registry
        .get(session_id)
        .await
        .ok_or(ApiError::SessionNotFound { session_id })
}

pub(crate) fn require_node(inner: &SessionInner, node_id: u32) -> ApiResult<&Node> {
    inner
        .topology()
        .node(node_id)
        .ok_or(ApiError::NodeNotFound {
            session_id: inner.id(),
            node_id,
        })
}

/// Server implementation for CoreApi. One clone per connection.
#[derive(Clone)]
pub struct ApiServer {
    registry: Arc<SessionRegistry>,
}

impl ApiServer {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

impl CoreApi for ApiServer {
    async fn create_session(self, _: Context) -> SessionSummary {
        session_handlers::create_session(&self.registry).await
    }

    async fn delete_session(self, _: Context, session_id: u32) -> bool {
        session_handlers::delete_session(&self.registry, session_id).await
    }

    async fn get_sessions(self, _: Context) -> Vec<SessionSummary> {
        session_handlers::get_sessions(&self.registry).await
    }

    async fn get_session(self, _: Context, session_id: u32) -> ApiResult<SessionSnapshot> {
        session_handlers::get_session(&self.registry, session_id).await
    }

    async fn get_session_location(self, _: Context, session_id: u32) -> ApiResult<SessionLocation> {
        session_handlers::get_session_location(&self.registry, session_id).await
    }

    async fn set_session_location(
        self,
        _: Context,
        session_id: u32,
        location: SessionLocation,
    ) -> ApiResult<bool> {
        session_handlers::set_session_location(&self.registry, session_id, location).await
    }

    async fn set_session_state(self, _: Context, session_id: u32, state: u32) -> ApiResult<bool> {
        session_handlers::set_session_state(&self.registry, session_id, state).await
    }

    async fn get_session_options(self, _: Context, session_id: u32) -> ApiResult<Vec<ConfigGroup>> {
        config_handlers::get_session_options(&self.registry, session_id).await
    }

    async fn set_session_options(
        self,
        _: Context,
        session_id: u32,
        config: ConfigMap,
    ) -> ApiResult<bool> {
        config_handlers::set_session_options(&self.registry, session_id, config).await
    }

    async fn get_session_metadata(self, _: Context, session_id: u32) -> ApiResult<ConfigMap> {
        config_handlers::get_session_metadata(&self.registry, session_id).await
    }

    async fn set_session_metadata(
        self,
        _: Context,
        session_id: u32,
        config: ConfigMap,
    ) -> ApiResult<bool> {
        config_handlers::set_session_metadata(&self.registry, session_id, config).await
    }

    async fn create_node(self, _: Context, session_id: u32, node: NewNode) -> ApiResult<u32> {
        topology_handlers::create_node(&self.registry, session_id, node).await
    }

    async fn get_node(self, _: Context, session_id: u32, node_id: u32) -> ApiResult<NodeDetails> {
        topology_handlers::get_node(&self.registry, session_id, node_id).await
    }

    async fn edit_node(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        position: Position,
    ) -> ApiResult<bool> {
        topology_handlers::edit_node(&self.registry, session_id, node_id, position).await
    }

    async fn delete_node(self, _: Context, session_id: u32, node_id: u32) -> ApiResult<bool> {
        topology_handlers::delete_node(&self.registry, session_id, node_id).await
    }

    async fn get_node_links(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
    ) -> ApiResult<Vec<Link>> {
        topology_handlers::get_node_links(&self.registry, session_id, node_id).await
    }

    async fn create_link(self, _: Context, session_id: u32, link: Link) -> ApiResult<bool> {
        topology_handlers::create_link(&self.registry, session_id, link).await
    }

    async fn edit_link(
        self,
        _: Context,
        session_id: u32,
        selector: LinkSelector,
        options: LinkOptions,
    ) -> ApiResult<bool> {
        topology_handlers::edit_link(&self.registry, session_id, selector, options).await
    }

    async fn delete_link(
        self,
        _: Context,
        session_id: u32,
        selector: LinkSelector,
    ) -> ApiResult<bool> {
        topology_handlers::delete_link(&self.registry, session_id, selector).await
    }

    async fn get_hooks(self, _: Context, session_id: u32) -> ApiResult<Vec<Hook>> {
        topology_handlers::get_hooks(&self.registry, session_id).await
    }

    async fn add_hook(self, _: Context, session_id: u32, hook: Hook) -> ApiResult<bool> {
        topology_handlers::add_hook(&self.registry, session_id, hook).await
    }

    async fn get_mobility_configs(
        self,
        _: Context,
        session_id: u32,
    ) -> ApiResult<Vec<ModelConfig>> {
        config_handlers::get_mobility_configs(&self.registry, session_id).await
    }

    async fn get_mobility_config(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
    ) -> ApiResult<Vec<ConfigGroup>> {
        config_handlers::get_mobility_config(&self.registry, session_id, node_id).await
    }

    async fn set_mobility_config(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        config: ConfigMap,
    ) -> ApiResult<bool> {
        config_handlers::set_mobility_config(&self.registry, session_id, node_id, config).await
    }

    async fn mobility_action(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        action: u32,
    ) -> ApiResult<bool> {
        config_handlers::mobility_action(&self.registry, session_id, node_id, action).await
    }

    async fn get_wlan_config(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
    ) -> ApiResult<Vec<ConfigGroup>> {
        config_handlers::get_wlan_config(&self.registry, session_id, node_id).await
    }

    async fn set_wlan_config(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        config: ConfigMap,
    ) -> ApiResult<bool> {
        config_handlers::set_wlan_config(&self.registry, session_id, node_id, config).await
    }

    async fn get_emane_config(self, _: Context, session_id: u32) -> ApiResult<Vec<ConfigGroup>> {
        config_handlers::get_emane_config(&self.registry, session_id).await
    }

    async fn set_emane_config(
        self,
        _: Context,
        session_id: u32,
        config: ConfigMap,
    ) -> ApiResult<bool> {
        config_handlers::set_emane_config(&self.registry, session_id, config).await
    }

    async fn get_emane_models(self, _: Context, session_id: u32) -> ApiResult<Vec<String>> {
        config_handlers::get_emane_models(&self.registry, session_id).await
    }

    async fn get_emane_model_config(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        model: String,
    ) -> ApiResult<Vec<ConfigGroup>> {
        config_handlers::get_emane_model_config(&self.registry, session_id, node_id, model).await
    }

    async fn set_emane_model_config(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        model: String,
        config: ConfigMap,
    ) -> ApiResult<bool> {
        config_handlers::set_emane_model_config(&self.registry, session_id, node_id, model, config)
            .await
    }

    async fn get_emane_model_configs(
        self,
        _: Context,
        session_id: u32,
    ) -> ApiResult<Vec<ModelConfig>> {
        config_handlers::get_emane_model_configs(&self.registry, session_id).await
    }

    async fn get_services(self, _: Context, session_id: u32) -> ApiResult<Vec<ServiceSummary>> {
        service_handlers::get_services(&self.registry, session_id).await
    }

    async fn get_service_defaults(
        self,
        _: Context,
        session_id: u32,
    ) -> ApiResult<Vec<ServiceDefaults>> {
        service_handlers::get_service_defaults(&self.registry, session_id).await
    }

    async fn set_service_defaults(
        self,
        _: Context,
        session_id: u32,
        defaults: Vec<ServiceDefaults>,
    ) -> ApiResult<bool> {
        service_handlers::set_service_defaults(&self.registry, session_id, defaults).await
    }

    async fn get_node_service(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        service: String,
    ) -> ApiResult<NodeServiceData> {
        service_handlers::get_node_service(&self.registry, session_id, node_id, service).await
    }

    async fn get_node_service_file(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        service: String,
        file: String,
    ) -> ApiResult<String> {
        service_handlers::get_node_service_file(&self.registry, session_id, node_id, service, file)
            .await
    }

    async fn set_node_service(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        update: NodeServiceUpdate,
    ) -> ApiResult<bool> {
        service_handlers::set_node_service(&self.registry, session_id, node_id, update).await
    }

    async fn set_node_service_file(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        service: String,
        file: String,
        data: String,
    ) -> ApiResult<bool> {
        service_handlers::set_node_service_file(
            &self.registry,
            session_id,
            node_id,
            service,
            file,
            data,
        )
        .await
    }

    async fn service_action(
        self,
        _: Context,
        session_id: u32,
        node_id: u32,
        service: String,
        action: u32,
    ) -> ApiResult<bool> {
        service_handlers::service_action(&self.registry, session_id, node_id, service, action)
            .await
    }

    async fn save_scenario(self, _: Context, session_id: u32) -> ApiResult<String> {
        session_handlers::save_scenario(&self.registry, session_id).await
    }

    async fn open_scenario(self, _: Context, data: String) -> OpenResult {
        session_handlers::open_scenario(&self.registry, data).await
    }

    async fn build_sha(self, _: Context) -> String {
        BUILD_SHA.to_string()
    }
}

/// Run the API server until `shutdown_tx` fires.
pub async fn run_api_server(
    registry: Arc<SessionRegistry>,
    shutdown_tx: broadcast::Sender<()>,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    use tarpc::serde_transport::tcp;

    let mut listener = tcp::listen(&addr, Bincode::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);
    info!(%addr, "API server listening");

    let mut shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            Some(result) = listener.next() => {
                match result {
                    Ok(transport) => {
                        let server = ApiServer::new(registry.clone());
                        let channel = server::BaseChannel::with_defaults(transport);

                        tokio::spawn(async move {
                            channel.execute(server.serve()).for_each(|response| async {
                                tokio::spawn(response);
                            }).await;
                        });
                    }
                    Err(e) => {
                        warn!("API accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    Ok(())
}

/// Builds the session registry the daemon serves.
pub fn build_registry(config: &DaemonConfig, collaborators: Collaborators) -> SessionRegistry {
    SessionRegistry::new(SessionFactory {
        workspace_root: config.workspace_root.clone(),
        preserve_workspaces: config.preserve_workspaces,
        default_location: config.default_location,
        collaborators,
    })
}

/// Main entry point for `netemud serve`.
///
/// Runs both listeners until ctrl-c, then tears every session down.
pub async fn run_daemon(config: DaemonConfig) -> anyhow::Result<()> {
    let registry = Arc::new(build_registry(&config, Collaborators::host()));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    info!(
        sha = crate::version::short_sha(),
        api = %config.listen,
        streams = %config.stream_listen,
        "daemon starting"
    );

    let stream_registry = registry.clone();
    let stream_shutdown = shutdown_tx.clone();
    let stream_addr = config.stream_listen;
    let max_streams = config.max_streams;
    let streams = tokio::spawn(async move {
        if let Err(e) =
            run_stream_listener(stream_registry, stream_shutdown, stream_addr, max_streams).await
        {
            error!("Stream listener error: {:#}", e);
        }
    });

    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        let _ = ctrl_c_shutdown.send(());
    });

    let served = run_api_server(registry.clone(), shutdown_tx.clone(), config.listen).await;
    let _ = shutdown_tx.send(());
    let _ = streams.await;

    registry.shutdown_all().await;
    info!("daemon stopped");
    served
}

#[cfg(test)]
#[path = "tests/rpc_server_tests.rs"]
mod tests;
