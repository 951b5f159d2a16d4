//! Unary control API served on the daemon's main port.

use crate::rpc::wire::{
    ConfigGroup, ConfigMap, Hook, Link, LinkOptions, LinkSelector, ModelConfig, NewNode,
    NodeDetails, NodeServiceData, NodeServiceUpdate, OpenResult, Position, ServiceDefaults,
    ServiceSummary, SessionLocation, SessionSnapshot, SessionSummary,
};
use crate::rpc::ApiResult;

/// Service exposed by the daemon to API clients.
///
/// Every call naming a session fails with `SessionNotFound` when the id is
/// unknown; calls naming a node fail with `NodeNotFound` where the node has
/// to exist. `bool` results report recoverable failures.
#[tarpc::service]
pub trait CoreApi {
    // Sessions

    /// Create an empty session in the definition state.
    async fn create_session() -> SessionSummary;

    /// Tear down and forget a session. False when it did not exist.
    async fn delete_session(session_id: u32) -> bool;

    async fn get_sessions() -> Vec<SessionSummary>;

    /// Full snapshot of state, nodes and links.
    async fn get_session(session_id: u32) -> ApiResult<SessionSnapshot>;

    async fn get_session_location(session_id: u32) -> ApiResult<SessionLocation>;

    async fn set_session_location(session_id: u32, location: SessionLocation) -> ApiResult<bool>;

    /// Move the session to the state with the given code. Unknown codes
    /// leave the state untouched and return false.
    async fn set_session_state(session_id: u32, state: u32) -> ApiResult<bool>;

    async fn get_session_options(session_id: u32) -> ApiResult<Vec<ConfigGroup>>;

    async fn set_session_options(session_id: u32, config: ConfigMap) -> ApiResult<bool>;

    async fn get_session_metadata(session_id: u32) -> ApiResult<ConfigMap>;

    async fn set_session_metadata(session_id: u32, config: ConfigMap) -> ApiResult<bool>;

    // Topology

    /// Add a node, returning its id.
    async fn create_node(session_id: u32, node: NewNode) -> ApiResult<u32>;

    async fn get_node(session_id: u32, node_id: u32) -> ApiResult<NodeDetails>;

    /// Move a node. Only position fields are applied.
    async fn edit_node(session_id: u32, node_id: u32, position: Position) -> ApiResult<bool>;

    async fn delete_node(session_id: u32, node_id: u32) -> ApiResult<bool>;

    async fn get_node_links(session_id: u32, node_id: u32) -> ApiResult<Vec<Link>>;

    async fn create_link(session_id: u32, link: Link) -> ApiResult<bool>;

    async fn edit_link(
        session_id: u32,
        selector: LinkSelector,
        options: LinkOptions,
    ) -> ApiResult<bool>;

    async fn delete_link(session_id: u32, selector: LinkSelector) -> ApiResult<bool>;

    async fn get_hooks(session_id: u32) -> ApiResult<Vec<Hook>>;

    async fn add_hook(session_id: u32, hook: Hook) -> ApiResult<bool>;

    // Mobility

    /// Scripted mobility configurations of every node that has one.
    async fn get_mobility_configs(session_id: u32) -> ApiResult<Vec<ModelConfig>>;

    async fn get_mobility_config(session_id: u32, node_id: u32) -> ApiResult<Vec<ConfigGroup>>;

    async fn set_mobility_config(
        session_id: u32,
        node_id: u32,
        config: ConfigMap,
    ) -> ApiResult<bool>;

    /// Start (0), pause (1) or stop (2) scripted mobility on a node.
    async fn mobility_action(session_id: u32, node_id: u32, action: u32) -> ApiResult<bool>;

    async fn get_wlan_config(session_id: u32, node_id: u32) -> ApiResult<Vec<ConfigGroup>>;

    async fn set_wlan_config(session_id: u32, node_id: u32, config: ConfigMap)
        -> ApiResult<bool>;

    // EMANE

    async fn get_emane_config(session_id: u32) -> ApiResult<Vec<ConfigGroup>>;

    async fn set_emane_config(session_id: u32, config: ConfigMap) -> ApiResult<bool>;

    async fn get_emane_models(session_id: u32) -> ApiResult<Vec<String>>;

    async fn get_emane_model_config(
        session_id: u32,
        node_id: u32,
        model: String,
    ) -> ApiResult<Vec<ConfigGroup>>;

    async fn set_emane_model_config(
        session_id: u32,
        node_id: u32,
        model: String,
        config: ConfigMap,
    ) -> ApiResult<bool>;

    async fn get_emane_model_configs(session_id: u32) -> ApiResult<Vec<ModelConfig>>;

    // Services

    async fn get_services(session_id: u32) -> ApiResult<Vec<ServiceSummary>>;

    async fn get_service_defaults(session_id: u32) -> ApiResult<Vec<ServiceDefaults>>;

    /// Replace the default service sets of every node model.
    async fn set_service_defaults(
        session_id: u32,
        defaults: Vec<ServiceDefaults>,
    ) -> ApiResult<bool>;

    async fn get_node_service(
        session_id: u32,
        node_id: u32,
        service: String,
    ) -> ApiResult<NodeServiceData>;

    /// Empty when the service is not assigned to the node.
    async fn get_node_service_file(
        session_id: u32,
        node_id: u32,
        service: String,
        file: String,
    ) -> ApiResult<String>;

    async fn set_node_service(
        session_id: u32,
        node_id: u32,
        update: NodeServiceUpdate,
    ) -> ApiResult<bool>;

    async fn set_node_service_file(
        session_id: u32,
        node_id: u32,
        service: String,
        file: String,
        data: String,
    ) -> ApiResult<bool>;

    /// Start (0), stop (1), restart (2) or validate (3) a node service.
    async fn service_action(
        session_id: u32,
        node_id: u32,
        service: String,
        action: u32,
    ) -> ApiResult<bool>;

    // Scenarios

    /// Serialize the session into a scenario document.
    async fn save_scenario(session_id: u32) -> ApiResult<String>;

    /// Load a scenario document into a new session and instantiate it.
    async fn open_scenario(data: String) -> OpenResult;

    /// Get daemon build SHA for version checking.
    async fn build_sha() -> String;
}
