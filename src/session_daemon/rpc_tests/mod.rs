//! Integration tests for the tarpc API and event streams.
//!
//! These tests spin up real API and stream listeners and talk to them
//! through real clients. Only the host-facing collaborators are faked.

mod config_tests;
mod session_tests;

use crate::config::DaemonConfig;
use crate::emulator::events::EventKind;
use crate::emulator::registry::SessionRegistry;
use crate::emulator::test_support::FakeCollaborators;
use crate::rpc::api_service::CoreApiClient;
use crate::rpc::wire::{Link, NewNode, Position, StreamRequest};
use crate::session_daemon::event_stream::run_stream_listener;
use crate::session_daemon::rpc_client;
use crate::session_daemon::rpc_server::{build_registry, run_api_server};
use crate::session_daemon::rpc_subscription::EventSubscription;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tarpc::context;
use tokio::sync::broadcast;

/// Find an available TCP port for testing.
pub fn find_test_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// A host node request.
pub fn new_node(id: u32, name: &str) -> NewNode {
    NewNode {
        id: Some(id),
        name: name.to_string(),
        position: Position {
            x: 10.0 * id as f32,
            y: 20.0,
            ..Position::default()
        },
        ..NewNode::default()
    }
}

/// A wired link request without interfaces.
pub fn new_link(node_one: u32, node_two: u32) -> Link {
    Link {
        node_one,
        node_two,
        ..Link::default()
    }
}

/// Test harness that manages a real daemon for testing.
pub struct TestServer {
    pub api_addr: SocketAddr,
    pub stream_addr: SocketAddr,
    pub registry: Arc<SessionRegistry>,
    pub fakes: FakeCollaborators,
    pub shutdown_tx: broadcast::Sender<()>,
    _workspace: tempfile::TempDir,
    _server_handle: tokio::task::JoinHandle<()>,
    _stream_handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a real daemon for testing.
    pub async fn start() -> Self {
        Self::start_with_max_streams(10).await
    }

    pub async fn start_with_max_streams(max_streams: usize) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let fakes = FakeCollaborators::default();
        let config = DaemonConfig {
            workspace_root: workspace.path().to_path_buf(),
            max_streams,
            ..DaemonConfig::default()
        };
        let registry = Arc::new(build_registry(&config, fakes.collaborators()));
        let api_addr = find_test_addr();
        let stream_addr = find_test_addr();
        let (shutdown_tx, _) = broadcast::channel(1);

        let server_handle = {
            let registry = registry.clone();
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                let _ = run_api_server(registry, shutdown_tx, api_addr).await;
            })
        };

        let stream_handle = {
            let registry = registry.clone();
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                let _ = run_stream_listener(registry, shutdown_tx, stream_addr, max_streams).await;
            })
        };

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            api_addr,
            stream_addr,
            registry,
            fakes,
            shutdown_tx,
            _workspace: workspace,
            _server_handle: server_handle,
            _stream_handle: stream_handle,
        }
    }

    /// Create a client connected to this server.
    pub async fn create_client(&self) -> CoreApiClient {
        rpc_client::connect_with_retry(self.api_addr).await.unwrap()
    }

    /// Open an event stream on this server.
    pub async fn subscribe(
        &self,
        session_id: u32,
        kind: EventKind,
        resync: bool,
    ) -> EventSubscription {
        let request = StreamRequest {
            session_id,
            kind,
            resync,
        };
        EventSubscription::connect(self.stream_addr, request)
            .await
            .unwrap()
    }

    /// Waits until `count` streams are subscribed to `kind` on a session.
    pub async fn wait_for_subscribers(&self, session_id: u32, kind: EventKind, count: usize) {
        let session = self.registry.get(session_id).await.unwrap();
        for _ in 0..200 {
            if session.hub().subscriber_count(kind) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} {:?} subscribers, found {}",
            count,
            kind,
            session.hub().subscriber_count(kind)
        );
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Creates a session holding nodes 1 and 2 joined by one link.
pub async fn two_node_session(client: &CoreApiClient) -> u32 {
    let session_id = client.create_session(context::current()).await.unwrap().id;
    for (id, name) in [(1, "n1"), (2, "n2")] {
        client
            .create_node(context::current(), session_id, new_node(id, name))
            .await
            .unwrap()
            .unwrap();
    }
    let created = client
        .create_link(context::current(), session_id, new_link(1, 2))
        .await
        .unwrap()
        .unwrap();
    assert!(created);
    session_id
}
