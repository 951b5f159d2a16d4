//! Session lifecycle tests for the RPC daemon.

use super::{new_link, new_node, two_node_session, TestServer};
use crate::rpc::wire::{Position, SessionLocation};
use crate::rpc::ApiError;
use tarpc::context;

#[tokio::test]
async fn test_create_node_link_and_snapshot() {
    let server = TestServer::start().await;
    let client = server.create_client().await;

    let session = client.create_session(context::current()).await.unwrap();
    assert_eq!(session.state, 1);
    assert_eq!(session.nodes, 0);

    let first = client
        .create_node(context::current(), session.id, new_node(1, "n1"))
        .await
        .unwrap()
        .unwrap();
    let second = client
        .create_node(context::current(), session.id, new_node(2, "n2"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!((first, second), (1, 2));

    let linked = client
        .create_link(context::current(), session.id, new_link(1, 2))
        .await
        .unwrap()
        .unwrap();
    assert!(linked);

    let snapshot = client
        .get_session(context::current(), session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.state, 1);
    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(snapshot.nodes[0].name, "n1");
    assert_eq!(snapshot.links.len(), 1);
    assert_eq!(
        (snapshot.links[0].node_one, snapshot.links[0].node_two),
        (1, 2)
    );
}

#[tokio::test]
async fn test_sessions_are_listed_until_deleted() {
    let server = TestServer::start().await;
    let client = server.create_client().await;

    let first = two_node_session(&client).await;
    let second = client.create_session(context::current()).await.unwrap().id;
    assert_ne!(first, second);

    let sessions = client.get_sessions(context::current()).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].nodes, 2);

    assert!(client.delete_session(context::current(), first).await.unwrap());
    assert!(!client.delete_session(context::current(), first).await.unwrap());

    let sessions = client.get_sessions(context::current()).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, second);
    assert_eq!(server.fakes.emulator.shutdown_count(), 1);
}

#[tokio::test]
async fn test_unknown_session_is_reported() {
    let server = TestServer::start().await;
    let client = server.create_client().await;

    let result = client.get_session(context::current(), 77).await.unwrap();
    assert_eq!(result, Err(ApiError::SessionNotFound { session_id: 77 }));

    let result = client
        .set_session_state(context::current(), 77, 2)
        .await
        .unwrap();
    assert_eq!(result, Err(ApiError::SessionNotFound { session_id: 77 }));
}

#[tokio::test]
async fn test_state_changes_drive_emulator() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = two_node_session(&client).await;

    let changed = client
        .set_session_state(context::current(), session_id, 3)
        .await
        .unwrap()
        .unwrap();
    assert!(changed);
    assert_eq!(server.fakes.emulator.instantiate_count(), 1);

    let snapshot = client
        .get_session(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.state, 4);
}

#[tokio::test]
async fn test_unknown_state_code_is_refused() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;

    let changed = client
        .set_session_state(context::current(), session_id, 42)
        .await
        .unwrap()
        .unwrap();
    assert!(!changed);

    let snapshot = client
        .get_session(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.state, 1);
}

#[tokio::test]
async fn test_location_updates_only_given_fields() {
    let server = TestServer::start().await;
    let client = server.create_client().await;
    let session_id = client.create_session(context::current()).await.unwrap().id;

    let before = client
        .get_session_location(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();

    let update = SessionLocation {
        position: Position {
            x: 5.0,
            y: 6.0,
            z: 0.0,
            lat: Some(47.5),
            lon: None,
            alt: None,
        },
        scale: 0.0,
    };
    assert!(client
        .set_session_location(context::current(), session_id, update)
        .await
        .unwrap()
        .unwrap());

    let after = client
        .get_session_location(context::current(), session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.position.lat, Some(47.5));
    assert_eq!(after.position.lon, before.position.lon);
    assert_eq!(after.position.x, 5.0);
}

#[tokio::test]
async fn test_build_sha_matches_binary() {
    let server = TestServer::start().await;
    let client = server.create_client().await;

    let sha = client.build_sha(context::current()).await.unwrap();
    assert_eq!(sha, crate::version::BUILD_SHA);
}
