use super::*;

#[test]
fn test_api_error_display_session_not_found() {
    let err = ApiError::SessionNotFound { session_id: 12 };
    assert_eq!(format!("{}", err), "Session not found: 12");
}

#[test]
fn test_api_error_display_node_not_found() {
    let err = ApiError::NodeNotFound {
        session_id: 3,
        node_id: 7,
    };
    assert_eq!(format!("{}", err), "Node 7 not found in session 3");
}

#[test]
fn test_api_error_display_invalid_request() {
    let err = ApiError::InvalidRequest {
        message: "bad link".to_string(),
    };
    assert_eq!(format!("{}", err), "Invalid request: bad link");
}

#[test]
fn test_api_error_display_internal() {
    let err = ApiError::Internal {
        message: "something went wrong".to_string(),
    };
    assert_eq!(format!("{}", err), "Internal error: something went wrong");
}

#[test]
fn test_topology_error_becomes_invalid_request() {
    let err: ApiError = TopologyError::SelfLink(4).into();
    assert_eq!(
        err,
        ApiError::InvalidRequest {
            message: "node 4 cannot link to itself".to_string()
        }
    );
}

#[test]
fn test_wire_event_kind_matches_variant() {
    use crate::emulator::events::EventKind;
    use crate::rpc::wire::{Event, FileEvent};

    let event = Event::File(FileEvent::default());
    assert_eq!(event.kind(), EventKind::File);
}
