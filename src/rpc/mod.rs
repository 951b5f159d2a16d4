//! RPC service definitions for the emulation control plane.
//!
//! This module defines the tarpc services for:
//! - Client -> Daemon: the unary `CoreApi` (sessions, topology, configuration)
//! - Daemon -> Observer: the `EventSink` callback each streaming observer serves

pub mod api_service;
pub mod event_sink;
pub mod wire;

use crate::emulator::topology::TopologyError;
use serde::{Deserialize, Serialize};

/// Errors that abort an API call. Anything a caller can recover from is
/// reported as a `bool` in the response instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApiError {
    /// Session id not in the registry
    SessionNotFound { session_id: u32 },
    /// Node id not in the session's topology
    NodeNotFound { session_id: u32, node_id: u32 },
    /// Request refers to something that cannot exist
    InvalidRequest { message: String },
    /// Internal error
    Internal { message: String },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::SessionNotFound { session_id } => {
                write!(f, "Session not found: {}", session_id)
            }
            ApiError::NodeNotFound {
                session_id,
                node_id,
            } => {
                write!(f, "Node {} not found in session {}", node_id, session_id)
            }
            ApiError::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
            ApiError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<TopologyError> for ApiError {
    fn from(err: TopologyError) -> Self {
        ApiError::InvalidRequest {
            message: err.to_string(),
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
#[path = "tests/rpc_tests.rs"]
mod tests;
