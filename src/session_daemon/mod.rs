//! The emulation daemon's network surface.
//!
//! ## Architecture
//!
//! - **API server (`rpc_server.rs`)**: tarpc server for the `CoreApi`
//!   service. Each call is delegated to one of the handler modules, which
//!   lock the addressed session and translate between wire and domain types.
//! - **Event streams (`event_stream.rs`)**: second listener where each
//!   connection carries one observer's stream of one event kind.
//! - **Client (`rpc_client.rs`)**: connects to the API port with retry.
//! - **Subscription (`rpc_subscription.rs`)**: observer side of a stream.

pub mod config_handlers;
pub mod event_stream;
pub mod rpc_client;
pub mod rpc_server;
pub mod rpc_subscription;
pub mod service_handlers;
pub mod session_handlers;
pub mod topology_handlers;

#[cfg(test)]
pub(crate) mod rpc_tests;

pub use rpc_server::run_daemon;
