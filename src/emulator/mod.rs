//! In-memory emulation model: sessions, their topology graphs, the
//! configuration subsystems and the event hub observers attach to.

pub mod collaborators;
pub mod configurable;
pub mod events;
pub mod hub;
pub mod lifecycle;
pub mod link;
pub mod models;
pub mod node;
pub mod registry;
pub mod resync;
pub mod scenario;
pub mod services;
pub mod session;
pub mod topology;
pub mod translate;

#[cfg(test)]
pub mod test_support;
