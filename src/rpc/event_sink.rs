//! Callback service for event streams (daemon -> observer).
//!
//! Observers connect to the daemon's stream port and serve `EventSink` on
//! that connection; the daemon is the client. The daemon first asks what the
//! observer wants with `hello`, then pushes events until either side goes
//! away.

use crate::rpc::wire::{Event, StreamRequest};

#[tarpc::service]
pub trait EventSink {
    /// Handshake. The observer names its session and event kind; nothing
    /// is subscribed before this returns.
    async fn hello() -> StreamRequest;

    /// One event, resync backlog first, then live events in publish order.
    async fn event(event: Event);

    /// The daemon is ending the stream.
    async fn closed(reason: String);
}
