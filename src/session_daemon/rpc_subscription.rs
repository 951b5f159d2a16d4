//! Observer side of an event stream.
//!
//! `EventSubscription` connects to the daemon's stream port and serves an
//! `EventSink` on that connection; the daemon calls into it to push events.

use crate::rpc::event_sink::EventSink;
use crate::rpc::wire::{Event, StreamRequest};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::net::SocketAddr;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Bincode;
use tokio::sync::mpsc;
use tracing::debug;

/// Messages received from the daemon on a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Event(Box<Event>),
    /// The daemon ended the stream
    Closed(String),
}

/// Handler that implements EventSink and forwards messages to a channel.
#[derive(Clone)]
struct SinkHandler {
    request: StreamRequest,
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl EventSink for SinkHandler {
    async fn hello(self, _: tarpc::context::Context) -> StreamRequest {
        self.request
    }

    async fn event(self, _: tarpc::context::Context, event: Event) {
        let _ = self.tx.send(StreamMessage::Event(Box::new(event)));
    }

    async fn closed(self, _: tarpc::context::Context, reason: String) {
        debug!("stream closed by daemon: {}", reason);
        let _ = self.tx.send(StreamMessage::Closed(reason));
    }
}

/// An open event stream. Dropping it closes the connection, which ends the
/// stream on the daemon side.
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    server_task: tokio::task::JoinHandle<()>,
}

impl EventSubscription {
    /// Connect to the stream port and ask for `request`.
    pub async fn connect(addr: SocketAddr, request: StreamRequest) -> Result<Self> {
        use tarpc::serde_transport::tcp;

        let mut transport = tcp::connect(addr, Bincode::default);
        transport.config_mut().max_frame_length(usize::MAX);
        let transport = transport
            .await
            .with_context(|| format!("Failed to connect to stream port {}", addr))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let handler = SinkHandler { request, tx };

        // Requests are handled one at a time so events arrive in the order
        // the daemon sent them.
        let server_task = tokio::spawn(async move {
            let channel = server::BaseChannel::with_defaults(transport);
            channel
                .execute(handler.serve())
                .for_each(|response| response)
                .await;
        });

        Ok(Self { rx, server_task })
    }

    /// Receive the next message. Returns None once the connection is gone.
    pub async fn recv(&mut self) -> Option<StreamMessage> {
        self.rx.recv().await
    }

    /// Receive the next event; None when the stream ended or the daemon
    /// closed it.
    pub async fn next_event(&mut self) -> Option<Event> {
        match self.recv().await? {
            StreamMessage::Event(event) => Some(*event),
            StreamMessage::Closed(_) => None,
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}
