//! Event stream listener.
//!
//! Each observer connection carries one stream. The daemon is the client of
//! the observer's `EventSink`: it asks what to stream with `hello`,
//! subscribes, replays the resync backlog and then forwards live events
//! until the observer disconnects, a push fails, the session goes away or
//! the daemon shuts down. The subscription is dropped on every exit path.

use crate::emulator::registry::SessionRegistry;
use crate::emulator::resync::snapshot_events_of;
use crate::emulator::translate::event_to_wire;
use crate::rpc::event_sink::EventSinkClient;
use crate::rpc::wire::StreamRequest;
use anyhow::{Context, Result};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tarpc::client::{self, NewClient};
use tarpc::context;
use tarpc::tokio_serde::formats::Bincode;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Why a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    ObserverGone,
    SessionGone,
    Shutdown,
}

/// Run the stream listener until `shutdown_tx` fires. At most `max_streams`
/// streams are open at once; observers beyond that are told so and closed.
pub async fn run_stream_listener(
    registry: Arc<SessionRegistry>,
    shutdown_tx: broadcast::Sender<()>,
    addr: SocketAddr,
    max_streams: usize,
) -> Result<()> {
    use tarpc::serde_transport::tcp;

    let mut listener = tcp::listen(&addr, Bincode::default)
        .await
        .with_context(|| format!("Failed to bind stream listener on {}", addr))?;
    listener.config_mut().max_frame_length(usize::MAX);
    info!(%addr, max_streams, "stream listener ready");

    let permits = Arc::new(Semaphore::new(max_streams));
    let mut shutdown_rx = shutdown_tx.subscribe();

    loop {
        tokio::select! {
            Some(result) = listener.next() => {
                match result {
                    Ok(transport) => {
                        let NewClient { client: sink, dispatch } =
                            EventSinkClient::new(client::Config::default(), transport);
                        // Finishes as soon as the observer's connection closes.
                        let dispatch = tokio::spawn(async move {
                            let _ = dispatch.await;
                        });
                        let registry = registry.clone();
                        let permits = permits.clone();
                        let shutdown_rx = shutdown_tx.subscribe();
                        tokio::spawn(async move {
                            let served = serve_observer(
                                registry,
                                sink,
                                dispatch,
                                permits,
                                shutdown_rx,
                            )
                            .await;
                            if let Err(e) = served {
                                debug!("stream ended with error: {:#}", e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("Stream accept error: {}", e);
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

async fn serve_observer(
    registry: Arc<SessionRegistry>,
    client: EventSinkClient,
    mut dispatch: JoinHandle<()>,
    permits: Arc<Semaphore>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let request: StreamRequest = client
        .hello(context::current())
        .await
        .context("observer did not complete the handshake")?;
    let session_id = request.session_id;

    let Some(session) = registry.get(session_id).await else {
        let reason = format!("session {} not found", session_id);
        let _ = client.closed(context::current(), reason).await;
        return Ok(());
    };
    let Ok(_permit) = permits.try_acquire_owned() else {
        warn!(session_id, "stream refused: limit reached");
        let reason = "too many open streams".to_string();
        let _ = client.closed(context::current(), reason).await;
        return Ok(());
    };

    // Subscribing and snapshotting under the session lock means no event
    // can fall between the backlog and the live stream.
    let (mut subscription, backlog) = {
        let inner = session.lock().await;
        let subscription = session.hub().subscribe(request.kind);
        let backlog = if request.resync {
            snapshot_events_of(&inner, request.kind)
        } else {
            Vec::new()
        };
        (subscription, backlog)
    };
    drop(session);
    info!(session_id, kind = ?request.kind, backlog = backlog.len(), "stream opened");

    for event in &backlog {
        client
            .event(context::current(), event_to_wire(event))
            .await
            .context("failed to deliver resync backlog")?;
    }

    let end = loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    break StreamEnd::SessionGone;
                };
                if let Err(e) = client.event(context::current(), event_to_wire(&event)).await {
                    debug!(session_id, "event push failed: {}", e);
                    break StreamEnd::ObserverGone;
                }
            }
            _ = &mut dispatch => {
                break StreamEnd::ObserverGone;
            }
            _ = shutdown_rx.recv() => {
                break StreamEnd::Shutdown;
            }
        }
    };
    drop(subscription);

    match end {
        StreamEnd::ObserverGone => {}
        StreamEnd::SessionGone => {
            let reason = format!("session {} deleted", session_id);
            let _ = client.closed(context::current(), reason).await;
        }
        StreamEnd::Shutdown => {
            let reason = "daemon shutting down".to_string();
            let _ = client.closed(context::current(), reason).await;
        }
    }
    info!(session_id, kind = ?request.kind, ?end, "stream closed");
    Ok(())
}
