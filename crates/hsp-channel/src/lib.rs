//! Persistent real-time event channel to the portal notification service.
//!
//! One WebSocket connection per presentation surface. The connection is
//! owned by a background task spawned from [`Channel::connect`]; callers
//! hold a [`ChannelHandle`] and never block on the socket. On every
//! (re)connect the task declares interest in the transaction-update and
//! session-update topics; inbound frames are demultiplexed by
//! [`core::ChannelCore`], which fans events out over a broadcast bus and
//! retains the latest event of each kind.
//!
//! Disconnection — voluntary or network failure — only flips the
//! connectivity flag. No event is synthesized for in-flight payment
//! attempts; the session controller applies its own confirmation timeout.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

pub mod core;
pub mod frame;

use crate::core::ChannelCore;
pub use crate::frame::{ChannelEvent, Topic};
use crate::frame::subscribe_frame;
use hsp_schemas::{SessionEvent, StatusEvent};

/// Pause between reconnect attempts after a drop or failed connect.
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Factory for the single long-lived channel connection.
pub struct Channel;

impl Channel {
    /// Start the connection task and return a handle to it.
    ///
    /// Non-blocking: the task connects (and reconnects) in the
    /// background. Subscribers attached before the first connect lose
    /// nothing — events only exist once a connection is up.
    pub fn connect(url: impl Into<String>) -> ChannelHandle {
        let url = url.into();
        let core = Arc::new(ChannelCore::new());
        let (connected_tx, connected_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let last_payment = core.watch_last_payment();
        let last_session = core.watch_last_session();

        tokio::spawn(run(url, Arc::clone(&core), connected_tx, shutdown_rx));

        ChannelHandle {
            core,
            connected: connected_rx,
            last_payment,
            last_session,
            shutdown: shutdown_tx,
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelHandle
// ---------------------------------------------------------------------------

/// Owned handle to the background connection.
///
/// Dropping the handle tears the connection down; [`ChannelHandle::disconnect`]
/// does the same explicitly and is safe to call any number of times.
pub struct ChannelHandle {
    core: Arc<ChannelCore>,
    connected: watch::Receiver<bool>,
    last_payment: watch::Receiver<Option<StatusEvent>>,
    last_session: watch::Receiver<Option<SessionEvent>>,
    shutdown: watch::Sender<bool>,
}

impl ChannelHandle {
    /// Subscribe to the live event stream. Only events arriving after
    /// this call are delivered; there is no history replay.
    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.core.subscribe()
    }

    /// Most recent payment event seen on this connection, if any.
    pub fn last_payment(&self) -> Option<StatusEvent> {
        self.last_payment.borrow().clone()
    }

    /// Most recent session event seen on this connection, if any.
    pub fn last_session(&self) -> Option<SessionEvent> {
        self.last_session.borrow().clone()
    }

    /// Current connectivity state. `false` during reconnect backoff.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Stop the connection task. Idempotent.
    pub fn disconnect(&self) {
        self.shutdown.send_replace(true);
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

/// Resolve once shutdown is requested (or the handle is gone).
async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            // Handle dropped: treat as shutdown.
            return;
        }
    }
}

fn shutdown_requested(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

async fn run(
    url: String,
    core: Arc<ChannelCore>,
    connected: watch::Sender<bool>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if shutdown_requested(&shutdown) {
            break;
        }

        match connect_async(&url).await {
            Ok((ws, _resp)) => {
                info!(%url, "channel connected");
                connected.send_replace(true);
                serve_connection(ws, &core, &mut shutdown).await;
                connected.send_replace(false);
                info!("channel disconnected");
            }
            Err(err) => {
                warn!(%url, %err, "channel connect failed");
            }
        }

        if shutdown_requested(&shutdown) {
            break;
        }
        tokio::select! {
            _ = wait_shutdown(&mut shutdown) => break,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
    connected.send_replace(false);
}

/// Drive one established connection until it drops or shutdown.
async fn serve_connection(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    core: &ChannelCore,
    shutdown: &mut watch::Receiver<bool>,
) {
    let (mut sink, mut stream) = ws.split();

    // Declare interest in every tracked topic. Subscription is idempotent
    // server-side, so repeating this on each reconnect is safe.
    for topic in Topic::ALL {
        if let Err(err) = sink.send(Message::Text(subscribe_frame(*topic))).await {
            warn!(%err, topic = topic.subscription_name(), "subscription send failed");
            return;
        }
    }

    loop {
        tokio::select! {
            _ = wait_shutdown(shutdown) => {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    core.dispatch(&text);
                }
                // Ping/pong are answered by tungstenite; binary frames are
                // not part of the notification protocol.
                Some(Ok(Message::Close(_))) | None => return,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(%err, "channel read error");
                    return;
                }
            }
        }
    }
}
