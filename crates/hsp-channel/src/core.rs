//! Socket-free dispatch core for the event channel.
//!
//! The reader task feeds raw text frames into [`ChannelCore::dispatch`];
//! everything observable from the outside (broadcast fan-out, latest-event
//! retention) happens here, so the entire delivery contract is testable
//! without opening a socket.

use hsp_schemas::{SessionEvent, StatusEvent};
use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::frame::{decode_frame, ChannelEvent};

/// Broadcast queue depth. Slow consumers that fall further behind than
/// this lose the oldest events, matching the at-most-latest delivery
/// guarantee of the channel.
const BUS_CAPACITY: usize = 256;

/// Dispatches decoded events to subscribers and retains the latest event
/// of each tracked kind.
pub struct ChannelCore {
    bus: broadcast::Sender<ChannelEvent>,
    last_payment: watch::Sender<Option<StatusEvent>>,
    last_session: watch::Sender<Option<SessionEvent>>,
}

impl ChannelCore {
    pub fn new() -> Self {
        let (bus, _rx) = broadcast::channel(BUS_CAPACITY);
        let (last_payment, _) = watch::channel(None);
        let (last_session, _) = watch::channel(None);
        Self {
            bus,
            last_payment,
            last_session,
        }
    }

    /// Subscribe to the live event stream. Late subscribers only see
    /// events dispatched after this call — there is no history replay.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.bus.subscribe()
    }

    /// Watch the most recent payment event (None until the first arrives).
    pub fn watch_last_payment(&self) -> watch::Receiver<Option<StatusEvent>> {
        self.last_payment.subscribe()
    }

    /// Watch the most recent session event.
    pub fn watch_last_session(&self) -> watch::Receiver<Option<SessionEvent>> {
        self.last_session.subscribe()
    }

    /// Decode and deliver one inbound text frame.
    ///
    /// Malformed frames are logged and dropped — they may belong to topics
    /// or schema versions this client does not know, and must never
    /// surface as a fatal error. Returns `true` when an event was
    /// delivered (used by tests; the reader loop ignores it).
    pub fn dispatch(&self, raw: &str) -> bool {
        let event = match decode_frame(raw) {
            Ok(ev) => ev,
            Err(err) => {
                warn!(%err, "dropping inbound frame");
                return false;
            }
        };

        match &event {
            ChannelEvent::Payment(ev) => {
                self.last_payment.send_replace(Some(ev.clone()));
            }
            ChannelEvent::Session(ev) => {
                self.last_session.send_replace(Some(ev.clone()));
            }
        }

        // No receivers is fine: retention above already happened.
        let _ = self.bus.send(event);
        true
    }
}

impl Default for ChannelCore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
