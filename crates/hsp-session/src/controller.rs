//! Payment session controller.
//!
//! Owns the lifecycle of a single payment attempt: validate input, issue
//! the initiation request, record the correlation id, then race the
//! channel's status events against the confirmation timer and the user's
//! cancel action — whichever resolves first wins. Correctness depends
//! only on correlation-id equality, never on whether the HTTP response
//! or the first matching event arrives first: the controller subscribes
//! to the event bus *before* submitting, so an early event waits in the
//! subscription buffer until the id is known.
//!
//! The presentation layer reads [`SessionController::status`] (or
//! watches [`SessionController::watch_status`]) and calls
//! [`SessionController::cancel`] / [`SessionController::reset`]; both
//! are cheap, synchronous and idempotent.

use std::time::Duration;

use hsp_channel::{ChannelEvent, ChannelHandle};
use hsp_msisdn::{validate_for_payment, Msisdn};
use hsp_schemas::InitiationRequest;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{error, info, warn};

use crate::error::{SessionError, ValidationError};
use crate::gateway::InitiationGateway;
use crate::state_machine::{AttemptEvent, AttemptState, PaymentAttempt};

// ---------------------------------------------------------------------------
// EventSource
// ---------------------------------------------------------------------------

/// Anything that can hand out subscriptions to the live event stream.
///
/// Production wires the shared [`ChannelHandle`]; tests drive a bare
/// `broadcast::Sender` directly.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;
}

impl EventSource for ChannelHandle {
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events()
    }
}

// Callers that keep the handle for teardown share it with the controller.
impl EventSource for std::sync::Arc<ChannelHandle> {
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events()
    }
}

impl EventSource for broadcast::Sender<ChannelEvent> {
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.subscribe()
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Discriminated status exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Validating,
    Submitting,
    AwaitingConfirmation { correlation_id: String },
    Succeeded,
    Failed { error: SessionError },
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Succeeded | SessionStatus::Failed { .. } | SessionStatus::Cancelled
        )
    }

    /// Display-ready text for terminal failures; `None` otherwise.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            SessionStatus::Failed { error } => Some(error.user_message()),
            SessionStatus::Cancelled => Some(SessionError::Cancelled.user_message()),
            _ => None,
        }
    }
}

fn snapshot(attempt: &PaymentAttempt) -> SessionStatus {
    match attempt.state {
        AttemptState::Idle => SessionStatus::Idle,
        AttemptState::Validating => SessionStatus::Validating,
        AttemptState::Submitting => SessionStatus::Submitting,
        AttemptState::AwaitingConfirmation => SessionStatus::AwaitingConfirmation {
            correlation_id: attempt.correlation_id.clone().unwrap_or_default(),
        },
        AttemptState::Succeeded => SessionStatus::Succeeded,
        AttemptState::Failed => SessionStatus::Failed {
            error: attempt.failure.clone().unwrap_or(SessionError::Provider {
                detail: "payment failed".to_string(),
            }),
        },
        AttemptState::Cancelled => SessionStatus::Cancelled,
    }
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Controller backing one payment surface. One live attempt at a time.
pub struct SessionController {
    gateway: Box<dyn InitiationGateway>,
    events: Box<dyn EventSource>,
    confirm_window: Duration,
    status: watch::Sender<SessionStatus>,
    cancel: watch::Sender<bool>,
    /// Held for the duration of [`SessionController::pay`]; a second
    /// submission while an attempt is live is ignored.
    run_lock: Mutex<()>,
}

impl SessionController {
    pub fn new(
        gateway: Box<dyn InitiationGateway>,
        events: Box<dyn EventSource>,
        confirm_window: Duration,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::Idle);
        let (cancel, _) = watch::channel(false);
        Self {
            gateway,
            events,
            confirm_window,
            status,
            cancel,
            run_lock: Mutex::new(()),
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Watch status transitions (for surfaces that re-render on change).
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Dismiss the surface: stop reacting to events for the current
    /// attempt. Does **not** cancel an already-issued provider-side
    /// charge — only the local listening stops. Idempotent; a no-op when
    /// nothing is in flight.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Explicit return to `Idle` after a terminal state, so a new
    /// attempt can start. Ignored while an attempt is live.
    pub fn reset(&self) {
        if self.status().is_terminal() {
            self.status.send_replace(SessionStatus::Idle);
        }
    }

    /// Run one payment attempt to a terminal state.
    ///
    /// Validation and submission failures resolve before this returns a
    /// terminal status synchronously with respect to the caller; provider
    /// outcomes, timeout and cancellation resolve during the
    /// confirmation race. The returned status is always terminal unless
    /// the controller was busy or not reset (in which case the current
    /// status is returned unchanged).
    pub async fn pay(
        &self,
        raw_phone: &str,
        amount: u32,
        plan_reference: &str,
    ) -> SessionStatus {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("payment attempt already in flight; submission ignored");
            return self.status();
        };
        if self.status() != SessionStatus::Idle {
            warn!(status = ?self.status(), "controller not idle; submission ignored");
            return self.status();
        }

        // A cancel left over from a previous surface dismissal must not
        // kill this fresh attempt.
        self.cancel.send_replace(false);

        let mut attempt = PaymentAttempt::new(amount);
        self.apply(&mut attempt, AttemptEvent::Submit);

        // Validation is synchronous; on failure the network is never
        // contacted.
        let subscriber = match validate_input(raw_phone, amount) {
            Ok(id) => id,
            Err(err) => {
                self.apply(&mut attempt, AttemptEvent::ValidationFailed { error: err });
                return self.status();
            }
        };
        self.apply(
            &mut attempt,
            AttemptEvent::ValidationPassed {
                subscriber_id: subscriber.clone(),
            },
        );

        // Subscribe before submitting: a status event may beat the HTTP
        // response, and it must not be lost.
        let mut events = self.events.subscribe();
        let mut cancel = self.cancel.subscribe();

        let request = InitiationRequest {
            subscriber_id: subscriber.as_str().to_string(),
            amount,
            plan_reference: plan_reference.to_string(),
        };

        let outcome = tokio::select! {
            _ = cancelled(&mut cancel) => {
                self.apply(&mut attempt, AttemptEvent::Cancel);
                return self.status();
            }
            res = self.gateway.initiate(&request) => res,
        };

        let ack = match outcome {
            Ok(ack) => ack,
            Err(err) => {
                self.apply(&mut attempt, AttemptEvent::SubmissionFailed { error: err });
                return self.status();
            }
        };
        info!(
            attempt_id = %attempt.attempt_id,
            correlation_id = %ack.correlation_id,
            "initiation accepted; awaiting confirmation"
        );
        self.apply(
            &mut attempt,
            AttemptEvent::SubmissionAccepted {
                correlation_id: ack.correlation_id,
            },
        );

        self.await_confirmation(&mut attempt, &mut events, &mut cancel)
            .await;
        self.status()
    }

    /// Race: matching status event vs confirmation timer vs cancel.
    async fn await_confirmation(
        &self,
        attempt: &mut PaymentAttempt,
        events: &mut broadcast::Receiver<ChannelEvent>,
        cancel: &mut watch::Receiver<bool>,
    ) {
        let timer = tokio::time::sleep(self.confirm_window);
        tokio::pin!(timer);
        let mut bus_open = true;

        while !attempt.state.is_terminal() {
            tokio::select! {
                _ = &mut timer => {
                    self.apply(attempt, AttemptEvent::TimedOut);
                }
                _ = cancelled(cancel) => {
                    self.apply(attempt, AttemptEvent::Cancel);
                }
                ev = events.recv(), if bus_open => match ev {
                    Ok(ChannelEvent::Payment(ev)) => {
                        self.apply(attempt, AttemptEvent::StatusUpdate(ev));
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status subscriber lagged");
                    }
                    // Channel gone: keep waiting on our own timer — the
                    // timeout policy is independent of connectivity.
                    Err(RecvError::Closed) => {
                        bus_open = false;
                    }
                }
            }
        }
    }

    fn apply(&self, attempt: &mut PaymentAttempt, event: AttemptEvent) {
        if let Err(err) = attempt.apply(event) {
            // Transitions are driven solely from pay(); an illegal one is
            // a controller bug, not a recoverable condition.
            error!(%err, "attempt state machine violation");
        }
        self.status.send_replace(snapshot(attempt));
    }
}

/// Resolve once the cancel flag is raised.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn validate_input(raw_phone: &str, amount: u32) -> Result<Msisdn, ValidationError> {
    if amount == 0 {
        return Err(ValidationError::InvalidAmount { amount });
    }
    validate_for_payment(raw_phone).map_err(ValidationError::Phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_amount_before_phone() {
        let err = validate_input("0712345678", 0).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAmount { amount: 0 }));
    }

    #[test]
    fn validate_rejects_bad_phone() {
        let err = validate_input("12345", 130).unwrap_err();
        assert!(matches!(err, ValidationError::Phone(_)));
    }

    #[test]
    fn validate_passes_spec_scenario() {
        let id = validate_input("0712345678", 130).unwrap();
        assert_eq!(id.as_str(), "254712345678");
    }
}
