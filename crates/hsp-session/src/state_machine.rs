//! Payment attempt state machine.
//!
//! # Design
//!
//! Explicit state machine for a single payment attempt. Every lifecycle
//! event is applied via [`PaymentAttempt::apply`], which enforces:
//!
//! 1. **Legal transitions only.** Illegal events return
//!    [`TransitionError`]; the controller logs these as bugs.
//! 2. **Correlation matching.** A status update whose correlation id does
//!    not equal the attempt's stored id is a silent no-op, as are status
//!    updates arriving in a terminal state (late or duplicate provider
//!    events must never resurrect or re-fail an attempt).
//!
//! # State diagram
//!
//! ```text
//!          Submit            ValidationPassed        SubmissionAccepted
//!  Idle ─────────► Validating ─────────► Submitting ─────────► AwaitingConfirmation
//!                      │                     │    │                 │  │  │
//!     ValidationFailed │    SubmissionFailed │    │ Cancel          │  │  │ Cancel
//!                      ▼                     ▼    ▼        completed│  │failed
//!                   Failed ◄─────────────Failed  Cancelled          │  ▼
//!                                                     ▲   Succeeded ◄  Failed
//!                                                     └─────────────────────
//!                                   (terminal; Reset returns to Idle)
//! ```
//!
//! A status update may in principle be observed before the submission
//! response resolves; ordering is reconciled by the controller, which
//! only applies updates once the correlation id is known.

use hsp_schemas::{StatusEvent, TransactionStatus};
use hsp_msisdn::Msisdn;
use uuid::Uuid;

use crate::error::{SessionError, ValidationError};
use crate::gateway::GatewayError;

// ---------------------------------------------------------------------------
// AttemptState
// ---------------------------------------------------------------------------

/// All states a payment attempt can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptState {
    /// No live attempt; a submission is accepted.
    Idle,
    /// Running the synchronous phone/amount checks.
    Validating,
    /// Initiation request in flight.
    Submitting,
    /// Initiation accepted; waiting for a matching status event.
    AwaitingConfirmation,
    /// Provider confirmed the payment. **Terminal.**
    Succeeded,
    /// Validation, submission, provider, or timeout failure. **Terminal.**
    Failed,
    /// User dismissed the surface before resolution. **Terminal.**
    Cancelled,
}

impl AttemptState {
    /// Returns `true` if no further transitions are possible without
    /// an explicit reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// AttemptEvent
// ---------------------------------------------------------------------------

/// Events that drive state transitions in a [`PaymentAttempt`].
#[derive(Debug, Clone)]
pub enum AttemptEvent {
    /// User submitted the form.
    Submit,
    /// Synchronous checks passed; carries the canonical subscriber id.
    ValidationPassed { subscriber_id: Msisdn },
    /// Synchronous checks failed; the network is never contacted.
    ValidationFailed { error: ValidationError },
    /// Initiation response yielded a correlation id.
    SubmissionAccepted { correlation_id: String },
    /// Initiation request failed (transport, HTTP, malformed response).
    SubmissionFailed { error: GatewayError },
    /// A status event surfaced by the channel.
    StatusUpdate(StatusEvent),
    /// The confirmation wait window elapsed.
    TimedOut,
    /// User dismissed the surface.
    Cancel,
    /// Explicit return to `Idle` from a terminal state.
    Reset,
}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when an event cannot legally be applied in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: AttemptState,
    /// Debug string of the event that was rejected.
    pub event: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal attempt transition: {:?} + {}", self.from, self.event)
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// PaymentAttempt
// ---------------------------------------------------------------------------

/// One user-initiated payment attempt tracked through an explicit state
/// machine. Owned exclusively by the controller backing the active
/// payment surface; one attempt is live at a time.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    /// Client-side id, for log correlation only (never sent upstream).
    pub attempt_id: Uuid,
    /// Requested amount in whole KES.
    pub amount: u32,
    /// Canonical subscriber id, present once validation passes.
    pub subscriber_id: Option<Msisdn>,
    /// Server-issued correlation id, present once initiation succeeds.
    pub correlation_id: Option<String>,
    /// Current lifecycle state.
    pub state: AttemptState,
    /// Failure reason, present in `Failed` (and `Cancelled`).
    pub failure: Option<SessionError>,
}

impl PaymentAttempt {
    /// A fresh attempt in `Idle` with the requested amount.
    pub fn new(amount: u32) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            amount,
            subscriber_id: None,
            correlation_id: None,
            state: AttemptState::Idle,
            failure: None,
        }
    }

    /// `true` when `correlation_id` exactly equals this attempt's id.
    pub fn matches(&self, correlation_id: &str) -> bool {
        self.correlation_id.as_deref() == Some(correlation_id)
    }

    /// Apply an event to this attempt.
    ///
    /// # Errors
    /// Returns [`TransitionError`] for illegal transitions; state is
    /// unchanged in that case.
    pub fn apply(&mut self, event: AttemptEvent) -> Result<(), TransitionError> {
        use AttemptState::*;

        match (self.state, event) {
            (Idle, AttemptEvent::Submit) => self.state = Validating,

            (Validating, AttemptEvent::ValidationPassed { subscriber_id }) => {
                self.subscriber_id = Some(subscriber_id);
                self.state = Submitting;
            }
            (Validating, AttemptEvent::ValidationFailed { error }) => {
                self.failure = Some(SessionError::Validation(error));
                self.state = Failed;
            }

            (Submitting, AttemptEvent::SubmissionAccepted { correlation_id }) => {
                self.correlation_id = Some(correlation_id);
                self.state = AwaitingConfirmation;
            }
            (Submitting, AttemptEvent::SubmissionFailed { error }) => {
                self.failure = Some(SessionError::Submission(error));
                self.state = Failed;
            }

            // ------------------------------------------------------------------
            // Status reconciliation. Only a matching correlation id can move
            // the attempt; everything else is a silent no-op.
            // ------------------------------------------------------------------
            (AwaitingConfirmation, AttemptEvent::StatusUpdate(ev)) => {
                if self.matches(&ev.correlation_id) {
                    match ev.status {
                        TransactionStatus::Pending => {}
                        TransactionStatus::Completed => self.state = Succeeded,
                        TransactionStatus::Failed => {
                            self.failure = Some(SessionError::Provider {
                                detail: ev
                                    .detail
                                    .filter(|d| !d.is_empty())
                                    .unwrap_or_else(|| {
                                        "payment failed at the provider".to_string()
                                    }),
                            });
                            self.state = Failed;
                        }
                    }
                }
            }

            // Late or duplicate events in a terminal state: ignored. A
            // cancelled attempt in particular must never be reprocessed.
            (Succeeded | Failed | Cancelled, AttemptEvent::StatusUpdate(_)) => {}

            (AwaitingConfirmation, AttemptEvent::TimedOut) => {
                self.failure = Some(SessionError::Timeout);
                self.state = Failed;
            }

            (Submitting | AwaitingConfirmation, AttemptEvent::Cancel) => {
                self.failure = Some(SessionError::Cancelled);
                self.state = Cancelled;
            }
            // Cancelling twice (or after resolution) is a no-op.
            (Succeeded | Failed | Cancelled, AttemptEvent::Cancel) => {}

            (Succeeded | Failed | Cancelled, AttemptEvent::Reset) => {
                *self = Self::new(self.amount);
            }

            (state, ev) => {
                return Err(TransitionError {
                    from: state,
                    event: format!("{ev:?}"),
                });
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
