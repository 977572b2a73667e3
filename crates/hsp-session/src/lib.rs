//! hsp-session
//!
//! Payment request lifecycle manager for the portal: the one component
//! with genuine state-machine and correlation logic. Validates the
//! subscriber number (hsp-msisdn), submits the initiation request over
//! HTTP, and reconciles it with the asynchronous status update arriving
//! on the notification channel (hsp-channel) — the provider's
//! confirmation is decoupled in both time and transport from the HTTP
//! response of the initiation call.

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod state_machine;

pub use config::SessionConfig;
pub use controller::{EventSource, SessionController, SessionStatus};
pub use error::{SessionError, ValidationError};
pub use gateway::{GatewayError, HttpGateway, InitiationAck, InitiationGateway};
pub use state_machine::{AttemptEvent, AttemptState, PaymentAttempt, TransitionError};
