//! Payment initiation boundary.
//!
//! This module defines the gateway trait and the production HTTP adapter.
//! It owns the two backend compatibility shims (dual correlation field
//! names, string-or-object error field) via `hsp_schemas::InitiationResponse`;
//! everything downstream sees a clean `InitiationAck` or `GatewayError`.

use std::fmt;

use async_trait::async_trait;
use hsp_schemas::{InitiationRequest, InitiationResponse};
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors an [`InitiationGateway`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network or transport failure (DNS, refused, timed out).
    Transport(String),
    /// The gateway answered with an application-level error.
    Api { status: Option<u16>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Success response without a correlation id under either accepted
    /// field name — the attempt cannot be reconciled, so it fails.
    MissingCorrelationId,
}

impl GatewayError {
    /// Display-ready text. API messages are passed through verbatim so the
    /// user sees exactly what the backend said (e.g. "insufficient funds").
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Transport(_) => {
                "could not reach the payment service; check your connection and try again"
                    .to_string()
            }
            GatewayError::Api { message, .. } => message.clone(),
            GatewayError::Decode(_) => {
                "the payment service returned an unreadable response".to_string()
            }
            GatewayError::MissingCorrelationId => {
                "the payment service accepted the request but returned no reference id"
                    .to_string()
            }
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(msg) => write!(f, "transport error: {msg}"),
            GatewayError::Api {
                status: Some(code),
                message,
            } => write!(f, "gateway error http={code}: {message}"),
            GatewayError::Api {
                status: None,
                message,
            } => write!(f, "gateway error: {message}"),
            GatewayError::Decode(msg) => write!(f, "decode error: {msg}"),
            GatewayError::MissingCorrelationId => {
                write!(f, "success response carried no correlation id")
            }
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Successful initiation: the push prompt is on its way to the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiationAck {
    /// Server-issued id matched against later status events.
    pub correlation_id: String,
    /// Optional human-readable note from the gateway.
    pub message: Option<String>,
}

/// Payment initiation contract.
///
/// Object-safe so callers can hold a `Box<dyn InitiationGateway>` without
/// knowing the concrete transport.
#[async_trait]
pub trait InitiationGateway: Send + Sync {
    /// Submit one initiation request and await the HTTP response.
    async fn initiate(&self, req: &InitiationRequest) -> Result<InitiationAck, GatewayError>;
}

// ---------------------------------------------------------------------------
// HTTP adapter
// ---------------------------------------------------------------------------

/// Production gateway: JSON POST to the portal backend's `/stkpush`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn push_url(&self) -> String {
        format!("{}/stkpush", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl InitiationGateway for HttpGateway {
    async fn initiate(&self, req: &InitiationRequest) -> Result<InitiationAck, GatewayError> {
        let resp = self
            .http
            .post(self.push_url())
            .json(req)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        let body: InitiationResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) if status.is_success() => return Err(GatewayError::Decode(e.to_string())),
            // Non-success with an unreadable body: report the status.
            Err(_) => {
                return Err(GatewayError::Api {
                    status: Some(status.as_u16()),
                    message: format!("payment gateway returned http {}", status.as_u16()),
                })
            }
        };

        if !status.is_success() {
            let message = body
                .error_message()
                .map(str::to_string)
                .or_else(|| body.message.clone())
                // Neither `error` nor `message`: unknown-error failure.
                .unwrap_or_else(|| "unknown error from payment gateway".to_string());
            return Err(GatewayError::Api {
                status: Some(status.as_u16()),
                message,
            });
        }

        if let Some(err) = &body.error {
            return Err(GatewayError::Api {
                status: None,
                message: err.message().to_string(),
            });
        }

        match body.correlation_id() {
            Some(id) => {
                debug!(correlation_id = id, "initiation accepted");
                Ok(InitiationAck {
                    correlation_id: id.to_string(),
                    message: body.message.clone(),
                })
            }
            None => Err(GatewayError::MissingCorrelationId),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
