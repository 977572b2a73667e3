//! Wire types shared between the portal client crates.
//!
//! Field names follow the backend's JSON contract (camelCase), so every
//! struct here carries explicit serde renames. Anything with actual logic
//! lives elsewhere; the only code in this crate is the pair of
//! compatibility shims the backend forces on us:
//!
//! 1. The initiation response returns the correlation id under **either**
//!    `checkoutRequestId` or `transactionId` depending on which backend
//!    code path handled the request ([`InitiationResponse::correlation_id`]).
//! 2. The `error` field of a failure response is either a bare string or
//!    an object carrying `message` ([`ErrorField`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transaction status
// ---------------------------------------------------------------------------

/// Status carried by a transaction-update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Push prompt delivered; payer has not acted yet.
    Pending,
    /// Provider confirmed the payment.
    Completed,
    /// Provider rejected or the payer declined.
    Failed,
}

impl TransactionStatus {
    /// `true` for statuses that end the attempt (`Completed` / `Failed`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Status event (transaction-update topic)
// ---------------------------------------------------------------------------

/// Asynchronous payment notification pushed on the transaction-update topic.
///
/// Relevant to an attempt only when `correlation_id` equals the id stored
/// from the initiation response — matching is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub correlation_id: String,
    pub status: TransactionStatus,
    /// Provider-specific free text (e.g. the carrier's decline reason).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Session event (session-update topic)
// ---------------------------------------------------------------------------

/// Hotspot session notification pushed on the session-update topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub subscriber_id: String,
    pub plan_id: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_utc: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Initiation request / response
// ---------------------------------------------------------------------------

/// Body of the payment initiation POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationRequest {
    /// Canonical international-format subscriber number.
    pub subscriber_id: String,
    /// Positive amount in whole KES.
    pub amount: u32,
    /// Opaque plan identifier echoed back in reporting.
    pub plan_reference: String,
}

/// The `error` field of a failure response: bare string on some backend
/// paths, `{ "message": ... }` object on others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorField {
    Text(String),
    Detailed { message: String },
}

impl ErrorField {
    pub fn message(&self) -> &str {
        match self {
            ErrorField::Text(s) => s,
            ErrorField::Detailed { message } => message,
        }
    }
}

/// Response body of the payment initiation POST.
///
/// A success carries the correlation id under one of two field names (see
/// crate docs); a failure carries `error`. Absence of all three is treated
/// by callers as an unknown-error failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorField>,
}

impl InitiationResponse {
    /// The correlation id, whichever field the backend used.
    ///
    /// `checkoutRequestId` wins when both are present. Empty strings are
    /// treated as absent — a blank id can never match a status event.
    pub fn correlation_id(&self) -> Option<&str> {
        self.checkout_request_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.transaction_id.as_deref().filter(|s| !s.is_empty()))
    }

    /// The display-ready error message, if the backend supplied one.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message())
    }
}

// ---------------------------------------------------------------------------
// Plan catalog record
// ---------------------------------------------------------------------------

/// One purchasable access plan as supplied by the catalog provider.
///
/// The payment core reads only `id` and `price`; the rest is presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Price in whole KES.
    pub price: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_from_checkout_field() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"checkoutRequestId":"ws_CO_1","message":"ok"}"#).unwrap();
        assert_eq!(resp.correlation_id(), Some("ws_CO_1"));
    }

    #[test]
    fn correlation_id_from_transaction_field() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"transactionId":"txn-42"}"#).unwrap();
        assert_eq!(resp.correlation_id(), Some("txn-42"));
    }

    #[test]
    fn checkout_field_wins_when_both_present() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"checkoutRequestId":"a","transactionId":"b"}"#).unwrap();
        assert_eq!(resp.correlation_id(), Some("a"));
    }

    #[test]
    fn empty_correlation_id_treated_as_absent() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"checkoutRequestId":"","transactionId":"b"}"#).unwrap();
        assert_eq!(resp.correlation_id(), Some("b"));
    }

    #[test]
    fn error_as_bare_string() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"error":"request cancelled by user"}"#).unwrap();
        assert_eq!(resp.error_message(), Some("request cancelled by user"));
    }

    #[test]
    fn error_as_object_with_message() {
        let resp: InitiationResponse =
            serde_json::from_str(r#"{"error":{"message":"insufficient funds"}}"#).unwrap();
        assert_eq!(resp.error_message(), Some("insufficient funds"));
    }

    #[test]
    fn empty_body_has_neither_id_nor_error() {
        let resp: InitiationResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.correlation_id(), None);
        assert_eq!(resp.error_message(), None);
    }

    #[test]
    fn status_event_decodes_lowercase_status() {
        let ev: StatusEvent = serde_json::from_str(
            r#"{"correlationId":"ws_CO_1","status":"completed","detail":"MPesa receipt ABC123"}"#,
        )
        .unwrap();
        assert_eq!(ev.status, TransactionStatus::Completed);
        assert!(ev.status.is_terminal());
        assert_eq!(ev.detail.as_deref(), Some("MPesa receipt ABC123"));
    }

    #[test]
    fn pending_status_is_not_terminal() {
        let ev: StatusEvent =
            serde_json::from_str(r#"{"correlationId":"x","status":"pending"}"#).unwrap();
        assert!(!ev.status.is_terminal());
        assert_eq!(ev.detail, None);
    }

    #[test]
    fn initiation_request_serializes_camel_case() {
        let req = InitiationRequest {
            subscriber_id: "254712345678".to_string(),
            amount: 130,
            plan_reference: "plan-6".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["subscriberId"], "254712345678");
        assert_eq!(json["amount"], 130);
        assert_eq!(json["planReference"], "plan-6");
    }
}
