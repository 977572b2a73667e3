//! Error taxonomy for a payment attempt.
//!
//! Five kinds, mirroring how they reach the presentation layer:
//! validation and submission errors resolve synchronously inside
//! [`crate::controller::SessionController::pay`]; provider and timeout
//! errors resolve asynchronously and replace whatever "awaiting"
//! indicator the surface is showing. Every variant renders to a
//! non-empty, user-displayable message — nothing is silently swallowed.

use std::fmt;

use hsp_msisdn::MsisdnError;

use crate::gateway::GatewayError;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Input rejected before any network contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Phone(MsisdnError),
    /// Amount must be a positive number of shillings.
    InvalidAmount { amount: u32 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Phone(e) => write!(f, "{e}"),
            ValidationError::InvalidAmount { amount } => {
                write!(f, "invalid amount: {amount} (must be positive)")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Terminal failure reason of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Bad or ineligible input; the network was never contacted.
    Validation(ValidationError),
    /// The initiation request itself failed.
    Submission(GatewayError),
    /// The provider pushed an explicit failed status.
    Provider { detail: String },
    /// No confirming event arrived within the wait window.
    Timeout,
    /// The user dismissed the surface before resolution.
    Cancelled,
}

impl SessionError {
    /// Display-ready text for the presentation layer. Always non-empty;
    /// gateway and provider detail is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Validation(e) => e.to_string(),
            SessionError::Submission(e) => e.user_message(),
            SessionError::Provider { detail } => detail.clone(),
            SessionError::Timeout => {
                "no payment confirmation received in time; \
                 if you completed the prompt the payment may still apply"
                    .to_string()
            }
            SessionError::Cancelled => "payment cancelled".to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for SessionError {}

impl From<ValidationError> for SessionError {
    fn from(e: ValidationError) -> Self {
        SessionError::Validation(e)
    }
}

impl From<GatewayError> for SessionError {
    fn from(e: GatewayError) -> Self {
        SessionError::Submission(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_non_empty_message() {
        let errors = [
            SessionError::Validation(ValidationError::InvalidAmount { amount: 0 }),
            SessionError::Submission(GatewayError::Transport("connection refused".into())),
            SessionError::Provider {
                detail: "Request cancelled by user".into(),
            },
            SessionError::Timeout,
            SessionError::Cancelled,
        ];
        for err in errors {
            assert!(!err.user_message().is_empty(), "{err:?}");
        }
    }

    #[test]
    fn provider_detail_passes_through_verbatim() {
        let err = SessionError::Provider {
            detail: "DS timeout user cannot be reached".into(),
        };
        assert_eq!(err.user_message(), "DS timeout user cannot be reached");
    }

    #[test]
    fn submission_api_message_passes_through_verbatim() {
        let err = SessionError::Submission(GatewayError::Api {
            status: Some(402),
            message: "insufficient funds".into(),
        });
        assert_eq!(err.user_message(), "insufficient funds");
    }

    #[test]
    fn invalid_amount_names_the_amount() {
        let err = SessionError::Validation(ValidationError::InvalidAmount { amount: 0 });
        assert!(err.user_message().contains('0'));
    }
}
