//! Canonical MSISDN normalization and validation for the portal.
//!
//! This crate converts raw user phone input into a canonical
//! international-format subscriber identifier and decides whether that
//! identifier may be submitted to the payment provider.
//!
//! It does **not**:
//! - talk to the network (pure and synchronous throughout)
//! - persist anything (identifiers are derived per call and discarded)
//! - encode carrier policy in code (that is the table in `prefix.rs`)

use std::fmt;

pub mod prefix;

use prefix::{lookup, Carrier};

/// Kenyan country code, without `+`.
pub const COUNTRY_CODE: &str = "254";

/// Domestic trunk prefix replaced by the country code during normalization.
const TRUNK_PREFIX: char = '0';

/// Canonical length: country code plus a nine-digit subscriber part.
pub const CANONICAL_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Msisdn
// ---------------------------------------------------------------------------

/// A normalized subscriber identifier in full international form.
///
/// Construction via [`normalize`] guarantees the digits-only invariant but
/// **not** validity — call [`Msisdn::is_valid`] (or
/// [`validate_for_payment`]) before submitting anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Msisdn(String);

impl Msisdn {
    /// The canonical digit string, e.g. `"254712345678"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The nine-digit subscriber part after the country code.
    fn subscriber_part(&self) -> &str {
        &self.0[COUNTRY_CODE.len()..]
    }

    /// `true` when the id has canonical length and an allocated prefix.
    pub fn is_valid(&self) -> bool {
        self.0.len() == CANONICAL_LEN && lookup(self.subscriber_part()).is_some()
    }

    /// `true` when the id is valid **and** its range is accepted by the
    /// payment provider. Strictly narrower than [`Msisdn::is_valid`].
    pub fn is_eligible_carrier(&self) -> bool {
        self.0.len() == CANONICAL_LEN
            && lookup(self.subscriber_part()).is_some_and(|e| e.eligible)
    }

    /// The carrier owning this number's range, when allocated.
    pub fn carrier(&self) -> Option<Carrier> {
        if self.0.len() != CANONICAL_LEN {
            return None;
        }
        lookup(self.subscriber_part()).map(|e| e.carrier)
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a raw input cannot be submitted for payment.
///
/// `IneligibleCarrier` is deliberately distinct from `InvalidNumber`: the
/// first is a well-formed number on the wrong network, the second is not a
/// usable number at all. The presentation layer shows different guidance
/// for each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsisdnError {
    /// The input does not normalize to a valid number in the plan.
    InvalidNumber { canonical: String },
    /// Valid number, but its carrier is not supported by the provider.
    IneligibleCarrier { carrier: Carrier },
}

impl fmt::Display for MsisdnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MsisdnError::InvalidNumber { canonical } => {
                write!(
                    f,
                    "invalid phone number '{canonical}': expected format 254XXXXXXXXX"
                )
            }
            MsisdnError::IneligibleCarrier { carrier } => {
                write!(
                    f,
                    "{} numbers are not supported by the payment provider",
                    carrier.as_str()
                )
            }
        }
    }
}

impl std::error::Error for MsisdnError {}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize raw user input to canonical international form.
///
/// Rules, applied in order:
/// 1. Strip every non-digit character (`+`, spaces, dashes, anything).
/// 2. A leading trunk `0` is replaced by the country code.
/// 3. A digit string not starting with the country code gets it prepended.
///
/// Idempotent: normalizing an already-canonical id returns it unchanged.
/// Never fails — garbage input yields an `Msisdn` that fails validation.
pub fn normalize(raw: &str) -> Msisdn {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let canonical = if let Some(rest) = strip_trunk_prefix(&digits) {
        format!("{COUNTRY_CODE}{rest}")
    } else if digits.starts_with(COUNTRY_CODE) {
        digits
    } else {
        format!("{COUNTRY_CODE}{digits}")
    };

    Msisdn(canonical)
}

/// Strip a single leading trunk `0`, if present.
fn strip_trunk_prefix(digits: &str) -> Option<&str> {
    digits.strip_prefix(TRUNK_PREFIX)
}

/// Normalize and gate `raw` for submission to the payment provider.
///
/// # Errors
/// - [`MsisdnError::InvalidNumber`] when the canonical form fails the
///   numbering-plan check (wrong length or unallocated prefix).
/// - [`MsisdnError::IneligibleCarrier`] when the number is valid but its
///   range is not accepted by the provider.
pub fn validate_for_payment(raw: &str) -> Result<Msisdn, MsisdnError> {
    let id = normalize(raw);
    if !id.is_valid() {
        return Err(MsisdnError::InvalidNumber {
            canonical: id.0,
        });
    }
    if !id.is_eligible_carrier() {
        // is_valid passed, so the carrier lookup cannot miss here.
        let carrier = id.carrier().unwrap_or(Carrier::Safaricom);
        return Err(MsisdnError::IneligibleCarrier { carrier });
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- normalize ---

    #[test]
    fn trunk_prefix_replaced_by_country_code() {
        assert_eq!(normalize("0712345678").as_str(), "254712345678");
    }

    #[test]
    fn alternate_trunk_range_replaced_the_same_way() {
        assert_eq!(normalize("0112345678").as_str(), "254112345678");
    }

    #[test]
    fn canonical_input_unchanged() {
        assert_eq!(normalize("254712345678").as_str(), "254712345678");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["0712345678", "254712345678", "712345678", "+254 712-345-678"] {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "raw input {raw:?}");
        }
    }

    #[test]
    fn country_code_prepended_when_absent() {
        assert_eq!(normalize("712345678").as_str(), "254712345678");
    }

    #[test]
    fn symbols_and_whitespace_stripped() {
        assert_eq!(normalize("+254 712 345 678").as_str(), "254712345678");
        assert_eq!(normalize("(0712) 345-678").as_str(), "254712345678");
    }

    #[test]
    fn trunk_replacement_preserves_remaining_length() {
        let id = normalize("0712345678");
        // "0712345678" drops the trunk digit and gains the country code.
        assert_eq!(id.as_str().len(), CANONICAL_LEN);
        assert!(id.as_str().starts_with(COUNTRY_CODE));
        assert!(id.as_str().ends_with("712345678"));
    }

    #[test]
    fn empty_input_yields_bare_country_code() {
        let id = normalize("");
        assert_eq!(id.as_str(), "254");
        assert!(!id.is_valid());
    }

    // --- is_valid ---

    #[test]
    fn valid_safaricom_number() {
        assert!(normalize("0712345678").is_valid());
    }

    #[test]
    fn valid_airtel_number() {
        assert!(normalize("0733123456").is_valid());
    }

    #[test]
    fn too_short_is_invalid() {
        assert!(!normalize("07123456").is_valid());
    }

    #[test]
    fn too_long_is_invalid() {
        assert!(!normalize("07123456789").is_valid());
    }

    #[test]
    fn unallocated_prefix_is_invalid() {
        // 76x is not in the table.
        assert!(!normalize("0761234567").is_valid());
    }

    #[test]
    fn alpha_only_input_is_invalid() {
        assert!(!normalize("call me maybe").is_valid());
    }

    // --- is_eligible_carrier ---

    #[test]
    fn safaricom_is_eligible() {
        assert!(normalize("0712345678").is_eligible_carrier());
        assert!(normalize("0112345678").is_eligible_carrier());
    }

    #[test]
    fn airtel_is_valid_but_not_eligible() {
        let id = normalize("0733123456");
        assert!(id.is_valid());
        assert!(!id.is_eligible_carrier());
        assert_eq!(id.carrier(), Some(Carrier::Airtel));
    }

    #[test]
    fn invalid_number_is_never_eligible() {
        assert!(!normalize("07123").is_eligible_carrier());
    }

    // --- validate_for_payment ---

    #[test]
    fn spec_scenario_0712345678() {
        let id = validate_for_payment("0712345678").unwrap();
        assert_eq!(id.as_str(), "254712345678");
    }

    #[test]
    fn spec_scenario_0112345678() {
        let id = validate_for_payment("0112345678").unwrap();
        assert_eq!(id.as_str(), "254112345678");
    }

    #[test]
    fn invalid_number_error_is_distinct() {
        let err = validate_for_payment("12345").unwrap_err();
        assert!(matches!(err, MsisdnError::InvalidNumber { .. }));
        assert!(err.to_string().contains("254XXXXXXXXX"));
    }

    #[test]
    fn ineligible_carrier_error_is_distinct() {
        let err = validate_for_payment("0733123456").unwrap_err();
        assert!(matches!(
            err,
            MsisdnError::IneligibleCarrier {
                carrier: Carrier::Airtel
            }
        ));
        assert!(err.to_string().contains("Airtel"));
    }

    #[test]
    fn telkom_rejected_as_ineligible_not_invalid() {
        let err = validate_for_payment("0771234567").unwrap_err();
        assert!(matches!(err, MsisdnError::IneligibleCarrier { .. }));
    }
}
