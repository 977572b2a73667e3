//! Carrier prefix policy table for the Kenyan numbering plan.
//!
//! This module is **data, not logic**: when the regulator reassigns a
//! range or the payment provider starts accepting another carrier, the
//! table changes and nothing else does. Lookup is by the first two digits
//! of the nine-digit subscriber part (the digits after `254`).

/// Mobile network operators the portal can encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Carrier {
    Safaricom,
    Airtel,
    Telkom,
}

impl Carrier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Safaricom => "Safaricom",
            Carrier::Airtel => "Airtel",
            Carrier::Telkom => "Telkom",
        }
    }
}

/// One allocated subscriber-prefix range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixEntry {
    /// First two digits of the subscriber part (after the country code).
    pub prefix: &'static str,
    pub carrier: Carrier,
    /// `true` when the payment provider accepts push requests for this
    /// range. Narrower than validity: a number can be perfectly valid and
    /// still not payable here.
    pub eligible: bool,
}

/// Allocated ranges accepted by the portal.
///
/// Eligibility is restricted to the provider's home carrier (M-Pesa runs
/// on Safaricom). Ranges not listed here are invalid outright.
pub const PREFIX_TABLE: &[PrefixEntry] = &[
    // Safaricom — eligible for the push-payment provider.
    PrefixEntry { prefix: "70", carrier: Carrier::Safaricom, eligible: true },
    PrefixEntry { prefix: "71", carrier: Carrier::Safaricom, eligible: true },
    PrefixEntry { prefix: "72", carrier: Carrier::Safaricom, eligible: true },
    PrefixEntry { prefix: "74", carrier: Carrier::Safaricom, eligible: true },
    PrefixEntry { prefix: "79", carrier: Carrier::Safaricom, eligible: true },
    PrefixEntry { prefix: "11", carrier: Carrier::Safaricom, eligible: true },
    // Airtel — valid numbers, not accepted by the provider.
    PrefixEntry { prefix: "73", carrier: Carrier::Airtel, eligible: false },
    PrefixEntry { prefix: "75", carrier: Carrier::Airtel, eligible: false },
    PrefixEntry { prefix: "78", carrier: Carrier::Airtel, eligible: false },
    PrefixEntry { prefix: "10", carrier: Carrier::Airtel, eligible: false },
    // Telkom.
    PrefixEntry { prefix: "77", carrier: Carrier::Telkom, eligible: false },
];

/// Look up the table entry for a nine-digit subscriber part.
///
/// Returns `None` when the part is too short or its leading two digits are
/// not an allocated range.
pub fn lookup(subscriber_part: &str) -> Option<&'static PrefixEntry> {
    let lead = subscriber_part.get(0..2)?;
    PREFIX_TABLE.iter().find(|e| e.prefix == lead)
}
