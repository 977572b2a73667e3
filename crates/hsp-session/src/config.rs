//! Runtime configuration for the payment session.
//!
//! Env-variable based with safe defaults, matching how the rest of the
//! portal tooling is configured. The binary loads `.env.local` before
//! calling [`SessionConfig::from_env`]; library code never touches the
//! process environment on its own.

use std::time::Duration;

/// Default confirmation wait window. Must stay inside the 60–120 s band
/// the push-payment provider recommends for prompt expiry.
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_secs(90);

const DEFAULT_GATEWAY_URL: &str = "http://localhost:5000";
const DEFAULT_CHANNEL_URL: &str = "ws://localhost:5000/ws";

/// Endpoints and policy knobs for one payment surface.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the portal backend (the initiation POST goes to
    /// `{gateway_url}/stkpush`).
    pub gateway_url: String,
    /// WebSocket URL of the notification service.
    pub channel_url: String,
    /// How long `AwaitingConfirmation` waits before failing with a
    /// timeout, independent of channel connectivity.
    pub confirm_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            channel_url: DEFAULT_CHANNEL_URL.to_string(),
            confirm_window: DEFAULT_CONFIRM_WINDOW,
        }
    }
}

impl SessionConfig {
    /// Build from `HSP_GATEWAY_URL`, `HSP_CHANNEL_URL` and
    /// `HSP_CONFIRM_WINDOW_SECS`, falling back to defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gateway_url: std::env::var("HSP_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            channel_url: std::env::var("HSP_CHANNEL_URL").unwrap_or(defaults.channel_url),
            confirm_window: std::env::var("HSP_CONFIRM_WINDOW_SECS")
                .ok()
                .and_then(|raw| parse_window_secs(&raw))
                .unwrap_or(defaults.confirm_window),
        }
    }
}

/// Parse a positive seconds value; zero and garbage are rejected so a
/// misconfigured window can never make every attempt time out instantly.
fn parse_window_secs(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_the_recommended_band() {
        let cfg = SessionConfig::default();
        assert!(cfg.confirm_window >= Duration::from_secs(60));
        assert!(cfg.confirm_window <= Duration::from_secs(120));
        assert!(cfg.gateway_url.starts_with("http"));
        assert!(cfg.channel_url.starts_with("ws"));
    }

    #[test]
    fn window_parses_positive_seconds() {
        assert_eq!(parse_window_secs("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_window_secs(" 60 "), Some(Duration::from_secs(60)));
    }

    #[test]
    fn window_rejects_zero_and_garbage() {
        assert_eq!(parse_window_secs("0"), None);
        assert_eq!(parse_window_secs("-5"), None);
        assert_eq!(parse_window_secs("ninety"), None);
        assert_eq!(parse_window_secs(""), None);
    }
}
