//! Wire frames exchanged with the notification service.
//!
//! Inbound: JSON text frames `{"topic": "...", "payload": {...}}` where the
//! topic selects the payload shape. Outbound: subscription declarations
//! `{"action": "subscribe", "topic": "..."}`. Anything that does not parse
//! is the caller's problem to log and drop — decoding here is total and
//! side-effect free.

use std::fmt;

use hsp_schemas::{SessionEvent, StatusEvent};
use serde::{Deserialize, Serialize};

/// Inbound topic names used by the notification service.
const TOPIC_PAYMENT_UPDATE: &str = "payment:update";
const TOPIC_SESSION_UPDATE: &str = "session:update";

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Subscribable event topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Payment transaction updates (`payment:update` frames).
    Transactions,
    /// Hotspot session updates (`session:update` frames).
    Sessions,
}

impl Topic {
    /// All topics the portal subscribes to on every (re)connect.
    pub const ALL: &'static [Topic] = &[Topic::Transactions, Topic::Sessions];

    /// Name used in outbound subscription frames.
    pub fn subscription_name(&self) -> &'static str {
        match self {
            Topic::Transactions => "transactions",
            Topic::Sessions => "sessions",
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A decoded inbound event, demultiplexed by topic.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Payment(StatusEvent),
    Session(SessionEvent),
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Why an inbound frame was dropped.
#[derive(Debug)]
pub enum DecodeError {
    /// Not valid JSON or missing the envelope fields.
    Malformed(serde_json::Error),
    /// Valid envelope but a topic this client does not track.
    UnknownTopic(String),
    /// Known topic but the payload does not match its schema.
    BadPayload {
        topic: &'static str,
        source: serde_json::Error,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(e) => write!(f, "malformed frame: {e}"),
            DecodeError::UnknownTopic(t) => write!(f, "unknown topic '{t}'"),
            DecodeError::BadPayload { topic, source } => {
                write!(f, "bad payload on topic '{topic}': {source}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Deserialize)]
struct ServerFrame {
    topic: String,
    payload: serde_json::Value,
}

/// Decode one inbound text frame into a [`ChannelEvent`].
pub fn decode_frame(raw: &str) -> Result<ChannelEvent, DecodeError> {
    let frame: ServerFrame = serde_json::from_str(raw).map_err(DecodeError::Malformed)?;
    match frame.topic.as_str() {
        TOPIC_PAYMENT_UPDATE => serde_json::from_value(frame.payload)
            .map(ChannelEvent::Payment)
            .map_err(|source| DecodeError::BadPayload {
                topic: TOPIC_PAYMENT_UPDATE,
                source,
            }),
        TOPIC_SESSION_UPDATE => serde_json::from_value(frame.payload)
            .map(ChannelEvent::Session)
            .map_err(|source| DecodeError::BadPayload {
                topic: TOPIC_SESSION_UPDATE,
                source,
            }),
        other => Err(DecodeError::UnknownTopic(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SubscribeFrame<'a> {
    action: &'static str,
    topic: &'a str,
}

/// Outbound subscription declaration for `topic`.
///
/// Subscription is idempotent server-side, so resending the same frame on
/// every reconnect is safe.
pub fn subscribe_frame(topic: Topic) -> String {
    // Serializing a two-field struct of static strings cannot fail.
    serde_json::to_string(&SubscribeFrame {
        action: "subscribe",
        topic: topic.subscription_name(),
    })
    .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hsp_schemas::TransactionStatus;

    #[test]
    fn decode_payment_update() {
        let raw = r#"{"topic":"payment:update","payload":{"correlationId":"ws_CO_1","status":"completed","detail":"ok"}}"#;
        match decode_frame(raw).unwrap() {
            ChannelEvent::Payment(ev) => {
                assert_eq!(ev.correlation_id, "ws_CO_1");
                assert_eq!(ev.status, TransactionStatus::Completed);
            }
            other => panic!("expected payment event, got {other:?}"),
        }
    }

    #[test]
    fn decode_session_update() {
        let raw = r#"{"topic":"session:update","payload":{"subscriberId":"254712345678","planId":"plan-2","active":true}}"#;
        match decode_frame(raw).unwrap() {
            ChannelEvent::Session(ev) => {
                assert_eq!(ev.subscriber_id, "254712345678");
                assert!(ev.active);
            }
            other => panic!("expected session event, got {other:?}"),
        }
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            decode_frame("not json").unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }

    #[test]
    fn missing_envelope_fields_is_malformed() {
        assert!(matches!(
            decode_frame(r#"{"payload":{}}"#).unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }

    #[test]
    fn unknown_topic_is_dropped_distinctly() {
        let raw = r#"{"topic":"billing:update","payload":{}}"#;
        match decode_frame(raw).unwrap_err() {
            DecodeError::UnknownTopic(t) => assert_eq!(t, "billing:update"),
            other => panic!("expected UnknownTopic, got {other:?}"),
        }
    }

    #[test]
    fn known_topic_with_wrong_payload_is_bad_payload() {
        let raw = r#"{"topic":"payment:update","payload":{"status":"completed"}}"#;
        assert!(matches!(
            decode_frame(raw).unwrap_err(),
            DecodeError::BadPayload {
                topic: "payment:update",
                ..
            }
        ));
    }

    #[test]
    fn subscribe_frames_name_both_topics() {
        assert_eq!(
            subscribe_frame(Topic::Transactions),
            r#"{"action":"subscribe","topic":"transactions"}"#
        );
        assert_eq!(
            subscribe_frame(Topic::Sessions),
            r#"{"action":"subscribe","topic":"sessions"}"#
        );
    }
}
