//! Cancellation scenario: dismissing the surface resolves the attempt
//! to `Cancelled` immediately, a late matching confirmation cannot
//! resurrect it, and cancel/reset stay idempotent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hsp_channel::ChannelEvent;
use hsp_schemas::{InitiationRequest, StatusEvent, TransactionStatus};
use hsp_session::{
    GatewayError, InitiationAck, InitiationGateway, SessionController, SessionStatus,
};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;

struct AcceptingGateway;

#[async_trait]
impl InitiationGateway for AcceptingGateway {
    async fn initiate(&self, _req: &InitiationRequest) -> Result<InitiationAck, GatewayError> {
        Ok(InitiationAck {
            correlation_id: "ws_CO_7".to_string(),
            message: None,
        })
    }
}

/// Never returns; stands in for a backend that hangs mid-request.
struct StalledGateway;

#[async_trait]
impl InitiationGateway for StalledGateway {
    async fn initiate(&self, _req: &InitiationRequest) -> Result<InitiationAck, GatewayError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("stalled gateway must be cancelled, never resolved")
    }
}

async fn wait_for(
    rx: &mut watch::Receiver<SessionStatus>,
    pred: impl Fn(&SessionStatus) -> bool,
) {
    timeout(Duration::from_secs(5), async {
        loop {
            if pred(&rx.borrow()) {
                return;
            }
            rx.changed().await.expect("controller dropped");
        }
    })
    .await
    .expect("expected status not reached within 5s");
}

#[tokio::test]
async fn cancel_while_awaiting_sticks_despite_late_confirmation() {
    let (bus, _keep) = broadcast::channel::<ChannelEvent>(16);
    let ctl = Arc::new(SessionController::new(
        Box::new(AcceptingGateway),
        Box::new(bus.clone()),
        Duration::from_secs(60),
    ));
    let mut status_rx = ctl.watch_status();

    let pay = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.pay("0712345678", 500, "plan-3").await }
    });

    wait_for(&mut status_rx, |s| {
        matches!(s, SessionStatus::AwaitingConfirmation { .. })
    })
    .await;

    ctl.cancel();
    let outcome = timeout(Duration::from_secs(5), pay)
        .await
        .expect("pay did not resolve")
        .unwrap();
    assert_eq!(outcome, SessionStatus::Cancelled);

    // The provider's confirmation arriving after dismissal is stale.
    bus.send(ChannelEvent::Payment(StatusEvent {
        correlation_id: "ws_CO_7".to_string(),
        status: TransactionStatus::Completed,
        detail: None,
    }))
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctl.status(), SessionStatus::Cancelled);

    // Repeated cancels are no-ops; reset returns to Idle.
    ctl.cancel();
    assert_eq!(ctl.status(), SessionStatus::Cancelled);
    ctl.reset();
    assert_eq!(ctl.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn cancel_during_submission_abandons_the_request() {
    let (bus, _keep) = broadcast::channel::<ChannelEvent>(16);
    let ctl = Arc::new(SessionController::new(
        Box::new(StalledGateway),
        Box::new(bus),
        Duration::from_secs(60),
    ));
    let mut status_rx = ctl.watch_status();

    let pay = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.pay("0712345678", 500, "plan-3").await }
    });

    wait_for(&mut status_rx, |s| matches!(s, SessionStatus::Submitting)).await;

    ctl.cancel();
    let outcome = timeout(Duration::from_secs(5), pay)
        .await
        .expect("pay did not resolve")
        .unwrap();
    assert_eq!(outcome, SessionStatus::Cancelled);
}

#[tokio::test]
async fn reset_is_ignored_while_idle_and_mid_flight() {
    let (bus, _keep) = broadcast::channel::<ChannelEvent>(16);
    let ctl = Arc::new(SessionController::new(
        Box::new(AcceptingGateway),
        Box::new(bus),
        Duration::from_secs(60),
    ));

    ctl.reset();
    assert_eq!(ctl.status(), SessionStatus::Idle);

    let mut status_rx = ctl.watch_status();
    let pay = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.pay("0712345678", 500, "plan-3").await }
    });
    wait_for(&mut status_rx, |s| {
        matches!(s, SessionStatus::AwaitingConfirmation { .. })
    })
    .await;

    // A live attempt cannot be reset out from under itself.
    ctl.reset();
    assert!(matches!(
        ctl.status(),
        SessionStatus::AwaitingConfirmation { .. }
    ));

    ctl.cancel();
    let _ = timeout(Duration::from_secs(5), pay)
        .await
        .expect("pay did not resolve");
}
