//! hsp entry point.
//!
//! Thin operator CLI over the portal client crates: list the plan
//! catalog, check a subscriber number, run one payment attempt end to
//! end, or tail the live notification channel. All lifecycle logic
//! lives in `hsp-session`; this binary only wires config, transports
//! and terminal output together.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hsp_channel::{Channel, ChannelEvent};
use hsp_schemas::Plan;
use hsp_session::{HttpGateway, SessionConfig, SessionController, SessionStatus};
use tracing::info;

#[derive(Parser)]
#[command(name = "hsp")]
#[command(about = "Hotspot portal payment CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the purchasable access plans
    Plans,

    /// Normalize and validate a subscriber number
    Check {
        /// Number as the subscriber typed it (0712..., 254712..., +254 71 2...)
        phone: String,
    },

    /// Run one payment attempt to completion
    Pay {
        /// Subscriber number in any accepted format
        #[arg(long)]
        phone: String,

        /// Plan id (see `hsp plans`)
        #[arg(long)]
        plan: String,

        /// Override the plan price (whole KES)
        #[arg(long)]
        amount: Option<u32>,
    },

    /// Tail live payment and session events from the notification service
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present. Silent if the file does not exist;
    // deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Plans => {
            for plan in plan_catalog() {
                println!(
                    "{:<8} KES {:>4}  {}",
                    plan.id,
                    plan.price,
                    plan.time_limit.as_deref().unwrap_or("-")
                );
            }
        }

        Commands::Check { phone } => {
            let canonical = hsp_msisdn::normalize(&phone);
            let subscriber = hsp_msisdn::validate_for_payment(&phone)
                .with_context(|| format!("number rejected (canonical form: {canonical})"))?;
            println!("canonical={}", subscriber.as_str());
            println!(
                "carrier={}",
                subscriber.carrier().map(|c| c.as_str()).unwrap_or("unknown")
            );
            println!("eligible=true");
        }

        Commands::Pay {
            phone,
            plan,
            amount,
        } => {
            let catalog = plan_catalog();
            let selected = catalog
                .iter()
                .find(|p| p.id == plan)
                .with_context(|| format!("unknown plan '{plan}' (see `hsp plans`)"))?;
            let amount = amount.unwrap_or(selected.price);

            let cfg = SessionConfig::from_env();
            info!(gateway = %cfg.gateway_url, channel = %cfg.channel_url, "starting payment");

            let channel = Arc::new(Channel::connect(cfg.channel_url.clone()));
            let ctl = Arc::new(SessionController::new(
                Box::new(HttpGateway::new(cfg.gateway_url.clone())),
                Box::new(Arc::clone(&channel)),
                cfg.confirm_window,
            ));

            // Ctrl-C dismisses the attempt instead of killing the process
            // mid-flight.
            tokio::spawn({
                let ctl = Arc::clone(&ctl);
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        ctl.cancel();
                    }
                }
            });

            let printer = tokio::spawn(print_transitions(ctl.watch_status()));
            let outcome = ctl.pay(&phone, amount, &selected.id).await;
            channel.disconnect();
            // The printer exits on its own once it sees the terminal status.
            let _ = printer.await;

            match outcome {
                SessionStatus::Succeeded => {
                    println!("payment=confirmed plan={} amount={}", selected.id, amount);
                }
                other => {
                    let reason = other
                        .failure_message()
                        .unwrap_or_else(|| "payment did not complete".to_string());
                    bail!("payment failed: {reason}");
                }
            }
        }

        Commands::Watch => {
            let cfg = SessionConfig::from_env();
            let channel = Channel::connect(cfg.channel_url.clone());
            let mut events = channel.events();
            println!("watching {} (Ctrl-C to stop)", cfg.channel_url);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    ev = events.recv() => match ev {
                        Ok(ChannelEvent::Payment(ev)) => println!(
                            "payment correlation_id={} status={:?} detail={}",
                            ev.correlation_id,
                            ev.status,
                            ev.detail.as_deref().unwrap_or("-")
                        ),
                        Ok(ChannelEvent::Session(ev)) => println!(
                            "session subscriber={} plan={} active={}",
                            ev.subscriber_id, ev.plan_id, ev.active
                        ),
                        Err(_) => break,
                    }
                }
            }
            channel.disconnect();
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

/// Print each status transition until the attempt reaches a terminal
/// state (or the controller goes away).
async fn print_transitions(mut rx: tokio::sync::watch::Receiver<SessionStatus>) {
    loop {
        let status = rx.borrow_and_update().clone();
        match &status {
            SessionStatus::Idle => {}
            SessionStatus::Validating => println!("status=validating"),
            SessionStatus::Submitting => println!("status=submitting"),
            SessionStatus::AwaitingConfirmation { correlation_id } => {
                println!("status=awaiting_confirmation correlation_id={correlation_id}");
                println!("check your phone and enter your PIN to approve the payment");
            }
            SessionStatus::Succeeded => println!("status=succeeded"),
            SessionStatus::Failed { .. } => println!(
                "status=failed reason={}",
                status.failure_message().unwrap_or_default()
            ),
            SessionStatus::Cancelled => println!("status=cancelled"),
        }
        if status.is_terminal() || rx.changed().await.is_err() {
            break;
        }
    }
}

/// KES plan catalog shown on the portal landing page.
fn plan_catalog() -> Vec<Plan> {
    let raw: [(&str, u32, &str); 8] = [
        ("plan-1", 5, "30 mins"),
        ("plan-2", 10, "2 hrs"),
        ("plan-3", 20, "4 hrs"),
        ("plan-4", 35, "7 hrs"),
        ("plan-5", 75, "24 hrs"),
        ("plan-6", 130, "24 hrs"),
        ("plan-7", 375, "7 days"),
        ("plan-8", 950, "1 month"),
    ];
    raw.iter()
        .map(|(id, price, time)| Plan {
            id: (*id).to_string(),
            name: format!("{time} access"),
            price: *price,
            bandwidth_limit: None,
            time_limit: Some((*time).to_string()),
        })
        .collect()
}
