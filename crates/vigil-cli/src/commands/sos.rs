//! `vigil sos` - run one trigger against host effects

use anyhow::{bail, Result};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vigil_core::effects::DocumentStoreEffects;
use vigil_effects::HostEffects;
use vigil_sos::records::CHATS;
use vigil_sos::{
    AccelerometerSample, SosConfig, SosContext, SosCoordinator, SosOutcome, SosPhase, SosReport,
    StartDecision, TriggerSource,
};

use super::LocationArgs;

/// Arguments for `vigil sos`
#[derive(Args, Debug)]
pub struct SosArgs {
    #[command(flatten)]
    location: LocationArgs,

    /// Skip the countdown
    #[arg(long, conflicts_with = "simulate_shake")]
    immediate: bool,

    /// Start by feeding a shake gesture to the accelerometer path
    #[arg(long)]
    simulate_shake: bool,

    /// Countdown length, overriding the config
    #[arg(long)]
    countdown: Option<u32>,

    /// Cancel the countdown after this many seconds
    #[arg(long)]
    cancel_after: Option<u64>,

    /// Battery fraction to report (0.0-1.0); omit to simulate an unsupported device
    #[arg(long)]
    battery: Option<f32>,

    /// Simulate a device without SMS
    #[arg(long)]
    no_sms: bool,

    /// Chat participants to seed a demo thread with
    #[arg(long, value_delimiter = ',', default_value = "guardian")]
    thread_with: Vec<String>,
}

/// Run one trigger and print what happened
pub async fn run(mut config: SosConfig, user: &str, args: SosArgs) -> Result<()> {
    if let Some(seconds) = args.countdown {
        config.countdown_seconds = seconds;
    }

    let effects = Arc::new(
        HostEffects::new(args.location.coordinate()?)
            .with_battery(args.battery)
            .with_sms_available(!args.no_sms),
    );
    seed_thread(&effects, user, &args.thread_with).await?;

    let context = SosContext::new(user).with_auto_activate(args.simulate_shake);
    let sos = SosCoordinator::new(Arc::clone(&effects), config, context)?;
    let mut outcomes = sos.outcomes();
    let mut phase = sos.watch_phase();

    let decision = if args.immediate {
        sos.trigger_now(TriggerSource::Manual).await?
    } else if args.simulate_shake {
        shake(&sos).await?
    } else {
        sos.start(TriggerSource::Manual).await?
    };
    if decision != StartDecision::Started {
        bail!("trigger not started: {decision:?}");
    }

    if let Some(seconds) = args.cancel_after {
        let canceller = sos.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            canceller.cancel();
        });
    }

    let outcome = loop {
        tokio::select! {
            outcome = outcomes.recv() => break outcome?,
            changed = phase.changed() => {
                changed?;
                let current = *phase.borrow_and_update();
                if let SosPhase::CountingDown { remaining } = current {
                    println!("SOS in {remaining}s (press Ctrl-C or use --cancel-after to abort)");
                }
            }
        }
    };

    match outcome {
        SosOutcome::Sent(report) => print_report(&sos, &report),
        SosOutcome::Cancelled => println!("SOS cancelled"),
        SosOutcome::Aborted(err) => println!("SOS aborted: {err}"),
    }

    sos.shutdown().await;
    Ok(())
}

async fn shake(sos: &SosCoordinator<HostEffects>) -> Result<StartDecision> {
    for (step, timestamp_ms) in (0..10_u64).map(|i| i * 80).enumerate() {
        let x = if step % 2 == 0 { 3.0 } else { -3.0 };
        if let Some(decision) = sos
            .on_motion(AccelerometerSample::new(x, 0.5, 1.0, timestamp_ms))
            .await?
        {
            return Ok(decision);
        }
    }
    bail!("shake gesture not recognised with the configured thresholds")
}

async fn seed_thread(effects: &HostEffects, user: &str, others: &[String]) -> Result<()> {
    if others.is_empty() {
        return Ok(());
    }
    let mut participants = vec![user.to_string()];
    participants.extend(others.iter().cloned());
    let thread = match json!({ "participants": participants, "lastMessage": "" }) {
        serde_json::Value::Object(map) => map,
        _ => bail!("thread document is not an object"),
    };
    effects.set(CHATS, "demo-thread", thread).await?;
    Ok(())
}

fn print_report(sos: &SosCoordinator<HostEffects>, report: &SosReport) {
    println!("=== SOS sent ===");
    println!("{}", report.dispatch.alert.text);
    println!("---");
    println!("Trigger: {:?}", report.source);
    println!("SMS: {}", report.dispatch.sms.label());
    println!("Chat: {}", report.dispatch.chat.label());
    if let Some(id) = report.alert_id.as_deref() {
        println!("Alert record: {id}");
    }
    match report.live_session {
        Some(id) => println!("Live session: {}", sos.live_sessions().share_link(id)),
        None => println!("Live session: none"),
    }
    for failure in &report.failures {
        println!("Note: {failure}");
    }
}
