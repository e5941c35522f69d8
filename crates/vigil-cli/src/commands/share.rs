//! `vigil share` - start a live session and follow it until it ends

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tracing::info;
use vigil_core::UserId;
use vigil_effects::HostEffects;
use vigil_sos::{LiveLocationManager, LiveLocationUpdate, LiveLocationViewer, SosConfig};

use super::LocationArgs;

/// Arguments for `vigil share`
#[derive(Args, Debug)]
pub struct ShareArgs {
    #[command(flatten)]
    location: LocationArgs,

    /// How long to share, in seconds
    #[arg(long, default_value_t = 30)]
    duration: u64,
}

/// Share until the session expires, printing each position a viewer sees
pub async fn run(config: SosConfig, user: &str, args: ShareArgs) -> Result<()> {
    let effects = Arc::new(HostEffects::new(args.location.coordinate()?));
    let manager = LiveLocationManager::new(Arc::clone(&effects), UserId::new(user), &config);

    let id = manager.start(args.duration).await?;
    println!("Sharing for {}s: {}", args.duration, manager.share_link(id));

    let mut viewer = LiveLocationViewer::follow(effects.as_ref(), id).await?;
    while let Some(update) = viewer.next().await {
        match update {
            LiveLocationUpdate::Moved {
                coordinate,
                updated_at,
                ..
            } => println!(
                "{updated_at}  {:.6}, {:.6}",
                coordinate.latitude, coordinate.longitude
            ),
            LiveLocationUpdate::Ended => {
                println!("Session ended");
                break;
            }
        }
    }

    info!(session = %id, "share finished");
    Ok(())
}
