//! `vigil message` - preview the alert text

use anyhow::Result;
use clap::Args;
use vigil_sos::{compose_alert_message, SosConfig};

use super::LocationArgs;

/// Arguments for `vigil message`
#[derive(Args, Debug)]
pub struct MessageArgs {
    #[command(flatten)]
    location: LocationArgs,

    /// Battery percentage to include
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    battery: u8,

    /// Live location link to append
    #[arg(long)]
    live_link: Option<String>,
}

pub fn run(config: &SosConfig, args: &MessageArgs) -> Result<()> {
    let alert = compose_alert_message(
        &config.message,
        args.location.coordinate()?,
        args.battery,
        args.live_link.as_deref(),
    );
    println!("{}", alert.text);
    Ok(())
}
