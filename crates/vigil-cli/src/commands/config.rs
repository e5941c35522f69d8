//! `vigil config`

use anyhow::Result;
use vigil_core::config::ConfigLoad;
use vigil_sos::SosConfig;

pub fn run(config: &SosConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
