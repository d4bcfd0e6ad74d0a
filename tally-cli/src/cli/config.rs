use anyhow::Context;
use serde::{Deserialize, Serialize};
use sim_time::TimeConfig;
use tally_ledger::AssetScales;
use tally_tracing::TracingConfig;

use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub asset_scales: AssetScales,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

impl Config {
    pub fn load_config(path: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        let config = if let Some(config_path) = path {
            let config_file =
                std::fs::read_to_string(config_path).context("Couldn't read config file")?;
            serde_yaml::from_str(&config_file).context("Couldn't parse config file")?
        } else {
            eprintln!("No config file provided, using default config.");
            Config::default()
        };
        Ok(config)
    }
}
