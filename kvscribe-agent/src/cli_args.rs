use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kvscribe::config::{self, Config};
use rootcause::{Report, bail, prelude::ResultExt as _};
use url::Url;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file. Defaults to `$XDG_CONFIG_HOME/kvscribe/config.toml`
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Address of the vault server
    #[arg(long, env = "VAULT_ADDR", global = true)]
    pub vault_addr: Option<Url>,

    /// Vault token used for every request
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Log debug output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all configured secrets and write them to their files
    Write,
    /// Overwrite and remove every file listed in a manifest
    Scrub {
        /// Manifest written by `kvscribe write`. Defaults to `manifest` from the config
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Validate the config without contacting vault
    Check,
}

impl Cli {
    /// Loads the config and applies the flags on top
    pub fn load_config(&self) -> Result<Config, Report> {
        let path = match &self.config {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file {} does not exist", path.display());
                }
                Some(path.clone())
            }
            None => config::default_config_path(),
        };

        let mut config = Config::load(path.as_deref()).context("Could not load the config")?;

        if let Some(addr) = &self.vault_addr {
            config.vault_addr = addr.clone();
        }
        if self.token.is_some() {
            config.token.clone_from(&self.token);
        }

        Ok(config)
    }
}
