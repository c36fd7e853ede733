use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_REPLY_PORT;

pub const OPTIONS_FILE: &str = "protocol.toml";

/// Ports, timeouts and retry policy of the protocol engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolOptions {
    pub reply_port: u8,
    pub load_data_port: u8,
    pub save_ack_port: u8,

    pub reply_timeout_ms: u64,
    pub load_timeout_ms: u64,
    pub save_ack_timeout_ms: u64,
    /// Overall budget for paging through one directory listing.
    pub examine_budget_ms: u64,

    pub save_max_attempts: u32,
    pub save_retry_backoff_ms: u64,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            reply_port: DEFAULT_REPLY_PORT,
            load_data_port: 0x92,
            save_ack_port: 0x91,
            reply_timeout_ms: 2000,
            load_timeout_ms: 10000,
            save_ack_timeout_ms: 10000,
            examine_budget_ms: 2000,
            save_max_attempts: 3,
            save_retry_backoff_ms: 100,
        }
    }
}

impl ProtocolOptions {
    /// Reads `protocol.toml` from the user's config directory, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file exists but can't be read or parsed.
    pub fn load_options() -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "GitHub", "econet_fs") {
            return Self::load_from(&proj_dirs.config_dir().join(OPTIONS_FILE));
        }
        Ok(ProtocolOptions::default())
    }

    /// # Errors
    ///
    /// This function will return an error if the config directory or file can't be written.
    pub fn store_options(&self) -> anyhow::Result<()> {
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "GitHub", "econet_fs") {
            fs::create_dir_all(proj_dirs.config_dir())?;
            self.store_to(&proj_dirs.config_dir().join(OPTIONS_FILE))?;
        }
        Ok(())
    }

    pub fn load_from(options_file: &Path) -> anyhow::Result<Self> {
        if !options_file.exists() {
            return Ok(ProtocolOptions::default());
        }
        let content = fs::read_to_string(options_file).with_context(|| format!("reading {}", options_file.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", options_file.display()))
    }

    pub fn store_to(&self, options_file: &Path) -> anyhow::Result<()> {
        let mut file = File::create(options_file)?;
        file.write_all(toml::to_string(self)?.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn from_toml(input_text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(input_text)?)
    }
}
