//! Ban line subsystem configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::duration::parse_duration;
use crate::state::EnforcementSettings;
use crate::xline::ApplyPolicy;

/// `[xlines]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct XLinesConfig {
    /// Seconds between expiry/enforcement sweeps (default: 5).
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,
    /// Kinds the sweep applies to connected users: any of `glines`,
    /// `klines`, `qlines`, `zlines`, plus `perm_only`.
    #[serde(default = "default_apply")]
    pub apply: Vec<String>,
    /// Show only "X-Lined" as the quit reason.
    #[serde(default)]
    pub hide_bans: bool,
    /// Notice sent to a banned user just before the disconnect.
    #[serde(default)]
    pub banner: Option<String>,
    /// Service mailbox capacity (default: 256).
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Lines loaded at startup.
    #[serde(default, rename = "line")]
    pub lines: Vec<ConfiguredLine>,
}

impl Default for XLinesConfig {
    fn default() -> Self {
        Self {
            expiry_interval_secs: default_expiry_interval_secs(),
            apply: default_apply(),
            hide_bans: false,
            banner: None,
            mailbox_capacity: default_mailbox_capacity(),
            lines: Vec::new(),
        }
    }
}

impl XLinesConfig {
    /// The sweep period.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.expiry_interval_secs)
    }

    /// Fold the `apply` list into a policy. Unknown names are skipped here
    /// and reported by validation.
    pub fn policy(&self) -> ApplyPolicy {
        self.apply
            .iter()
            .filter_map(|name| ApplyPolicy::from_apply_name(name))
            .fold(ApplyPolicy::empty(), |acc, bit| acc | bit)
    }

    /// Enforcement wording for this server.
    pub fn enforcement(&self, server_name: &str) -> EnforcementSettings {
        EnforcementSettings {
            server_name: server_name.to_string(),
            hide_bans: self.hide_bans,
            banner: self.banner.clone(),
        }
    }
}

/// One `[[xlines.line]]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfiguredLine {
    /// Type tag: `G`, `K`, `E`, `Z` or `Q`.
    #[serde(rename = "type")]
    pub line_type: char,
    /// Pattern in the form the type expects.
    pub mask: String,
    pub reason: String,
    /// Optional lifetime such as `7d`; absent means permanent.
    #[serde(default)]
    pub duration: Option<String>,
}

impl ConfiguredLine {
    /// Lifetime in seconds, `0` for permanent. `None` if unparsable.
    pub fn duration_secs(&self) -> Option<i64> {
        match &self.duration {
            Some(text) => parse_duration(text),
            None => Some(0),
        }
    }
}

fn default_expiry_interval_secs() -> u64 {
    5
}

fn default_apply() -> Vec<String> {
    ["glines", "klines", "qlines", "zlines"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_mailbox_capacity() -> usize {
    256
}
