//! Optional TOML configuration for the `fncall` CLI.
//!
//! ```toml
//! hammer_role = "assistant"
//!
//! # Used by `extract` and `stream` when --model is not given
//! [format]
//! syntax = "json"
//! fence_start = "<tool_call>"
//! fence_end = "</tool_call>"
//! role = "assistant"
//!
//! [stream]
//! on_error = "resume"
//! ```

use anyhow::{Context, Result};
use fncall_core::{ResponseFormat, StreamOptions};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Custom fence convention, used when no --model is given.
    #[serde(default)]
    pub format: Option<ResponseFormat>,
    #[serde(default)]
    pub stream: StreamOptions,
    /// Agent role expected in Hammer chat markers.
    #[serde(default)]
    pub hammer_role: Option<String>,
}

impl CliConfig {
    /// Load from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
