//! Agent configuration: a JSON file of targets, or command-line flags.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use hoststat_core::config::SshConfig;

/// Default collection interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Minimum allowed collection interval in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 500;

/// Target id used for the agent's own host by `--self`.
pub const SELF_TARGET_ID: &str = "self";

/// A host to sample.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    /// The host the agent runs on.
    Local { id: String },
    /// A remote Linux host reached over SSH.
    Ssh { id: String, ssh: SshConfig },
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Target::Local { id } | Target::Ssh { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Include per-core usage in every notification.
    #[serde(default)]
    pub per_core: bool,
    /// Stop each target after this many samples.
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            per_core: false,
            count: None,
            targets: Vec::new(),
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl AgentConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Interval clamped to the supported minimum.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.max(MIN_INTERVAL_MS)
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("No targets configured (use --self or --config)");
        }
        if self.count == Some(0) {
            bail!("--count must be at least 1");
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.id()) {
                bail!("Duplicate target id: '{}'", target.id());
            }
            if let Target::Ssh { id, ssh } = target {
                ssh.validate()
                    .with_context(|| format!("Invalid SSH settings for target '{id}'"))?;
            }
        }
        Ok(())
    }
}

/// What the command line asks the agent to do.
#[derive(Debug)]
pub enum Command {
    Version,
    Help,
    Run(AgentConfig),
}

/// Parse command-line arguments (without the program name).
///
/// Flags given alongside `--config` override the file's values.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let mut config_path: Option<String> = None;
    let mut include_self = false;
    let mut interval_ms: Option<u64> = None;
    let mut count: Option<u64> = None;
    let mut per_core = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" => return Ok(Command::Version),
            "--help" => return Ok(Command::Help),
            "--self" => include_self = true,
            "--per-core" => per_core = true,
            "--config" => config_path = Some(flag_value(&mut iter, arg)?.to_string()),
            "--interval-ms" => interval_ms = Some(parse_number(&mut iter, arg)?),
            "--count" => count = Some(parse_number(&mut iter, arg)?),
            other => bail!("Unknown option: {other}"),
        }
    }

    let mut config = match config_path {
        Some(path) => AgentConfig::load(Path::new(&path))?,
        None => AgentConfig::default(),
    };

    if include_self && !config.targets.iter().any(|t| t.id() == SELF_TARGET_ID) {
        config.targets.insert(
            0,
            Target::Local {
                id: SELF_TARGET_ID.to_string(),
            },
        );
    }
    if let Some(ms) = interval_ms {
        config.interval_ms = ms;
    }
    if count.is_some() {
        config.count = count;
    }
    config.per_core |= per_core;

    config.validate()?;
    Ok(Command::Run(config))
}

fn flag_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str> {
    iter.next()
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

fn parse_number(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<u64> {
    let value = flag_value(iter, flag)?;
    value
        .parse()
        .with_context(|| format!("Invalid value for {flag}: '{value}'"))
}
