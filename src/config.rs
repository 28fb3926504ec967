//! Analysis configuration
//!
//! Settings come from the command line, optionally layered over a JSON or
//! YAML file given with `--config`. Flags given on the command line win.

use crate::cli::Args;
use crate::errors::{ThreatGraphError, ThreatGraphResult};
use crate::rules::DispatchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// True when the file extension marks YAML content
pub fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("yaml") | Some("yml")
    )
}

/// What to do with tracking entries that match no generated risk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanPolicy {
    /// Log each orphan as a warning and continue
    #[default]
    Warn,
    /// Keep going silently
    Ignore,
    /// Abort the run
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Category IDs to leave out
    pub skip_rules: Vec<String>,
    /// Files or directories with custom risk categories
    pub custom_rule_paths: Vec<PathBuf>,
    /// Files with additional technology definitions
    pub technology_paths: Vec<PathBuf>,
    pub orphan_policy: OrphanPolicy,
    /// Rule pool size, 0 picks the number of CPUs
    pub threads: usize,
    pub parallel: bool,
    /// Keep attractiveness values supplied by the model instead of computing them
    pub skip_raa: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            skip_rules: Vec::new(),
            custom_rule_paths: Vec::new(),
            technology_paths: Vec::new(),
            orphan_policy: OrphanPolicy::Warn,
            threads: 0,
            parallel: true,
            skip_raa: false,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> ThreatGraphResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ThreatGraphError::io(e, Some(path.to_path_buf())))?;
        let config: Self = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        log::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Configuration for a run: the `--config` file if given, overridden by
    /// whatever the command line sets explicitly
    pub fn resolve(args: &Args) -> ThreatGraphResult<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.skip_rules.extend(args.skip_rules.iter().cloned());
        config.custom_rule_paths.extend(args.custom_rules.iter().cloned());
        config.technology_paths.extend(args.technologies.iter().cloned());
        if let Some(policy) = args.orphan_policy {
            config.orphan_policy = policy;
        }
        if args.threads != 0 {
            config.threads = args.threads;
        }
        if args.sequential {
            config.parallel = false;
        }
        if args.skip_raa {
            config.skip_raa = true;
        }
        Ok(config)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            skip_rules: self.skip_rules.clone(),
            parallel: self.parallel,
            threads: self.threads,
        }
    }
}
