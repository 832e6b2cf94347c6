//! Session and history configuration. Passed explicitly; there is no process-wide log root.

use std::path::{Path, PathBuf};

/// Default directory holding one sub-directory per logpose name.
pub const DEFAULT_ROOT: &str = ".lp";

pub(crate) fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn bool_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let value = lookup(key)?;
    let parsed = parse_bool_env(&value);
    if parsed.is_none() {
        tracing::error!(key, value = %value, "ignoring unparseable boolean");
    }
    parsed
}

fn non_empty_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Diagnostic logging settings consumed by [`init_observability`](crate::init_observability).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// `Some(false)` turns diagnostic logging off entirely.
    pub enabled: Option<bool>,
    /// Filter directives overriding `RUST_LOG` and the default.
    pub filter: Option<String>,
    /// Write JSONL to this file instead of compact lines on stderr.
    pub json_path: Option<PathBuf>,
}

impl LogSettings {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let enabled = ["LOGPOSE_OBSERVABILITY_ENABLED", "LOGPOSE_OBSERVABILITY"]
            .into_iter()
            .find_map(|key| lookup(key).map(|_| bool_var(lookup, key).unwrap_or(true)));
        Self {
            enabled,
            filter: non_empty_var(lookup, "LOGPOSE_LOG_LEVEL"),
            json_path: non_empty_var(lookup, "LOGPOSE_JSON_LOG_PATH").map(PathBuf::from),
        }
    }
}

/// Where records live and how sessions behave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogposeConfig {
    /// Root logging directory.
    pub root: PathBuf,
    /// Track routes and parameters but skip timing, printing and persistence.
    pub debug: bool,
    /// Print route banners and timings through the reporter.
    pub verbose: bool,
    pub log: LogSettings,
}

impl Default for LogposeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            debug: false,
            verbose: true,
            log: LogSettings::default(),
        }
    }
}

impl LogposeConfig {
    /// Config rooted at `root` with default flags.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Builds a config from the environment, falling back to defaults.
    ///
    /// - `LOGPOSE_ROOT`: root logging directory (default `.lp`).
    /// - `LOGPOSE_DEBUG`: `true`/`false` (default false).
    /// - `LOGPOSE_VERBOSE`: `true`/`false` (default true).
    /// - `LOGPOSE_OBSERVABILITY_ENABLED` / `LOGPOSE_OBSERVABILITY`: diagnostic logging on/off.
    /// - `LOGPOSE_LOG_LEVEL`: diagnostic filter directives (`info`, `logpose_core=debug`, ...).
    /// - `LOGPOSE_JSON_LOG_PATH`: JSONL diagnostic log file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = non_empty_var(&lookup, "LOGPOSE_ROOT") {
            config.root = PathBuf::from(root);
        }
        if let Some(debug) = bool_var(&lookup, "LOGPOSE_DEBUG") {
            config.debug = debug;
        }
        if let Some(verbose) = bool_var(&lookup, "LOGPOSE_VERBOSE") {
            config.verbose = verbose;
        }
        config.log = LogSettings::from_lookup(&lookup);
        config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
