//! Diagnostic logging for logpose sessions and history reads. Human progress output goes
//! through a [`Reporter`](crate::Reporter) instead.

use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::{LogSettings, LogposeConfig};

const LOG_TARGETS: [&str; 2] = ["logpose_core", "logpose_history"];
const FALLBACK_LOG_FILE: &str = "logpose.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Everything else stays at `warn`; logpose crates log at `info`, or `debug` for debug sessions.
fn default_directives(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    let scoped: Vec<String> = LOG_TARGETS.iter().map(|t| format!("{t}={level}")).collect();
    format!("warn,{}", scoped.join(","))
}

/// Filter precedence: `LOGPOSE_LOG_LEVEL`, then `RUST_LOG`, then [`default_directives`].
/// Directives that fail to parse are skipped.
fn resolve_env_filter(settings: &LogSettings, debug: bool, rust_log: Option<&str>) -> EnvFilter {
    for directives in [settings.filter.as_deref(), rust_log].into_iter().flatten() {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
    }
    EnvFilter::new(default_directives(debug))
}

fn json_log_target(path: &Path) -> (&Path, &str) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(FALLBACK_LOG_FILE);
    (dir, file_name)
}

/// Initialize diagnostic logging once per process from `config.log`.
///
/// Debug sessions (`config.debug`) raise the default level of the logpose crates to `debug`.
/// Without a JSON log path, events go to stderr in a compact format so they do not interleave
/// with progress lines on stdout.
pub fn init_observability(config: &LogposeConfig) {
    INIT.get_or_init(|| {
        let settings = &config.log;
        if !settings.is_enabled() {
            return;
        }

        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let env_filter = resolve_env_filter(settings, config.debug, rust_log.as_deref());
        if let Some(path) = &settings.json_path {
            let (dir, file_name) = json_log_target(path);
            let _ = std::fs::create_dir_all(dir);
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(tracing_appender::rolling::never(dir, file_name));
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .try_init();
        } else {
            let console_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
        tracing::debug!(root = %config.root.display(), "diagnostic logging initialized");
    });
}
