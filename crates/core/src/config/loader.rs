//! Configuration loader
//!
//! Builds a [`Config`] from defaults, an optional file and `RECUR_*`
//! environment variables, in that order of increasing precedence.
//!
//! ## Environment Variables
//! - `RECUR_EXECUTOR_TIMEOUT_MS`: command timeout in milliseconds
//! - `RECUR_EXECUTOR_STREAMING`, `RECUR_EXECUTOR_QUIET`, `RECUR_EXECUTOR_VERBOSE` (true/false)
//! - `RECUR_EXECUTOR_OUTPUT_PREFIX`: prefix for forwarded lines
//! - `RECUR_SUCCESS_PATTERN`, `RECUR_FAILURE_PATTERN`: output patterns
//! - `RECUR_PATTERN_CASE_INSENSITIVE` (true/false)
//! - `RECUR_RETRY_STRATEGY`: `exponential`, `linear`, `fixed` or `none`
//! - `RECUR_RETRY_MAX_RETRIES`, `RECUR_RETRY_INITIAL_DELAY_MS`,
//!   `RECUR_RETRY_MAX_DELAY_MS`, `RECUR_RETRY_MULTIPLIER`, `RECUR_RETRY_INCREMENT_MS`
//! - `RECUR_CIRCUIT_BREAKER_ENABLED` (true/false),
//!   `RECUR_CIRCUIT_BREAKER_FAILURE_THRESHOLD`, `RECUR_CIRCUIT_BREAKER_TIMEOUT_MS`
//! - `RECUR_REPORTER_FORMAT`: `text` or `json`
//! - `RECUR_LOG_LEVEL`, `RECUR_LOG_JSON` (true/false)
//!
//! ## File Locations
//! Without an explicit path the loader probes, in order, `recur.toml`,
//! `recur.json`, `config.toml` and `config.json` in the current directory and
//! then next to the executable. No file at all means defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use recur_domain::constants::ENV_PREFIX;
use recur_domain::{Config, RecurError, Result, RetryStrategy};

const CANDIDATE_FILES: [&str; 4] = ["recur.toml", "recur.json", "config.toml", "config.json"];

/// Load, override from the environment and validate
///
/// With `path` set the file must exist. Without it the standard locations are
/// probed and defaults are used when nothing is found.
///
/// # Errors
/// Returns `RecurError::Config` if the file cannot be read or parsed, an
/// environment variable holds an invalid value, or validation fails.
pub fn load(path: Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => load_from_file(&path)?,
        None => match probe_config_paths() {
            Some(found) => load_from_file(&found)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    let config = apply_env_overrides(config)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// Format is detected by extension (`.toml` or `.json`). Missing fields take
/// their defaults. The result is not validated.
///
/// # Errors
/// Returns `RecurError::Config` if the file is missing, unreadable or invalid.
pub fn load_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(RecurError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| RecurError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content, choosing the format by extension
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RecurError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RecurError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RecurError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CANDIDATE_FILES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Apply `RECUR_*` overrides from the process environment
///
/// # Errors
/// Returns `RecurError::Config` naming the variable if a value cannot be parsed.
pub fn apply_env_overrides(config: Config) -> Result<Config> {
    apply_env_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` to resolve variable names
///
/// `lookup` receives full names such as `RECUR_RETRY_STRATEGY`.
///
/// # Errors
/// Returns `RecurError::Config` naming the variable if a value cannot be parsed.
pub fn apply_env_overrides_from<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    if let Some(v) = env.parsed::<u64>("EXECUTOR_TIMEOUT_MS")? {
        config.executor.timeout_ms = v;
    }
    if let Some(v) = env.flag("EXECUTOR_STREAMING") {
        config.executor.streaming = v;
    }
    if let Some(v) = env.flag("EXECUTOR_QUIET") {
        config.executor.quiet = v;
    }
    if let Some(v) = env.flag("EXECUTOR_VERBOSE") {
        config.executor.verbose = v;
    }
    if let Some(v) = env.raw("EXECUTOR_OUTPUT_PREFIX") {
        config.executor.output_prefix = Some(v);
    }

    if let Some(v) = env.raw("SUCCESS_PATTERN") {
        config.executor.patterns.get_or_insert_with(Default::default).success_pattern = Some(v);
    }
    if let Some(v) = env.raw("FAILURE_PATTERN") {
        config.executor.patterns.get_or_insert_with(Default::default).failure_pattern = Some(v);
    }
    if let Some(v) = env.flag("PATTERN_CASE_INSENSITIVE") {
        config.executor.patterns.get_or_insert_with(Default::default).case_insensitive = v;
    }

    if let Some(v) = env.raw("RETRY_STRATEGY") {
        config.retry.strategy = RetryStrategy::from_str(&v)
            .map_err(|e| RecurError::Config(format!("{ENV_PREFIX}RETRY_STRATEGY: {e}")))?;
    }
    if let Some(v) = env.parsed::<u32>("RETRY_MAX_RETRIES")? {
        config.retry.max_retries = v;
    }
    if let Some(v) = env.parsed::<u64>("RETRY_INITIAL_DELAY_MS")? {
        config.retry.initial_delay_ms = v;
    }
    if let Some(v) = env.parsed::<u64>("RETRY_MAX_DELAY_MS")? {
        config.retry.max_delay_ms = v;
    }
    if let Some(v) = env.parsed::<f64>("RETRY_MULTIPLIER")? {
        config.retry.multiplier = v;
    }
    if let Some(v) = env.parsed::<u64>("RETRY_INCREMENT_MS")? {
        config.retry.increment_ms = v;
    }

    if let Some(v) = env.flag("CIRCUIT_BREAKER_ENABLED") {
        config.circuit_breaker.enabled = v;
    }
    if let Some(v) = env.parsed::<u64>("CIRCUIT_BREAKER_FAILURE_THRESHOLD")? {
        config.circuit_breaker.failure_threshold = v;
    }
    if let Some(v) = env.parsed::<u64>("CIRCUIT_BREAKER_TIMEOUT_MS")? {
        config.circuit_breaker.timeout_ms = v;
    }

    if let Some(v) = env.raw("REPORTER_FORMAT") {
        config.reporter.format = v;
    }

    if let Some(v) = env.raw("LOG_LEVEL") {
        config.logging.level = v;
    }
    if let Some(v) = env.flag("LOG_JSON") {
        config.logging.json = v;
    }

    Ok(config)
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, suffix: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{suffix}"))
    }

    fn parsed<T>(&self, suffix: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.raw(suffix)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| {
                    RecurError::Config(format!("Invalid {ENV_PREFIX}{suffix} '{value}': {e}"))
                })
            })
            .transpose()
    }

    /// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
    fn flag(&self, suffix: &str) -> Option<bool> {
        self.raw(suffix)
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }
}
