//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    collections::BTreeMap,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::{Scope, TtlPolicy};
use crate::tasks::DEFAULT_RETAINED_RECORDS;

mod cli;

pub use cli::{CheckConfigArgs, CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "dailyblog";
const ENV_PREFIX: &str = "DAILYBLOG";
const DEFAULT_CACHE_MEMORY_CAPACITY: usize = 1024;
const DEFAULT_TASK_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_TASK_BACKOFF_SECS: u64 = 300;
const DEFAULT_SWEEP_INACTIVE_AFTER_DAYS: u64 = 10;
const DEFAULT_SWEEP_CADENCE_SECS: u64 = 86_400;
const MAX_SWEEP_INACTIVE_AFTER_DAYS: u64 = 36_500;
const DEFAULT_MAIL_FROM: &str = "noreply@mydailyblog.local";
const SECONDS_PER_DAY: u64 = 86_400;
/// Upper bound for every configured duration (TTLs, backoff, cadence).
const MAX_DURATION_SECS: u64 = 365 * SECONDS_PER_DAY;

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub tasks: TaskSettings,
    pub sweep: SweepSettings,
    pub mail: MailSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub key_prefix: String,
    pub memory_capacity: NonZeroUsize,
    pub ttl: TtlPolicy,
}

#[derive(Debug, Clone)]
pub struct TaskSettings {
    /// Total attempts per task, the first one included.
    pub max_attempts: NonZeroU32,
    pub backoff: Duration,
    /// Finished task records kept in memory for inspection.
    pub retained_records: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub inactive_after: Duration,
    pub cadence: Duration,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from_email: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

impl LoadError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_overrides(&args.overrides),
        Some(Command::CheckConfig(args)) => raw.apply_overrides(&args.overrides),
        None => raw.apply_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    tasks: RawTaskSettings,
    sweep: RawSweepSettings,
    mail: RawMailSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(prefix) = overrides.cache_key_prefix.as_ref() {
            self.cache.key_prefix = Some(prefix.clone());
        }
        if let Some(capacity) = overrides.cache_memory_capacity {
            self.cache.memory_capacity = Some(capacity);
        }
        if let Some(attempts) = overrides.tasks_max_attempts {
            self.tasks.max_attempts = Some(attempts);
        }
        if let Some(seconds) = overrides.tasks_backoff_seconds {
            self.tasks.backoff_seconds = Some(seconds);
        }
        if let Some(days) = overrides.sweep_inactive_after_days {
            self.sweep.inactive_after_days = Some(days);
        }
        if let Some(seconds) = overrides.sweep_cadence_seconds {
            self.sweep.cadence_seconds = Some(seconds);
        }
        if let Some(from) = overrides.mail_from.as_ref() {
            self.mail.from_email = Some(from.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            tasks,
            sweep,
            mail,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            tasks: build_task_settings(tasks)?,
            sweep: build_sweep_settings(sweep)?,
            mail: build_mail_settings(mail)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = cache
        .memory_capacity
        .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY);
    let memory_capacity = NonZeroUsize::new(capacity)
        .ok_or_else(|| LoadError::invalid("cache.memory_capacity", "must be greater than zero"))?;

    let mut ttl = TtlPolicy::default();
    for (name, seconds) in cache.ttl_seconds {
        let key = format!("cache.ttl_seconds.{name}");
        let scope = Scope::parse(&name).ok_or_else(|| {
            LoadError::invalid(
                key.clone(),
                "unknown scope; expected global_list, user_list, detail or summary",
            )
        })?;
        if seconds == 0 {
            return Err(LoadError::invalid(key, "must be greater than zero"));
        }
        ttl = ttl.with(scope, bounded_duration(key, seconds)?);
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        key_prefix: cache.key_prefix.unwrap_or_default(),
        memory_capacity,
        ttl,
    })
}

fn build_task_settings(tasks: RawTaskSettings) -> Result<TaskSettings, LoadError> {
    let attempts = tasks.max_attempts.unwrap_or(DEFAULT_TASK_MAX_ATTEMPTS);
    let max_attempts = NonZeroU32::new(attempts)
        .ok_or_else(|| LoadError::invalid("tasks.max_attempts", "must be greater than zero"))?;

    let backoff = bounded_duration(
        "tasks.backoff_seconds",
        tasks.backoff_seconds.unwrap_or(DEFAULT_TASK_BACKOFF_SECS),
    )?;

    let retained = tasks.retained_records.unwrap_or(DEFAULT_RETAINED_RECORDS);
    let retained_records = NonZeroUsize::new(retained).ok_or_else(|| {
        LoadError::invalid("tasks.retained_records", "must be greater than zero")
    })?;

    Ok(TaskSettings {
        max_attempts,
        backoff,
        retained_records,
    })
}

fn build_sweep_settings(sweep: RawSweepSettings) -> Result<SweepSettings, LoadError> {
    let days = sweep
        .inactive_after_days
        .unwrap_or(DEFAULT_SWEEP_INACTIVE_AFTER_DAYS);
    if days == 0 || days > MAX_SWEEP_INACTIVE_AFTER_DAYS {
        return Err(LoadError::invalid(
            "sweep.inactive_after_days",
            format!("must be between 1 and {MAX_SWEEP_INACTIVE_AFTER_DAYS}"),
        ));
    }

    let cadence_seconds = sweep.cadence_seconds.unwrap_or(DEFAULT_SWEEP_CADENCE_SECS);
    if cadence_seconds == 0 {
        return Err(LoadError::invalid(
            "sweep.cadence_seconds",
            "must be greater than zero",
        ));
    }
    let cadence = bounded_duration("sweep.cadence_seconds", cadence_seconds)?;

    Ok(SweepSettings {
        inactive_after: Duration::from_secs(days * SECONDS_PER_DAY),
        cadence,
    })
}

fn bounded_duration(key: impl Into<String>, seconds: u64) -> Result<Duration, LoadError> {
    if seconds > MAX_DURATION_SECS {
        return Err(LoadError::invalid(
            key,
            format!("must be at most {MAX_DURATION_SECS} seconds"),
        ));
    }
    Ok(Duration::from_secs(seconds))
}

fn build_mail_settings(mail: RawMailSettings) -> Result<MailSettings, LoadError> {
    let from_email = mail
        .from_email
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());
    if !from_email.contains('@') {
        return Err(LoadError::invalid(
            "mail.from_email",
            "must be an email address",
        ));
    }

    Ok(MailSettings { from_email })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    key_prefix: Option<String>,
    memory_capacity: Option<usize>,
    ttl_seconds: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTaskSettings {
    max_attempts: Option<u32>,
    backoff_seconds: Option<u64>,
    retained_records: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSweepSettings {
    inactive_after_days: Option<u64>,
    cadence_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMailSettings {
    from_email: Option<String>,
}
