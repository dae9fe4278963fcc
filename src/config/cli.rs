use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the dailyblog binary.
#[derive(Debug, Parser)]
#[command(
    name = "dailyblog",
    version,
    about = "MyDailyBlog post cache and background task worker"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "DAILYBLOG_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the cache, the task workers and the periodic reminder sweep.
    Serve(Box<ServeArgs>),
    /// Load and validate configuration, then print the resolved settings.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Enable or disable the post cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the prefix prepended to every cache key.
    #[arg(long = "cache-key-prefix", value_name = "PREFIX")]
    pub cache_key_prefix: Option<String>,

    /// Override the in-memory cache capacity in entries.
    #[arg(long = "cache-memory-capacity", value_name = "COUNT")]
    pub cache_memory_capacity: Option<usize>,

    /// Override the attempt ceiling of retryable tasks.
    #[arg(long = "tasks-max-attempts", value_name = "COUNT")]
    pub tasks_max_attempts: Option<u32>,

    /// Override the fixed delay between task attempts.
    #[arg(long = "tasks-backoff-seconds", value_name = "SECONDS")]
    pub tasks_backoff_seconds: Option<u64>,

    /// Override the inactivity threshold of the reminder sweep.
    #[arg(long = "sweep-inactive-after-days", value_name = "DAYS")]
    pub sweep_inactive_after_days: Option<u64>,

    /// Override how often the reminder sweep runs.
    #[arg(long = "sweep-cadence-seconds", value_name = "SECONDS")]
    pub sweep_cadence_seconds: Option<u64>,

    /// Override the sender address of outgoing email.
    #[arg(long = "mail-from", value_name = "ADDRESS")]
    pub mail_from: Option<String>,
}
