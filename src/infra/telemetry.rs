use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "dailyblog_cache_hit_total",
            Unit::Count,
            "Read-through cache hits, labelled by scope."
        );
        describe_counter!(
            "dailyblog_cache_miss_total",
            Unit::Count,
            "Read-through cache misses, labelled by scope."
        );
        describe_counter!(
            "dailyblog_cache_store_error_total",
            Unit::Count,
            "Cache store operations that failed, labelled by op."
        );
        describe_counter!(
            "dailyblog_cache_evict_total",
            Unit::Count,
            "In-memory cache evictions due to capacity."
        );
        describe_counter!(
            "dailyblog_cache_invalidated_keys_total",
            Unit::Count,
            "Cache entries removed by write invalidation."
        );
        describe_counter!(
            "dailyblog_task_attempt_total",
            Unit::Count,
            "Task attempts started, labelled by task."
        );
        describe_counter!(
            "dailyblog_task_succeeded_total",
            Unit::Count,
            "Tasks that reached the succeeded state."
        );
        describe_counter!(
            "dailyblog_task_failed_total",
            Unit::Count,
            "Tasks that failed terminally."
        );
        describe_histogram!(
            "dailyblog_sweep_ms",
            Unit::Milliseconds,
            "Inactivity reminder sweep duration in milliseconds."
        );
    });
}
