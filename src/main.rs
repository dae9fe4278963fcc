use std::{process, sync::Arc};

use dailyblog::{
    application::error::AppError,
    config,
    infra::{error::InfraError, memory::InMemoryBlog, telemetry},
    tasks::{
        CatalogContext, INACTIVITY_SWEEP, MemoryTaskQueue, ReminderSweep, RetryPolicy, TaskQueue,
        TaskRegistry, TracingImageProcessor, TracingMailer, register_catalog,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        config::Command::CheckConfig(_) => run_check_config(&settings),
    }
}

fn run_check_config(settings: &config::Settings) -> Result<(), AppError> {
    println!("{settings:#?}");
    Ok(())
}

/// Run the task workers and the periodic reminder sweep until ctrl-c.
async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let blog = Arc::new(InMemoryBlog::new());
    let mailer = Arc::new(TracingMailer::new());

    let mut registry = TaskRegistry::new(RetryPolicy::from(&settings.tasks));
    register_catalog(
        &mut registry,
        &CatalogContext {
            mailer: mailer.clone(),
            users: blog.clone(),
            images: Arc::new(TracingImageProcessor),
            from_email: settings.mail.from_email.clone(),
        },
    )?;
    registry.register(
        INACTIVITY_SWEEP,
        ReminderSweep::new(
            blog,
            mailer,
            settings.mail.from_email.clone(),
            settings.sweep.inactive_after,
        ),
    )?;

    info!(
        tasks = ?registry.names(),
        max_attempts = settings.tasks.max_attempts.get(),
        backoff_secs = settings.tasks.backoff.as_secs(),
        "dailyblog worker starting"
    );

    let queue = MemoryTaskQueue::with_retention(registry, settings.tasks.retained_records);
    let queue_port: Arc<dyn TaskQueue> = Arc::new(queue.clone());
    let sweep_handle = ReminderSweep::spawn_periodic(queue_port, settings.sweep.cadence);

    let shutdown = tokio::signal::ctrl_c().await;

    sweep_handle.abort();
    let _ = sweep_handle.await;
    queue.close();

    let counts = queue.counts();
    info!(
        in_flight = counts.in_flight(),
        succeeded = counts.succeeded,
        failed = counts.failed_terminal,
        "dailyblog worker stopped"
    );

    shutdown.map_err(InfraError::from)?;
    Ok(())
}
