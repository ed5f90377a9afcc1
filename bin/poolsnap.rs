use std::sync::Arc;

use anyhow::{bail, Context};
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use poolsnap::{
    build_oracle, day_timestamp, run_network, CronScheduler, CronSettings, ScheduleSettings,
    Settings,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    if settings.enabled_networks().next().is_none() {
        bail!("No enabled networks in config.yaml");
    }

    // Every mode starts with one pass over all networks
    run_once(&settings).await?;

    match settings.schedule.clone() {
        Some(schedule) => run_scheduled(settings, schedule).await,
        None => Ok(()),
    }
}

async fn run_once(settings: &Settings) -> anyhow::Result<()> {
    let timestamp = day_timestamp(OffsetDateTime::now_utc());
    let mut failed = Vec::new();

    for network in settings.enabled_networks() {
        let oracle = build_oracle(network, &settings.prices);
        if let Err(e) = run_network(settings, network, &oracle, timestamp).await {
            error!("Network {} failed: {:#}", network.name, e);
            failed.push(network.name.as_str());
        }
    }

    if !failed.is_empty() {
        bail!("Run failed for networks: {}", failed.join(", "));
    }

    info!("All networks snapshotted for {}", timestamp);
    Ok(())
}

async fn run_scheduled(settings: Arc<Settings>, schedule: ScheduleSettings) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    let cron_scheduler = CronScheduler::new(settings, CronSettings::from(&schedule));

    let cron_token = cancellation_token.child_token();
    let cron_handle = tokio::spawn(async move {
        if let Err(e) = cron_scheduler.run(cron_token).await {
            error!("Cron scheduler failed: {:#}", e);
        }
    });

    info!(
        "Cron scheduler started - networks will run every {}s",
        schedule.interval_secs
    );

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    // Set up graceful shutdown signal handler
    info!("Scheduler running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    // Wait for cron scheduler to stop
    info!("Waiting for cron scheduler to stop...");
    let _ = cron_handle.await;

    info!("Scheduler stopped");
    Ok(())
}
