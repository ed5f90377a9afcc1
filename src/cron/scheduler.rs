//! Cron scheduler for periodic network runs.
//!
//! Registers one repeated job per enabled network. Each tick runs the full
//! pipeline of that network (snapshots, APY, summary) in order.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use log::{error, info, warn};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{NetworkSettings, ScheduleSettings, Settings},
    utils::day_timestamp,
};

use super::pipeline::{build_oracle, run_network, NetworkOracle};

/// Cron scheduler that runs every enabled network on a fixed interval.
pub struct CronScheduler {
    settings: Arc<Settings>,
    schedule: CronSettings,
}

/// Configuration for cron job intervals
#[derive(Debug, Clone)]
pub struct CronSettings {
    /// Interval between two runs of a network - default 1 day
    pub network_interval_secs: u64,
}

impl Default for CronSettings {
    fn default() -> Self {
        Self {
            network_interval_secs: 86_400,
        }
    }
}

impl From<&ScheduleSettings> for CronSettings {
    fn from(schedule: &ScheduleSettings) -> Self {
        Self {
            network_interval_secs: schedule.interval_secs,
        }
    }
}

impl CronScheduler {
    pub fn new(settings: Arc<Settings>, schedule: CronSettings) -> Self {
        Self { settings, schedule }
    }

    /// Starts the cron scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        let mut registered = 0;
        for network in self.settings.enabled_networks() {
            self.register_network_job(&scheduler, network).await?;
            registered += 1;
        }

        // Start the scheduler
        scheduler.start().await?;
        info!("Cron scheduler started with {} jobs", registered);

        // Wait for cancellation
        cancellation_token.cancelled().await;
        info!("Cron scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_network_job(
        &self,
        scheduler: &JobScheduler,
        network: &NetworkSettings,
    ) -> Result<()> {
        let name = network.name.clone();
        let settings = self.settings.clone();
        let network = Arc::new(network.clone());
        let oracle: Arc<NetworkOracle> = Arc::new(build_oracle(&network, &settings.prices));
        // A run still in progress when the next tick fires skips that tick.
        let running = Arc::new(Mutex::new(()));
        let interval = self.schedule.network_interval_secs;

        let job = Job::new_repeated_async(Duration::from_secs(interval), move |_uuid, _lock| {
            let settings = settings.clone();
            let network = network.clone();
            let oracle = oracle.clone();
            let running = running.clone();
            Box::pin(async move {
                let Ok(_guard) = running.try_lock() else {
                    warn!("Previous run of {} still in progress, skipping", network.name);
                    return;
                };

                let timestamp = day_timestamp(OffsetDateTime::now_utc());
                if let Err(e) = run_network(&settings, &network, &oracle, timestamp).await {
                    error!("Failed to run network {}: {:#}", network.name, e);
                }
            })
        })?;

        scheduler.add(job).await?;
        info!("Registered {} network job (every {}s)", name, interval);
        Ok(())
    }
}
