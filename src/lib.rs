pub mod config;
pub mod cron;
pub mod models;
pub mod sources;
pub mod stats;
pub mod store;
pub mod utils;

pub use self::config::{NetworkSettings, ScheduleSettings, Settings};
pub use cron::{build_oracle, run_network, CronScheduler, CronSettings, NetworkOracle};
pub use sources::{ChainDumpReader, ChainReader, PriceSource};
pub use store::JsonStore;
pub use utils::day_timestamp;
