pub mod jobs;
mod pipeline;
mod scheduler;

pub use pipeline::{build_oracle, run_network, NetworkOracle};
pub use scheduler::{CronScheduler, CronSettings};
