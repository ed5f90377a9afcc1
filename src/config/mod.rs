#[allow(clippy::module_inception)]
mod config;

pub use self::config::{
    NetworkSettings, PriceSettings, ReadMode, ReaderSettings, ScheduleSettings, Settings,
    StatsSettings, TokenSettings,
};
