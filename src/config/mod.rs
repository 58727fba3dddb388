//! Runtime configuration for the sync decider and the container reaper.

mod error;

use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

pub use self::error::ConfigError;

/// The byte budget accepts a plain count or a unit suffix, e.g. "64 MiB".
fn budget_in_bytes(src: &str) -> Result<u64, ConfigError> {
    match byte_unit::Byte::from_str(src) {
        Ok(bytes) => Ok(bytes.as_u64()),
        Err(e) => Err(ConfigError::InvalidNumber {
            invalid: src.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Tunable parameters for the leader-resident control loops.
///
/// Create a configuration, optionally customize fields, then `validate()` it
/// before handing it to [`LeaderLogView`](crate::log_view::LeaderLogView),
/// [`SyncDecider`](crate::sync::SyncDecider) or
/// [`ContainerReaper`](crate::reaper::ContainerReaper).
#[derive(Clone, Debug, Parser)]
#[derive(PartialEq, Eq)]
pub struct Config {
    /// How often the container reaper sweeps the data tree, in milliseconds.
    #[clap(long, default_value = "60000")]
    pub check_interval_ms: u64,

    /// Global cap on container delete submissions per minute.
    ///
    /// Successive submissions within a sweep are spaced at least
    /// `60000 / max_per_minute` milliseconds apart to avoid delete storms.
    #[clap(long, default_value = "10000")]
    pub max_per_minute: u64,

    /// Grace period in milliseconds before a container that never had
    /// children (cversion 0) may be reaped. `0` disables reaping such nodes.
    #[clap(long, default_value = "0")]
    pub max_never_used_interval_ms: u64,

    /// Largest total payload the leader is willing to replay from the txn
    /// log for a DIFF sync; beyond it the follower gets a snapshot.
    ///
    /// `0` disables txn-log sync entirely.
    #[clap(long, value_parser = budget_in_bytes, default_value = "32 MiB")]
    pub txn_log_size_budget: u64,

    /// Number of recently committed proposals retained in memory for DIFF
    /// sync.
    #[clap(long, default_value = "500")]
    pub committed_window_capacity: usize,

    /// Always answer SNAP regardless of peer state. Testing override.
    // clap 4 requires `num_args = 0..=1`, or it complains about missing arg error
    // https://github.com/clap-rs/clap/discussions/4374
    #[clap(long,
           default_value_t = false,
           action = clap::ArgAction::Set,
           num_args = 0..=1,
           default_missing_value = "true"
    )]
    pub force_snap_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl Config {
    /// Validate the config.
    pub fn validate(self) -> Result<Config, ConfigError> {
        if self.max_per_minute == 0 {
            return Err(ConfigError::DeleteRateZero);
        }

        if self.committed_window_capacity == 0 {
            return Err(ConfigError::WindowCapacityZero);
        }

        Ok(self)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Minimum wall-clock spacing between successive delete submissions.
    pub fn min_delete_interval_ms(&self) -> u64 {
        60_000 / self.max_per_minute.max(1)
    }
}
