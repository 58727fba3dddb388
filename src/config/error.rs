/// Errors raised when a [`Config`](crate::config::Config) is built or
/// validated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{reason} when parsing {invalid:?}")]
    InvalidNumber { invalid: String, reason: String },

    #[error("max_per_minute must be > 0")]
    DeleteRateZero,

    #[error("committed_window_capacity must be > 0")]
    WindowCapacityZero,
}
