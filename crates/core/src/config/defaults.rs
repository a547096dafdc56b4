//! Default values and functions for configuration

pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;
pub(crate) const ENV_PREFIX: &str = "DIRFLOW";

pub(crate) fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

pub(crate) fn default_recursive() -> bool {
    true
}

pub(crate) fn default_debounce_ms() -> u64 {
    0
}

pub(crate) fn default_create_missing_dirs() -> bool {
    true
}
