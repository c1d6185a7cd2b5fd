use std::time::Duration;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Default upper bound on keys per dispatched batch.
pub const DEFAULT_MAX_BATCH: usize = 100;
/// Default wait window between a batch opening and its forced dispatch.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(10);
/// Default lifetime of a cached fetch result.
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(1);
/// Default interval of the background cache sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Construction-time settings of a loader.
///
/// With the `serde` feature this can be read from any serde format; durations
/// are human-readable strings such as `"10ms"` or `"1s"`. A `time_to_live` or
/// `sweep_interval` of zero disables the result cache.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct LoaderConfig {
  pub max_batch: usize,
  #[cfg_attr(feature = "serde", serde(deserialize_with = "de::duration"))]
  pub wait: Duration,
  #[cfg_attr(feature = "serde", serde(deserialize_with = "de::duration"))]
  pub time_to_live: Duration,
  #[cfg_attr(feature = "serde", serde(deserialize_with = "de::duration"))]
  pub sweep_interval: Duration,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self {
      max_batch: DEFAULT_MAX_BATCH,
      wait: DEFAULT_WAIT,
      time_to_live: DEFAULT_TIME_TO_LIVE,
      sweep_interval: DEFAULT_SWEEP_INTERVAL,
    }
  }
}

impl LoaderConfig {
  /// Whether these settings enable the result cache.
  pub fn caching_enabled(&self) -> bool {
    !self.time_to_live.is_zero() && !self.sweep_interval.is_zero()
  }
}

#[cfg(feature = "serde")]
mod de {
  use serde::{Deserialize, Deserializer};
  use std::time::Duration;

  pub(super) fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
  }
}
