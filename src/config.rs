use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::HarvestError;

pub const BASE_URL: &str = "http://www.knapsackfamily.com/knapsack_core";
pub const CONCURRENCY: usize = 10;
pub const MAX_ATTEMPTS: u32 = 3;
pub const BACKOFF_BASE: u64 = 5;
pub const JITTER_MIN: f64 = 1.0;
pub const JITTER_MAX: f64 = 3.0;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tunables for one harvest run.
///
/// All waits are expressed in multiples of `time_unit` so tests can shrink
/// the whole schedule without touching the retry logic.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: String,
    /// Worker pool width. `1` runs detail fetches sequentially.
    pub concurrency: usize,
    pub max_attempts: u32,
    /// Failed attempt `n` waits `backoff_base^n` units before the next one.
    pub backoff_base: u64,
    /// Courtesy delay after a successful detail fetch, in units. `None` disables it.
    pub jitter: Option<RangeInclusive<f64>>,
    pub time_unit: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            concurrency: CONCURRENCY,
            max_attempts: MAX_ATTEMPTS,
            backoff_base: BACKOFF_BASE,
            jitter: Some(JITTER_MIN..=JITTER_MAX),
            time_unit: Duration::from_secs(1),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            user_agent: concat!("knapsack_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.concurrency == 0 {
            return Err(HarvestError::Config("concurrency must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(HarvestError::Config("max_attempts must be at least 1".into()));
        }
        if let Some(jitter) = &self.jitter {
            if *jitter.start() < 0.0 || jitter.start() > jitter.end() {
                return Err(HarvestError::Config(format!(
                    "invalid jitter range {:?}",
                    jitter
                )));
            }
        }
        Ok(())
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let units = self.backoff_base.saturating_pow(attempt);
        self.time_unit.saturating_mul(units.min(u32::MAX as u64) as u32)
    }

    pub fn jitter_delay(&self) -> Duration {
        use rand::Rng;

        match &self.jitter {
            Some(range) => {
                let units = rand::thread_rng().gen_range(range.clone());
                self.time_unit.mul_f64(units)
            }
            None => Duration::ZERO,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_powers_of_five() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.backoff(1), Duration::from_secs(5));
        assert_eq!(cfg.backoff(2), Duration::from_secs(25));
    }

    #[test]
    fn jitter_stays_in_range() {
        let cfg = HarvestConfig::default();
        for _ in 0..50 {
            let d = cfg.jitter_delay();
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(3), "{:?}", d);
        }
    }

    #[test]
    fn jitter_disabled() {
        let cfg = HarvestConfig { jitter: None, ..Default::default() };
        assert_eq!(cfg.jitter_delay(), Duration::ZERO);
    }

    #[test]
    fn rejects_zero_workers() {
        let cfg = HarvestConfig { concurrency: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        assert!(HarvestConfig::default().validate().is_ok());
    }

    #[test]
    fn base_strips_trailing_slash() {
        let cfg = HarvestConfig { base_url: "http://h/core/".into(), ..Default::default() };
        assert_eq!(cfg.base(), "http://h/core");
    }
}
