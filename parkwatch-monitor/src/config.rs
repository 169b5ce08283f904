//! Daemon configuration from `PARKWATCH_*` environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::risk::{ThresholdEvaluator, ThresholdProfile, ThresholdSet};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_API_ADDR: &str = "127.0.0.1:7786";

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base URL of the telemetry backend.
    pub backend_url: String,

    pub api_addr: SocketAddr,

    pub profile: ThresholdProfile,

    /// Limits in effect: the profile's set with any overrides applied.
    pub thresholds: ThresholdSet,

    /// Inspection point checked for cracks.
    pub primary_point: String,

    /// Inspection point checked for dirt and surface damage.
    pub secondary_point: String,

    /// Key whose double press triggers a test siren. Compared
    /// case-insensitively.
    pub test_key: String,

    /// Temperature/vibration refresh.
    pub fast_poll: Duration,

    /// Humidity/battery refresh.
    pub slow_poll: Duration,

    pub request_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let profile = ThresholdProfile::default();
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            api_addr: SocketAddr::from(([127, 0, 0, 1], 7786)),
            profile,
            thresholds: profile.thresholds(),
            primary_point: "A1".to_string(),
            secondary_point: "B1".to_string(),
            test_key: "s".to_string(),
            fast_poll: Duration::from_secs(5),
            slow_poll: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or empty variables
    /// keep their defaults; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = var("PARKWATCH_BACKEND_URL") {
            config.backend_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(addr) = var("PARKWATCH_API_ADDR") {
            config.api_addr = parse("PARKWATCH_API_ADDR", &addr)?;
        }
        if let Some(profile) = var("PARKWATCH_PROFILE") {
            config.profile = profile.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "PARKWATCH_PROFILE: unknown profile {profile:?}, expected one of {:?}",
                    <ThresholdProfile as strum::VariantNames>::VARIANTS
                ))
            })?;
            config.thresholds = config.profile.thresholds();
        }

        let t = &mut config.thresholds;
        for (name, limit) in [
            ("PARKWATCH_TEMPERATURE_FAULT_C", &mut t.temperature_fault_c),
            ("PARKWATCH_VIBRATION_FAULT_MM_S", &mut t.vibration_fault_mm_s),
            ("PARKWATCH_VIBRATION_ALARM_MM_S", &mut t.vibration_alarm_mm_s),
            ("PARKWATCH_HUMIDITY_FAULT_PCT", &mut t.humidity_fault_pct),
        ] {
            if let Some(value) = var(name) {
                *limit = parse(name, &value)?;
            }
        }

        if let Some(point) = var("PARKWATCH_PRIMARY_POINT") {
            config.primary_point = point.trim().to_string();
        }
        if let Some(point) = var("PARKWATCH_SECONDARY_POINT") {
            config.secondary_point = point.trim().to_string();
        }
        if let Some(key) = var("PARKWATCH_TEST_KEY") {
            config.test_key = key.trim().to_string();
        }
        if let Some(secs) = var("PARKWATCH_FAST_POLL_SECS") {
            config.fast_poll = parse_secs("PARKWATCH_FAST_POLL_SECS", &secs)?;
        }
        if let Some(secs) = var("PARKWATCH_SLOW_POLL_SECS") {
            config.slow_poll = parse_secs("PARKWATCH_SLOW_POLL_SECS", &secs)?;
        }
        if let Some(secs) = var("PARKWATCH_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("PARKWATCH_REQUEST_TIMEOUT_SECS", &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.fast_poll.is_zero() || self.slow_poll.is_zero() {
            return Err(Error::Config("poll intervals must be non-zero".into()));
        }
        if self.test_key.is_empty() {
            return Err(Error::Config("test key must not be empty".into()));
        }
        Ok(())
    }

    pub fn evaluator(&self) -> ThresholdEvaluator {
        ThresholdEvaluator::new(
            self.thresholds,
            self.primary_point.clone(),
            self.secondary_point.clone(),
        )
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{name}: invalid value {value:?}: {e}")))
}

fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    parse::<u64>(name, value).map(Duration::from_secs)
}
