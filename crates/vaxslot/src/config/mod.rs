use std::env;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;

use crate::scheduling::SlotPolicy;

/// Distinguishes runtime behavior for different stages of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub scheduling: SchedulingConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let defaults = SchedulingConfig::default();
        let scheduling = SchedulingConfig {
            dose_limit: read_var("APP_DOSE_LIMIT", defaults.dose_limit)?,
            old_age_years: read_var("APP_OLD_AGE_YEARS", defaults.old_age_years)?,
            slot_minutes: read_var("APP_SLOT_MINUTES", defaults.slot_minutes)?,
            retry_buffer_minutes: read_var(
                "APP_RETRY_BUFFER_MINUTES",
                defaults.retry_buffer_minutes,
            )?,
            max_week_horizon: read_var("APP_MAX_WEEK_HORIZON", defaults.max_week_horizon)?,
        };
        scheduling.validate()?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            scheduling,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn read_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Rules shared by the priority calculator, the allocator and the reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Number of doses that makes a registrant fully vaccinated.
    pub dose_limit: u32,
    pub old_age_years: u32,
    pub slot_minutes: u32,
    /// Gap left after a booked slot before the next candidate start.
    pub retry_buffer_minutes: u32,
    /// Number of calendar weeks the allocator may walk before giving up.
    pub max_week_horizon: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            dose_limit: 2,
            old_age_years: 65,
            slot_minutes: 9,
            retry_buffer_minutes: 1,
            max_week_horizon: 52,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dose_limit == 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_DOSE_LIMIT",
                constraint: "must be at least 1",
            });
        }
        if self.slot_minutes == 0 || self.slot_minutes >= 24 * 60 {
            return Err(ConfigError::OutOfRange {
                name: "APP_SLOT_MINUTES",
                constraint: "must be between 1 and 1439",
            });
        }
        if self.retry_buffer_minutes == 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_RETRY_BUFFER_MINUTES",
                constraint: "must be at least 1",
            });
        }
        if self.max_week_horizon == 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_MAX_WEEK_HORIZON",
                constraint: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn slot_policy(&self) -> SlotPolicy {
        SlotPolicy {
            duration: Duration::minutes(i64::from(self.slot_minutes)),
            buffer: Duration::minutes(i64::from(self.retry_buffer_minutes)),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber {
        name: &'static str,
        value: String,
    },
    OutOfRange {
        name: &'static str,
        constraint: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer, got '{value}'")
            }
            ConfigError::OutOfRange { name, constraint } => write!(f, "{name} {constraint}"),
        }
    }
}

impl std::error::Error for ConfigError {}
