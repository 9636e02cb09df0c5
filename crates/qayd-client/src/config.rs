//! Run configuration assembled from environment variables.
//!
//! Parsing runs over a lookup closure so the same rules apply to the process
//! environment and to tests. Command-line flags are layered on top by the caller.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::{ClientError, ClientResult};

pub const DEFAULT_SHEET_NAME: &str = "القيود ";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 2;
pub const DEFAULT_FUTURE_DATE_HORIZON_DAYS: i64 = 30;
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnbalancedStrategy {
    Fail,
    Skip,
    AutoBalance,
}

impl UnbalancedStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail" => Some(Self::Fail),
            "skip" => Some(Self::Skip),
            "auto-balance" | "auto_balance" | "autobalance" => Some(Self::AutoBalance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::AutoBalance => "auto-balance",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database_url: Option<PathBuf>,
    pub database_key: Option<String>,
    pub tenant_id: Option<String>,
    pub excel_file_path: Option<PathBuf>,
    pub sheet_name: String,
    pub column_mapping_path: Option<PathBuf>,
    pub batch_size: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub unbalanced_strategy: Option<UnbalancedStrategy>,
    pub suspense_account_id: Option<String>,
    pub future_date_horizon_days: i64,
    pub created_by: Option<String>,
    pub auto_rollback: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_key: None,
            tenant_id: None,
            excel_file_path: None,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            column_mapping_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            retry: RetryPolicy {
                max_retries: DEFAULT_MAX_RETRIES,
                base_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECONDS),
            },
            unbalanced_strategy: None,
            suspense_account_id: None,
            future_date_horizon_days: DEFAULT_FUTURE_DATE_HORIZON_DAYS,
            created_by: None,
            auto_rollback: false,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = Self {
            database_url: read("DATABASE_URL").map(|value| parse_database_url(&value)),
            database_key: read("DATABASE_KEY"),
            tenant_id: read("TENANT_ID").map(|value| value.trim().to_string()),
            excel_file_path: read("EXCEL_FILE_PATH").map(PathBuf::from),
            column_mapping_path: read("COLUMN_MAPPING_PATH").map(PathBuf::from),
            suspense_account_id: read("SUSPENSE_ACCOUNT_ID").map(|value| value.trim().to_string()),
            created_by: read("CREATED_BY").map(|value| value.trim().to_string()),
            ..Self::default()
        };

        // The sheet name is taken verbatim: trailing whitespace is significant.
        if let Some(sheet_name) = lookup("SHEET_NAME").filter(|value| !value.is_empty()) {
            config.sheet_name = sheet_name;
        }

        if let Some(raw) = read("BATCH_SIZE") {
            let value = parse_integer::<usize>("BATCH_SIZE", &raw)?;
            if value < 1 {
                return Err(ClientError::invalid_config("BATCH_SIZE", "must be at least 1"));
            }
            config.batch_size = value;
        }

        if let Some(raw) = read("TIMEOUT_SECONDS") {
            let value = parse_integer::<u64>("TIMEOUT_SECONDS", &raw)?;
            if value < 1 {
                return Err(ClientError::invalid_config(
                    "TIMEOUT_SECONDS",
                    "must be at least 1",
                ));
            }
            config.timeout = Duration::from_secs(value);
        }

        if let Some(raw) = read("MAX_RETRIES") {
            config.retry.max_retries = parse_integer::<u32>("MAX_RETRIES", &raw)?;
        }

        if let Some(raw) = read("RETRY_DELAY_SECONDS") {
            let value = parse_integer::<u64>("RETRY_DELAY_SECONDS", &raw)?;
            config.retry.base_delay = Duration::from_secs(value);
        }

        if let Some(raw) = read("UNBALANCED_STRATEGY") {
            config.unbalanced_strategy = Some(UnbalancedStrategy::parse(&raw).ok_or_else(|| {
                ClientError::invalid_config(
                    "UNBALANCED_STRATEGY",
                    "must be one of fail, skip, auto-balance",
                )
            })?);
        }

        if let Some(raw) = read("FUTURE_DATE_HORIZON_DAYS") {
            config.future_date_horizon_days =
                parse_integer::<i64>("FUTURE_DATE_HORIZON_DAYS", &raw)?;
        }

        if let Some(raw) = read("AUTO_ROLLBACK") {
            config.auto_rollback = parse_bool("AUTO_ROLLBACK", &raw)?;
        }

        Ok(config)
    }

    pub fn require_database(&self) -> ClientResult<PathBuf> {
        self.database_url
            .clone()
            .ok_or_else(|| ClientError::missing_config("DATABASE_URL"))
    }

    pub fn require_workbook(&self) -> ClientResult<PathBuf> {
        self.excel_file_path
            .clone()
            .ok_or_else(|| ClientError::missing_config("EXCEL_FILE_PATH"))
    }

    pub fn require_tenant(&self) -> ClientResult<String> {
        self.tenant_id.clone().ok_or_else(ClientError::missing_tenant)
    }

    pub fn require_strategy(&self) -> ClientResult<UnbalancedStrategy> {
        self.unbalanced_strategy
            .ok_or_else(ClientError::missing_unbalanced_strategy)
    }
}

fn parse_database_url(value: &str) -> PathBuf {
    let trimmed = value.trim();
    let stripped = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    PathBuf::from(stripped)
}

fn parse_integer<T: std::str::FromStr>(variable: &str, raw: &str) -> ClientResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ClientError::invalid_config(variable, &format!("`{raw}` is not an integer")))
}

fn parse_bool(variable: &str, raw: &str) -> ClientResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ClientError::invalid_config(
            variable,
            &format!("`{raw}` is not a boolean"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{IngestConfig, RetryPolicy, UnbalancedStrategy};

    fn config_from(pairs: &[(&str, &str)]) -> crate::ClientResult<IngestConfig> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<String, String>>();
        IngestConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]);
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.batch_size, 100);
            assert_eq!(config.timeout, Duration::from_secs(30));
            assert_eq!(config.retry.max_retries, 3);
            assert_eq!(config.retry.base_delay, Duration::from_secs(2));
            assert_eq!(config.sheet_name, "القيود ");
            assert!(config.unbalanced_strategy.is_none());
        }
    }

    #[test]
    fn reads_every_recognised_variable() {
        let config = config_from(&[
            ("DATABASE_URL", "sqlite:///tmp/ledger.db"),
            ("DATABASE_KEY", "service-key"),
            ("TENANT_ID", " org-1 "),
            ("EXCEL_FILE_PATH", "/data/journal.xlsx"),
            ("BATCH_SIZE", "25"),
            ("TIMEOUT_SECONDS", "5"),
            ("MAX_RETRIES", "0"),
            ("RETRY_DELAY_SECONDS", "1"),
            ("SHEET_NAME", "Journal "),
            ("UNBALANCED_STRATEGY", "auto-balance"),
            ("AUTO_ROLLBACK", "true"),
        ]);
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(
                config.database_url.as_deref(),
                Some(std::path::Path::new("/tmp/ledger.db"))
            );
            assert_eq!(config.database_key.as_deref(), Some("service-key"));
            assert_eq!(config.tenant_id.as_deref(), Some("org-1"));
            assert_eq!(config.batch_size, 25);
            assert_eq!(config.retry.max_retries, 0);
            assert_eq!(config.sheet_name, "Journal ");
            assert_eq!(
                config.unbalanced_strategy,
                Some(UnbalancedStrategy::AutoBalance)
            );
            assert!(config.auto_rollback);
        }
    }

    #[test]
    fn rejects_zero_batch_size_and_bad_numbers() {
        let zero = config_from(&[("BATCH_SIZE", "0")]);
        assert!(zero.is_err());
        if let Err(error) = zero {
            assert_eq!(error.code, "invalid_config");
        }

        let bad = config_from(&[("TIMEOUT_SECONDS", "soon")]);
        assert!(bad.is_err());

        let strategy = config_from(&[("UNBALANCED_STRATEGY", "ignore")]);
        assert!(strategy.is_err());
    }

    #[test]
    fn retry_delay_grows_exponentially() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn missing_strategy_is_a_configuration_error() {
        let config = IngestConfig::default();
        let result = config.require_strategy();
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "missing_unbalanced_strategy");
        }
    }
}
