use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Completion poller
    pub poll_interval_secs: u64,
    pub retention_days: i64,

    // Entitlement policy file (TOML)
    pub policy_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("POLL_INTERVAL_SECS must be a number"),
            retention_days: env::var("RETENTION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .expect("RETENTION_DAYS must be a number"),
            policy_path: env::var("POLICY_PATH")
                .unwrap_or_else(|_| "policy.toml".to_string())
                .into(),
        }
    }

    /// Log the config without the database credentials.
    pub fn log_redacted(&self) {
        tracing::info!(
            poll_interval_secs = self.poll_interval_secs,
            retention_days = self.retention_days,
            policy_path = %self.policy_path.display(),
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
