use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry duration).
    pub jwt: JwtConfig,
    /// Session engine thresholds and intervals.
    pub engine: EngineConfig,
}

/// Tunables for the session engine and timeout reconciler.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Max allowed clock-in distance from the client site, in meters,
    /// before the device-reported accuracy is added (default: `100`).
    pub gps_accuracy_threshold_m: f64,
    /// Max session length before the reconciler force-ends it
    /// (default: `480` = 8 hours).
    pub session_timeout_minutes: i64,
    /// How often the reconciliation sweep runs, in seconds (default: `300`).
    pub reconcile_interval_secs: u64,
    /// End-fix accuracy worse than this flags the session for review
    /// (default: `50`).
    pub flag_end_accuracy_m: f64,
    /// Sessions shorter than this many minutes are flagged as implausible
    /// (default: `5`).
    pub flag_min_duration_minutes: i32,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `GPS_ACCURACY_THRESHOLD_M`  | `100`                      |
    /// | `SESSION_TIMEOUT_MINUTES`   | `480`                      |
    /// | `RECONCILE_INTERVAL_SECS`   | `300`                      |
    /// | `FLAG_END_ACCURACY_M`       | `50`                       |
    /// | `FLAG_MIN_DURATION_MINUTES` | `5`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parsed("REQUEST_TIMEOUT_SECS", 30);

        let jwt = JwtConfig::from_env();
        let engine = EngineConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            engine,
        }
    }
}

impl EngineConfig {
    /// Load engine thresholds from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            gps_accuracy_threshold_m: env_parsed("GPS_ACCURACY_THRESHOLD_M", 100.0),
            session_timeout_minutes: env_parsed("SESSION_TIMEOUT_MINUTES", 480),
            reconcile_interval_secs: env_parsed("RECONCILE_INTERVAL_SECS", 300),
            flag_end_accuracy_m: env_parsed("FLAG_END_ACCURACY_M", 50.0),
            flag_min_duration_minutes: env_parsed("FLAG_MIN_DURATION_MINUTES", 5),
        }
    }

    /// The flagging thresholds this configuration implies.
    pub fn flag_thresholds(&self) -> careclock_core::flagging::FlagThresholds {
        careclock_core::flagging::FlagThresholds {
            end_accuracy_m: self.flag_end_accuracy_m,
            min_duration_minutes: self.flag_min_duration_minutes,
            gps_threshold_m: self.gps_accuracy_threshold_m,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gps_accuracy_threshold_m: 100.0,
            session_timeout_minutes: 480,
            reconcile_interval_secs: 300,
            flag_end_accuracy_m: 50.0,
            flag_min_duration_minutes: 5,
        }
    }
}

/// Parse an env var, falling back to `default` when unset.
///
/// Panics on a present-but-invalid value: misconfiguration should fail fast
/// at startup, not surface later as a confusing default.
fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
