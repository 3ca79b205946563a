use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    runtime: RuntimeSettings,
    database: DatabaseSettings,
    s3: S3Settings,
    storage: StorageSettings,
    reconciliation: ReconciliationSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub postgres_server: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub local_root: PathBuf,
    pub max_upload_size_mb: u64,
    pub upload_timeout_seconds: u64,
    pub delete_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub batch_size: i64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
    pub prometheus_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("ALFRED_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("ALFRED_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false);

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "alfred");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "alfred_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "10"),
        )?;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://s3.amazonaws.com");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "alfred-assignment-files");
        let s3_region = env_or_default("S3_REGION", "us-east-1");

        let local_root = PathBuf::from(env_or_default("STORAGE_LOCAL_ROOT", "storage"));
        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "20"))?;
        let upload_timeout_seconds = parse_u64(
            "STORAGE_UPLOAD_TIMEOUT_SECONDS",
            env_or_default("STORAGE_UPLOAD_TIMEOUT_SECONDS", "60"),
        )?;
        let delete_timeout_seconds = parse_u64(
            "STORAGE_DELETE_TIMEOUT_SECONDS",
            env_or_default("STORAGE_DELETE_TIMEOUT_SECONDS", "10"),
        )?;

        let reconcile_enabled =
            env_optional("RECONCILE_ENABLED").map(|value| parse_bool(&value)).unwrap_or(true);
        let reconcile_interval_seconds = parse_u64(
            "RECONCILE_INTERVAL_SECONDS",
            env_or_default("RECONCILE_INTERVAL_SECONDS", "3600"),
        )?;
        let reconcile_batch_size =
            parse_i64("RECONCILE_BATCH_SIZE", env_or_default("RECONCILE_BATCH_SIZE", "200"))?;

        let log_level = env_or_default("ALFRED_LOG_LEVEL", "info");
        let json = env_optional("ALFRED_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_addr =
            parse_socket_addr("PROMETHEUS_ADDR", env_or_default("PROMETHEUS_ADDR", "0.0.0.0:9100"))?;

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            storage: StorageSettings {
                local_root,
                max_upload_size_mb,
                upload_timeout_seconds,
                delete_timeout_seconds,
            },
            reconciliation: ReconciliationSettings {
                enabled: reconcile_enabled,
                interval_seconds: reconcile_interval_seconds,
                batch_size: reconcile_batch_size,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled, prometheus_addr },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub fn reconciliation(&self) -> &ReconciliationSettings {
        &self.reconciliation
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: String::from("0"),
            });
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: String::from("0"),
            });
        }
        if self.storage.max_upload_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: self.storage.max_upload_size_mb.to_string(),
            });
        }
        if self.storage.upload_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "STORAGE_UPLOAD_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }
        if self.storage.delete_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "STORAGE_DELETE_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }
        if self.reconciliation.interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILE_INTERVAL_SECONDS",
                value: String::from("0"),
            });
        }
        if self.reconciliation.batch_size <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECONCILE_BATCH_SIZE",
                value: self.reconciliation.batch_size.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if !self.s3.is_configured() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }

        Ok(())
    }
}

impl DatabaseSettings {
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

impl S3Settings {
    pub fn is_configured(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl StorageSettings {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_seconds)
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_seconds)
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_i64(field: &'static str, value: String) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_socket_addr(field: &'static str, value: String) -> Result<SocketAddr, ConfigError> {
    value.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|val| val.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}
