//! Configuration management

use relay_common::types::NamingPolicy;
use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// Backend Defaults
// ============================================================================

pub const DEFAULT_OBJECT_STORE_URL: &str = "http://localhost:8081";
pub const DEFAULT_BLOB_STORE_URL: &str = "http://localhost:8082";
pub const DEFAULT_RULES_ENGINE_URL: &str = "http://localhost:8083";
pub const DEFAULT_INDEXER_URL: &str = "http://localhost:8084";

/// Per-request timeout for remote calls in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Retries after the first attempt for transport faults and 5xx answers.
pub const DEFAULT_REMOTE_MAX_RETRIES: u32 = 3;

/// First backoff delay; doubled on every retry.
pub const DEFAULT_REMOTE_BACKOFF_BASE_MS: u64 = 200;

/// Upper bound for a single backoff delay.
pub const DEFAULT_REMOTE_BACKOFF_MAX_MS: u64 = 5_000;

/// Consecutive failures that open a circuit breaker.
pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 5;

/// How long an open breaker rejects calls before letting a probe through.
pub const DEFAULT_BREAKER_OPEN_SECS: u64 = 30;

// ============================================================================
// Import Defaults
// ============================================================================

pub const DEFAULT_IMPORT_DATABASE: &str = "crm";
pub const DEFAULT_IMPORT_COLLECTION: &str = "customers";
pub const DEFAULT_IMPORT_ARCHIVE_PARENT: &str = "customer-imports";

/// Sequential dispatch unless raised.
pub const DEFAULT_IMPORT_CONCURRENCY: usize = 1;

/// Hard ceiling for the worker pool.
pub const MAX_IMPORT_CONCURRENCY: usize = 64;

/// Largest accepted import body (10 MiB).
pub const DEFAULT_IMPORT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub backends: BackendsConfig,
    pub resilience: ResilienceConfig,
    pub import: ImportConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
            allow_credentials: true,
        }
    }
}

/// Address and credentials of one remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEndpoint {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl BackendEndpoint {
    fn from_env(url_var: &str, key_var: &str, default_url: &str) -> Self {
        Self {
            url: std::env::var(url_var).unwrap_or_else(|_| default_url.to_string()),
            api_key: std::env::var(key_var).ok().filter(|k| !k.is_empty()),
        }
    }

    fn local(url: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: None,
        }
    }
}

/// The four remote services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    pub object_store: BackendEndpoint,
    pub blob_store: BackendEndpoint,
    pub rules_engine: BackendEndpoint,
    pub indexer: BackendEndpoint,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            object_store: BackendEndpoint::local(DEFAULT_OBJECT_STORE_URL),
            blob_store: BackendEndpoint::local(DEFAULT_BLOB_STORE_URL),
            rules_engine: BackendEndpoint::local(DEFAULT_RULES_ENGINE_URL),
            indexer: BackendEndpoint::local(DEFAULT_INDEXER_URL),
        }
    }
}

/// Timeout, retry and circuit-breaker settings applied to every facade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub breaker_failure_threshold: u32,
    pub breaker_open_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            max_retries: DEFAULT_REMOTE_MAX_RETRIES,
            backoff_base_ms: DEFAULT_REMOTE_BACKOFF_BASE_MS,
            backoff_max_ms: DEFAULT_REMOTE_BACKOFF_MAX_MS,
            breaker_failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            breaker_open_secs: DEFAULT_BREAKER_OPEN_SECS,
        }
    }
}

/// Bulk customer import settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Object store database holding the target collection
    pub database: String,
    /// Collection customers are reconciled into
    pub collection: String,
    /// Blob store node that archived payloads are created under
    pub archive_parent: String,
    /// Property naming used when records are serialized
    pub naming_policy: NamingPolicy,
    /// Whether the first CSV line is a header row
    pub has_headers: bool,
    pub delimiter: u8,
    /// Records dispatched at once; 1 means strictly sequential
    pub concurrency: usize,
    pub max_body_bytes: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_IMPORT_DATABASE.to_string(),
            collection: DEFAULT_IMPORT_COLLECTION.to_string(),
            archive_parent: DEFAULT_IMPORT_ARCHIVE_PARENT.to_string(),
            naming_policy: NamingPolicy::default(),
            has_headers: false,
            delimiter: b',',
            concurrency: DEFAULT_IMPORT_CONCURRENCY,
            max_body_bytes: DEFAULT_IMPORT_MAX_BODY_BYTES,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let naming_policy = match std::env::var("IMPORT_NAMING_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => NamingPolicy::default(),
        };

        let delimiter = match std::env::var("IMPORT_DELIMITER") {
            Ok(value) => parse_delimiter(&value)?,
            Err(_) => b',',
        };

        let config = Config {
            server: ServerConfig {
                host: env_string("RELAY_HOST", DEFAULT_SERVER_HOST),
                port: env_parse("RELAY_PORT").unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse("RELAY_SHUTDOWN_TIMEOUT")
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS").unwrap_or(true),
            },
            backends: BackendsConfig {
                object_store: BackendEndpoint::from_env(
                    "OBJECT_STORE_URL",
                    "OBJECT_STORE_API_KEY",
                    DEFAULT_OBJECT_STORE_URL,
                ),
                blob_store: BackendEndpoint::from_env(
                    "BLOB_STORE_URL",
                    "BLOB_STORE_API_KEY",
                    DEFAULT_BLOB_STORE_URL,
                ),
                rules_engine: BackendEndpoint::from_env(
                    "RULES_ENGINE_URL",
                    "RULES_ENGINE_API_KEY",
                    DEFAULT_RULES_ENGINE_URL,
                ),
                indexer: BackendEndpoint::from_env(
                    "INDEXER_URL",
                    "INDEXER_API_KEY",
                    DEFAULT_INDEXER_URL,
                ),
            },
            resilience: ResilienceConfig {
                timeout_secs: env_parse("REMOTE_TIMEOUT_SECS").unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS),
                max_retries: env_parse("REMOTE_MAX_RETRIES").unwrap_or(DEFAULT_REMOTE_MAX_RETRIES),
                backoff_base_ms: env_parse("REMOTE_BACKOFF_BASE_MS")
                    .unwrap_or(DEFAULT_REMOTE_BACKOFF_BASE_MS),
                backoff_max_ms: env_parse("REMOTE_BACKOFF_MAX_MS")
                    .unwrap_or(DEFAULT_REMOTE_BACKOFF_MAX_MS),
                breaker_failure_threshold: env_parse("BREAKER_FAILURE_THRESHOLD")
                    .unwrap_or(DEFAULT_BREAKER_FAILURE_THRESHOLD),
                breaker_open_secs: env_parse("BREAKER_OPEN_SECS")
                    .unwrap_or(DEFAULT_BREAKER_OPEN_SECS),
            },
            import: ImportConfig {
                database: env_string("IMPORT_DATABASE", DEFAULT_IMPORT_DATABASE),
                collection: env_string("IMPORT_COLLECTION", DEFAULT_IMPORT_COLLECTION),
                archive_parent: env_string("IMPORT_ARCHIVE_PARENT", DEFAULT_IMPORT_ARCHIVE_PARENT),
                naming_policy,
                has_headers: env_parse("IMPORT_HAS_HEADERS").unwrap_or(false),
                delimiter,
                concurrency: env_parse("IMPORT_CONCURRENCY").unwrap_or(DEFAULT_IMPORT_CONCURRENCY),
                max_body_bytes: env_parse("IMPORT_MAX_BODY_BYTES")
                    .unwrap_or(DEFAULT_IMPORT_MAX_BODY_BYTES),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        for (name, endpoint) in [
            ("object store", &self.backends.object_store),
            ("blob store", &self.backends.blob_store),
            ("rules engine", &self.backends.rules_engine),
            ("indexer", &self.backends.indexer),
        ] {
            if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
                anyhow::bail!("The {} URL must start with http:// or https://: '{}'", name, endpoint.url);
            }
        }

        if self.resilience.timeout_secs == 0 {
            anyhow::bail!("Remote timeout must be greater than 0");
        }

        if self.resilience.backoff_base_ms > self.resilience.backoff_max_ms {
            anyhow::bail!(
                "Backoff base ({}ms) cannot be greater than backoff max ({}ms)",
                self.resilience.backoff_base_ms,
                self.resilience.backoff_max_ms
            );
        }

        if self.resilience.breaker_failure_threshold == 0 {
            anyhow::bail!("Breaker failure threshold must be greater than 0");
        }

        if self.import.database.trim().is_empty() || self.import.collection.trim().is_empty() {
            anyhow::bail!("Import database and collection cannot be empty");
        }

        if self.import.archive_parent.trim().is_empty() {
            anyhow::bail!("Import archive parent node cannot be empty");
        }

        if self.import.concurrency == 0 || self.import.concurrency > MAX_IMPORT_CONCURRENCY {
            anyhow::bail!(
                "Import concurrency must be between 1 and {} (got {})",
                MAX_IMPORT_CONCURRENCY,
                self.import.concurrency
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

/// Accept a single ASCII character, or the names "tab" / "\t"
fn parse_delimiter(value: &str) -> anyhow::Result<u8> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        v if v.len() == 1 && v.is_ascii() => Ok(v.as_bytes()[0]),
        v => anyhow::bail!("Import delimiter must be a single ASCII character, got '{}'", v),
    }
}
