//! Configuration management for the signing gateway

use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub signing: SigningConfig,
    #[serde(default)]
    pub certificates: CertificatesConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the FHIR document store, e.g. `http://hapi:8080/fhir`.
    /// Also used for the DocumentReference content attachment URLs, so it
    /// must be the externally resolvable address.
    #[serde(default = "default_fhir_url")]
    pub fhir_url: String,
    /// Originating-system identifier recorded on submission sets.
    #[serde(default = "default_source_system")]
    pub source_system: String,
    /// HTTP timeout for store calls in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigningConfig {
    /// PKCS#8 PEM private key file. When unset or missing an ephemeral
    /// key pair is generated at startup (development-only behavior —
    /// signatures are not verifiable across restarts).
    #[serde(default)]
    pub key_file: Option<String>,
    /// Identity recorded in the signature block's `who.identifier`.
    #[serde(default = "default_signer_value")]
    pub signer_value: String,
    #[serde(default)]
    pub signer_system: Option<String>,
    /// Additional signer identities and their SPKI PEM public key files,
    /// consulted during verification before the default key.
    #[serde(default)]
    pub known_keys: Vec<KnownKeyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnownKeyConfig {
    /// Signer identity as recorded in `signature.who.identifier.value`.
    pub signer: String,
    /// SPKI PEM public key file for that signer.
    pub public_key_file: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CertificatesConfig {
    /// Certificate-issuance service endpoint. When unset, built payloads
    /// are returned to the caller without being posted anywhere.
    #[serde(default)]
    pub issuance_url: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Attempts per follow-up write before giving up.
    #[serde(default = "default_reconciliation_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts in seconds.
    #[serde(default = "default_reconciliation_delay")]
    pub retry_delay_seconds: u64,
    /// Bounded queue capacity; jobs beyond it are dropped with a warning.
    #[serde(default = "default_reconciliation_capacity")]
    pub queue_capacity: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_reconciliation_attempts(),
            retry_delay_seconds: default_reconciliation_delay(),
            queue_capacity: default_reconciliation_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting for logs (recommended for production)
    #[serde(default)]
    pub json: bool,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_fhir_url() -> String {
    "http://localhost:8081/fhir".to_string()
}

fn default_source_system() -> String {
    "siegel".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_signer_value() -> String {
    "siegel-gateway".to_string()
}

fn default_reconciliation_attempts() -> u32 {
    3
}

fn default_reconciliation_delay() -> u64 {
    5
}

fn default_reconciliation_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            // Start with defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("upstream.fhir_url", default_fhir_url())?
            .set_default("upstream.source_system", default_source_system())?
            .set_default("upstream.timeout_seconds", default_http_timeout())?
            .set_default("signing.signer_value", default_signer_value())?
            .set_default("certificates.timeout_seconds", default_http_timeout())?
            .set_default(
                "reconciliation.max_attempts",
                default_reconciliation_attempts(),
            )?
            .set_default(
                "reconciliation.retry_delay_seconds",
                default_reconciliation_delay(),
            )?
            .set_default(
                "reconciliation.queue_capacity",
                default_reconciliation_capacity() as i64,
            )?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            // Uses double underscore (__) to map to nested config structure
            // Example: SIEGEL__UPSTREAM__FHIR_URL → config.upstream.fhir_url
            .add_source(
                config::Environment::with_prefix("SIEGEL")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        Ok(addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.upstream.fhir_url.trim().is_empty() {
            return Err("upstream.fhir_url must not be empty".to_string());
        }
        if self.upstream.fhir_url.ends_with('/') {
            return Err("upstream.fhir_url must not end with a slash".to_string());
        }
        if self.signing.signer_value.trim().is_empty() {
            return Err("signing.signer_value must not be empty".to_string());
        }
        if self.reconciliation.max_attempts == 0 {
            return Err("reconciliation.max_attempts must be > 0".to_string());
        }
        if self.reconciliation.queue_capacity == 0 {
            return Err("reconciliation.queue_capacity must be > 0".to_string());
        }
        for key in &self.signing.known_keys {
            if key.signer.trim().is_empty() {
                return Err("signing.known_keys entries must name a signer".to_string());
            }
        }
        Ok(())
    }
}
