//! Configuration types — per-tenant policy and process settings.
//!
//! Tenant policy is loaded once from the `TENANT_CONFIGS` environment
//! variable (a JSON map of tenant id → policy) and is immutable for the
//! lifetime of the process. Tenants without an entry get the default
//! policy: allow all senders, use the built-in pattern cascade.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding the tenant policy JSON.
pub const TENANT_CONFIGS_ENV: &str = "TENANT_CONFIGS";

// ── Tenant policy ───────────────────────────────────────────────────

/// Per-tenant policy: who may send codes, and how to extract them.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    /// Sender allowlist entries. Each is one of: `*` (universal), an exact
    /// address, `@domain` (suffix match), or `*@domain` (wildcard domain).
    /// A missing field defaults to allow-all; an explicitly empty list
    /// rejects every sender.
    #[serde(default = "default_allowlist")]
    pub sender_allowlist: Vec<String>,

    /// Tenant-specific extraction patterns, tried in order. A leading `(?i)`
    /// marker on a pattern requests case-insensitive matching. Empty means
    /// use the system default cascade.
    #[serde(default)]
    pub regex_patterns: Vec<String>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            sender_allowlist: default_allowlist(),
            regex_patterns: Vec::new(),
        }
    }
}

fn default_allowlist() -> Vec<String> {
    vec!["*".to_string()]
}

/// Immutable registry of tenant policies, keyed by tenant id.
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, TenantConfig>,
}

impl TenantRegistry {
    /// Build a registry from a JSON map of tenant id → policy.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tenants: HashMap<String, TenantConfig> =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(Self { tenants })
    }

    /// Load the registry from `TENANT_CONFIGS`. An unset variable is not an
    /// error — it yields an empty registry (every tenant on default policy).
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(TENANT_CONFIGS_ENV) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Build a registry from an explicit map (for tests and embedding).
    pub fn from_map(tenants: HashMap<String, TenantConfig>) -> Self {
        Self { tenants }
    }

    /// Resolve a tenant's policy, falling back to the default policy for
    /// unknown tenants.
    pub fn resolve(&self, tenant: &str) -> TenantConfig {
        self.tenants.get(tenant).cloned().unwrap_or_default()
    }

    /// Iterate over the tenants that have explicit configuration.
    pub fn configured_tenants(&self) -> impl Iterator<Item = (&str, &TenantConfig)> {
        self.tenants.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ── Process configuration ───────────────────────────────────────────

/// Relay process configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind address.
    pub bind_addr: String,
    /// Path to the libsql database file.
    pub db_path: String,
    /// Root directory the filesystem object fetcher resolves buckets under.
    pub object_root: String,
    /// Environment tag attached to emitted metrics.
    pub environment: String,
}

impl AppConfig {
    /// Build config from environment variables, with defaults for local use.
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("OTP_RELAY_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let db_path =
            std::env::var("OTP_RELAY_DB_PATH").unwrap_or_else(|_| "./data/otp-relay.db".to_string());

        let object_root =
            std::env::var("OTP_RELAY_OBJECT_ROOT").unwrap_or_else(|_| "./data/mail".to_string());

        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());

        Self {
            bind_addr,
            db_path,
            object_root,
            environment,
        }
    }
}
