use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";
pub const DEFAULT_JWT_SECRET_ENV: &str = "SHOP_JWT_SECRET";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

/// Every key the daemon reads, as it appears in YAML. All optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerSection,
    database: DatabaseSection,
    auth: AuthSection,
    cors: CorsSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ServerSection {
    bind_addr: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    max_connections: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct AuthSection {
    jwt_secret_env: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CorsSection {
    allowed_origins: Option<Vec<String>>,
}

fn parse_file_config(cfg: &Value) -> Result<FileConfig> {
    FileConfig::deserialize(cfg).context("config does not match the daemon settings schema")
}

/// The schema's own rendering of `cfg`: every key the daemon understands,
/// and nothing else.
pub(crate) fn known_shape(cfg: &Value) -> Result<Value> {
    serde_json::to_value(parse_file_config(cfg)?).context("render known config keys")
}

// ---------------------------------------------------------------------------
// DaemonSettings
// ---------------------------------------------------------------------------

/// Validated settings the daemon boots with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// Name of the environment variable holding the admin JWT secret.
    pub jwt_secret_env: String,
    /// Extra CORS origins on top of the localhost defaults.
    pub allowed_origins: Vec<String>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            jwt_secret_env: DEFAULT_JWT_SECRET_ENV.to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl DaemonSettings {
    /// Build from merged config JSON (produced by `load_layered_yaml*`).
    /// Absent keys take their defaults; present keys are validated.
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let file = parse_file_config(cfg)?;
        let mut out = Self::default();

        if let Some(addr) = file.server.bind_addr {
            out.bind_addr = addr
                .parse()
                .with_context(|| format!("server.bind_addr is not a socket address: '{addr}'"))?;
        }

        if let Some(n) = file.database.max_connections {
            if n == 0 {
                bail!("database.max_connections must be at least 1");
            }
            out.max_connections = n;
        }

        if let Some(name) = file.auth.jwt_secret_env {
            if !is_env_var_name(&name) {
                bail!("auth.jwt_secret_env must name an environment variable (got '{name}')");
            }
            out.jwt_secret_env = name;
        }

        if let Some(origins) = file.cors.allowed_origins {
            out.allowed_origins = origins
                .into_iter()
                .map(|o| o.trim_end_matches('/').to_string())
                .collect();
        }

        Ok(out)
    }
}

fn is_env_var_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_bind_addr_constant_matches_default() {
        assert_eq!(DaemonSettings::default().bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn known_shape_drops_foreign_keys() {
        let shape = known_shape(&json!({"server": {"bind_addr": "1.2.3.4:5", "tls": true}, "mail": {}}))
            .expect("shape");
        assert!(shape.pointer("/server/bind_addr").is_some());
        assert!(shape.pointer("/server/tls").is_none());
        assert!(shape.get("mail").is_none());
    }

    #[test]
    fn env_var_names() {
        assert!(is_env_var_name("SHOP_JWT_SECRET"));
        assert!(!is_env_var_name("1ABC"));
        assert!(!is_env_var_name("shop_jwt"));
    }
}
