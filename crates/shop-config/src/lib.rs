//! shop-config
//!
//! Layered YAML configuration for the shop daemon.
//!
//! Documents are merged in order (later layers override earlier ones),
//! rendered as canonical JSON and hashed so a running daemon can log exactly
//! which configuration it booted with. Secrets never appear as literals: the
//! config names the *environment variable* that holds a secret, and any value
//! that looks like a credential aborts the load.
//!
//! The keys the daemon understands are the serde schema behind
//! [`DaemonSettings`]; anything else in a layer is reported as unknown.

mod settings;

pub use settings::{DaemonSettings, DEFAULT_BIND_ADDR, DEFAULT_JWT_SECRET_ENV};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// A leaf string starting with one of these aborts the load.
const SECRET_PREFIXES: &[&str] = &[
    "sk_live",
    "sk_test",
    "-----BEGIN",
    "eyJ",
    "postgres://",
    "postgresql://",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// SHA-256 of `canonical_json`, lowercase hex.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeyPolicy {
    Warn,
    Fail,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| std::fs::read_to_string(p).with_context(|| format!("read config layer {p}")))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());

    for (i, raw) in layers.iter().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let layer: Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i} is not valid yaml"))?;
        match layer {
            Value::Null => continue,
            Value::Object(_) => overlay(&mut merged, layer),
            _ => bail!("config layer {i} must be a mapping"),
        }
    }

    if let Some(path) = find_secret_literal(&merged, &mut Vec::new()) {
        bail!("CONFIG_SECRET_DETECTED at {path} (value redacted); reference an env var instead");
    }

    // serde_json maps are ordered by key, so this rendering is canonical.
    let canonical_json = serde_json::to_string(&merged).context("render canonical config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Dotted paths of keys in `config` the daemon does not read.
///
/// Under `Fail`, any unknown key is an error (`CONFIG_UNUSED_KEYS`).
pub fn report_unknown_keys(config: &Value, policy: UnknownKeyPolicy) -> Result<Vec<String>> {
    let known = settings::known_shape(config)?;

    let mut unknown = Vec::new();
    collect_unknown(config, &known, &mut Vec::new(), &mut unknown);
    unknown.sort();

    if policy == UnknownKeyPolicy::Fail && !unknown.is_empty() {
        bail!("CONFIG_UNUSED_KEYS: nothing reads {}", unknown.join(", "));
    }
    Ok(unknown)
}

/// Merge `layer` into `base`. Mappings merge key by key; anything else
/// (scalars, lists) replaces what was there.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn find_secret_literal(v: &Value, path: &mut Vec<String>) -> Option<String> {
    match v {
        Value::String(s) if looks_like_secret(s) => Some(path.join(".")),
        Value::Object(map) => map.iter().find_map(|(k, child)| {
            path.push(k.clone());
            let hit = find_secret_literal(child, path);
            path.pop();
            hit
        }),
        Value::Array(items) => items.iter().enumerate().find_map(|(i, child)| {
            path.push(i.to_string());
            let hit = find_secret_literal(child, path);
            path.pop();
            hit
        }),
        _ => None,
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// Keys present in `input` but absent from `known` (the typed schema's own
/// rendering). Lists are compared as whole values.
fn collect_unknown(input: &Value, known: &Value, path: &mut Vec<String>, out: &mut Vec<String>) {
    let (Value::Object(input_map), Value::Object(known_map)) = (input, known) else {
        return;
    };
    for (key, value) in input_map {
        path.push(key.clone());
        match known_map.get(key) {
            Some(known_value) => collect_unknown(value, known_value, path, out),
            None => out.push(path.join(".")),
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlay_merges_mappings_and_replaces_lists() {
        let mut base = json!({"cors": {"allowed_origins": ["a", "b"]}, "server": {"bind_addr": "x"}});
        overlay(&mut base, json!({"cors": {"allowed_origins": ["c"]}, "auth": {"jwt_secret_env": "K"}}));
        assert_eq!(
            base,
            json!({
                "cors": {"allowed_origins": ["c"]},
                "server": {"bind_addr": "x"},
                "auth": {"jwt_secret_env": "K"}
            })
        );
    }

    #[test]
    fn secret_search_reports_dotted_path() {
        let v = json!({"cors": {"allowed_origins": ["https://ok.example", "postgres://u:p@h/db"]}});
        assert_eq!(find_secret_literal(&v, &mut Vec::new()).as_deref(), Some("cors.allowed_origins.1"));
        assert!(find_secret_literal(&json!({"auth": {"jwt_secret_env": "eyJ"}}), &mut Vec::new()).is_none());
    }

    #[test]
    fn non_mapping_layer_is_rejected() {
        assert!(load_layered_yaml_from_strings(&["- just\n- a list\n"]).is_err());
    }
}
