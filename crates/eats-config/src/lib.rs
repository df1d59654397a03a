//! Layered YAML configuration for the eats services.
//!
//! Layers are merged in order (earlier = base, later = override) into one JSON
//! document, which is hashed so a running daemon can report exactly which
//! configuration it booted with. The merged document is then decoded into
//! [`AppConfig`]; missing keys fall back to the defaults below.
//!
//! Secrets never appear as literal values. The YAML names the env var that
//! holds each secret and [`secrets::resolve_secrets`] reads them once.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub mod secrets;

pub use secrets::{resolve_secrets, ResolvedSecrets};

/// Env var holding a comma-separated list of config layer paths.
pub const ENV_CONFIG_PATHS: &str = "EATS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

/// Leaf string values starting with any of these abort loading with
/// CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "postgres://",
    "postgresql://",
    "eyJ", // base64 JSON header, i.e. a pasted JWT
];

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:4000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Name of the env var carrying the Postgres URL.
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "EATS_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the env var carrying the JWT signing key.
    pub jwt_key_env: String,
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_key_env: "EATS_JWT_KEY".to_string(),
            token_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    /// How long a payment keeps a restaurant promoted.
    pub days: i64,
    pub sweep_interval_secs: u64,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            days: 7,
            sweep_interval_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub promotion: PromotionConfig,
}

impl AppConfig {
    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: AppConfig =
            serde_json::from_value(v.clone()).context("config does not match AppConfig shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.promotion.days <= 0 {
            bail!("promotion.days must be > 0");
        }
        if self.promotion.sweep_interval_secs == 0 {
            bail!("promotion.sweep_interval_secs must be > 0");
        }
        if self.auth.token_ttl_secs <= 0 {
            bail!("auth.token_ttl_secs must be > 0");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be > 0");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
    pub app: AppConfig,
}

/// Load the layers named by `EATS_CONFIG`, or the default base file.
///
/// A missing default file is not an error: the daemon then runs on
/// [`AppConfig::default`]. Explicitly listed paths must exist.
pub fn load_from_env() -> Result<LoadedConfig> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(list) => {
            let paths: Vec<&str> = list
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            load_layered_yaml(&paths)
        }
        Err(_) if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_layered_yaml(&[DEFAULT_CONFIG_PATH])
        }
        Err(_) => load_layered_yaml_from_strings(&[]),
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let app = AppConfig::from_json(&merged)?;
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
        app,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
server:
  addr: "127.0.0.1:4000"
promotion:
  days: 7
  sweep_interval_secs: 3600
"#;

    #[test]
    fn later_layers_override_earlier_ones() {
        let over = "promotion:\n  days: 14\n";
        let loaded = load_layered_yaml_from_strings(&[BASE, over]).unwrap();
        assert_eq!(loaded.app.promotion.days, 14);
        // untouched sibling survives the merge
        assert_eq!(loaded.app.promotion.sweep_interval_secs, 3600);
        assert_eq!(loaded.app.server.addr, "127.0.0.1:4000");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let loaded = load_layered_yaml_from_strings(&[]).unwrap();
        assert_eq!(loaded.app, AppConfig::default());
        assert_eq!(loaded.app.auth.jwt_key_env, "EATS_JWT_KEY");
    }

    #[test]
    fn hash_changes_with_content() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE, "promotion:\n  days: 3\n"]).unwrap();
        assert_eq!(a.config_hash.len(), 64);
        assert_ne!(a.config_hash, b.config_hash);
    }

    #[test]
    fn literal_database_url_is_rejected() {
        let bad = "database:\n  url_env: \"postgres://u:p@host/db\"\n";
        let err = load_layered_yaml_from_strings(&[bad]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CONFIG_SECRET_DETECTED"), "{msg}");
        assert!(!msg.contains("u:p@host"));
    }

    #[test]
    fn non_positive_promotion_days_rejected() {
        let bad = "promotion:\n  days: 0\n";
        assert!(load_layered_yaml_from_strings(&[bad]).is_err());
    }

    #[test]
    fn loads_layers_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let dev = dir.path().join("dev.yaml");
        fs::write(&base, BASE).unwrap();
        fs::write(&dev, "server:\n  addr: \"0.0.0.0:8080\"\n").unwrap();

        let loaded = load_layered_yaml(&[
            base.to_str().unwrap(),
            dev.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(loaded.app.server.addr, "0.0.0.0:8080");
    }
}
