//! Runtime secret resolution.
//!
//! Config stores only env var NAMES. Callers invoke [`resolve_secrets`] once
//! at startup and pass the returned [`ResolvedSecrets`] into constructors;
//! nothing else in the workspace reads these env vars directly.
//!
//! Error messages name the env var, never the value, and `Debug` redacts.

use anyhow::{bail, Result};

use crate::AppConfig;

/// Shortest JWT signing key we accept (HS256 wants at least 256 bits).
pub const MIN_JWT_KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub jwt_key: String,
    /// `None` when the named env var is absent or empty. Only binaries that
    /// talk to Postgres require it.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("jwt_key", &"<REDACTED>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ResolvedSecrets {
    pub fn require_database_url(&self, cfg: &AppConfig) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!(
                "SECRET_MISSING: env var {} (database.url_env) is not set",
                cfg.database.url_env
            ),
        }
    }
}

/// Resolve every secret named by `cfg` from the process environment.
pub fn resolve_secrets(cfg: &AppConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, |name| std::env::var(name).ok())
}

/// Same as [`resolve_secrets`] with an injectable lookup, for tests.
pub fn resolve_secrets_with<F>(cfg: &AppConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let jwt_key = match read(&cfg.auth.jwt_key_env) {
        Some(k) => k,
        None => bail!(
            "SECRET_MISSING: env var {} (auth.jwt_key_env) is not set",
            cfg.auth.jwt_key_env
        ),
    };
    if jwt_key.len() < MIN_JWT_KEY_LEN {
        bail!(
            "SECRET_TOO_SHORT: env var {} must hold at least {} bytes",
            cfg.auth.jwt_key_env,
            MIN_JWT_KEY_LEN
        );
    }

    Ok(ResolvedSecrets {
        jwt_key,
        database_url: read(&cfg.database.url_env),
    })
}
