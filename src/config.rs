//! # config — Environment configuration
//!
//! Everything is read once at startup by [`AppConfig::from_env`].  Numbers
//! that fail to parse fall back to their defaults; a half-configured
//! Supabase project (URL without key or the reverse) is a startup error.
//!
//! | Variable                 | Default          |
//! |--------------------------|------------------|
//! | `BIND_ADDR`              | `0.0.0.0:3000`   |
//! | `APP_ENV`                | `development`    |
//! | `SUPABASE_URL`           | unset → in-memory store + mock auth |
//! | `SUPABASE_ANON_KEY`      | unset            |
//! | `REGISTRATION_API_URL`   | unset → mock registration (dev only) |
//! | `REGISTRATION_CLIENT_ID` | empty            |
//! | `HISTORY_LIMIT`          | `100`            |
//! | `NODE_WIDTH`             | `250`            |
//! | `NODE_HEIGHT`            | `150`            |
//! | `NODE_PADDING`           | `20`             |

use std::fmt;
use std::net::SocketAddr;

use anyhow::{bail, Context};

use crate::engine::PlacementConfig;
use crate::flow::EditorConfig;
use crate::history::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production  => write!(f, "production"),
        }
    }
}

/// Supabase project credentials (REST + GoTrue share them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url:      String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub api_url:   Option<String>,
    pub client_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr:    SocketAddr,
    pub environment:  Environment,
    pub supabase:     Option<SupabaseConfig>,
    pub registration: RegistrationConfig,
    pub editor:       EditorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr:    SocketAddr::from(([0, 0, 0, 0], 3000)),
            environment:  Environment::Development,
            supabase:     None,
            registration: RegistrationConfig { api_url: None, client_id: String::new() },
            editor:       EditorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let environment = match var("APP_ENV").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => bail!("Unknown APP_ENV: '{other}'. Use 'development' or 'production'"),
        };

        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            (None, None) => None,
            (Some(_), None) => bail!("SUPABASE_URL is set but SUPABASE_ANON_KEY is missing"),
            (None, Some(_)) => bail!("SUPABASE_ANON_KEY is set but SUPABASE_URL is missing"),
        };

        let defaults = PlacementConfig::default();
        let placement = PlacementConfig {
            node_width:  env_f64(&var, "NODE_WIDTH", defaults.node_width),
            node_height: env_f64(&var, "NODE_HEIGHT", defaults.node_height),
            padding:     env_f64(&var, "NODE_PADDING", defaults.padding),
            ..defaults
        };

        Ok(Self {
            bind_addr,
            environment,
            supabase,
            registration: RegistrationConfig {
                api_url:   var("REGISTRATION_API_URL").map(|u| u.trim_end_matches('/').to_string()),
                client_id: var("REGISTRATION_CLIENT_ID").unwrap_or_default(),
            },
            editor: EditorConfig {
                history_limit: env_usize(&var, "HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
                placement,
            },
        })
    }
}

fn env_usize(var: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(var: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    var(key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.bind_addr.port(), 3000);
        assert_eq!(c.environment, Environment::Development);
        assert!(c.supabase.is_none());
        assert_eq!(c.editor, EditorConfig::default());
    }

    #[test]
    fn test_malformed_numbers_fall_back() {
        let c = config(&[("HISTORY_LIMIT", "lots"), ("NODE_WIDTH", "-4"), ("NODE_PADDING", "32")]).unwrap();
        assert_eq!(c.editor.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(c.editor.placement.node_width, 250.0);
        assert_eq!(c.editor.placement.padding, 32.0);
    }

    #[test]
    fn test_supabase_needs_both_values() {
        assert!(config(&[("SUPABASE_URL", "https://x.supabase.co")]).is_err());

        let c = config(&[("SUPABASE_URL", "https://x.supabase.co/"), ("SUPABASE_ANON_KEY", "anon")]).unwrap();
        assert_eq!(c.supabase.unwrap().url, "https://x.supabase.co");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(config(&[("APP_ENV", "Production")]).unwrap().environment, Environment::Production);
        assert!(config(&[("APP_ENV", "staging")]).is_err());
    }
}
