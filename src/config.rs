use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub database: String,
    pub init_timeout: Duration,
    pub probe_paths: Vec<String>,
}

impl Config {
    /// Loads and validates everything before any resource is constructed.
    /// A malformed environment is fatal here, never a per-request error.
    pub fn load() -> Self {
        Self {
            port: try_load("PORTAL_PORT", "5000"),
            mongo_uri: must_load("MONGO_URI"),
            database: try_load("MONGO_DB", "portal"),
            init_timeout: Duration::from_millis(try_load("INIT_TIMEOUT_MS", "5000")),
            probe_paths: parse_probe_paths(&try_load::<String>(
                "PROBE_PATHS",
                "/api/health,/health,/healthz",
            ))
            .map_err(|e| {
                warn!("Invalid PROBE_PATHS value: {e}");
            })
            .expect("Environment misconfigured!"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn must_load(key: &str) -> String {
    env::var(key)
        .map_err(|_| {
            warn!("Environment variable {key} is required");
        })
        .expect("Environment misconfigured!")
}

/// Comma-separated allow-list of probe paths. Every entry must be rooted so
/// the dispatcher can match on whole path segments.
pub fn parse_probe_paths(raw: &str) -> Result<Vec<String>, String> {
    let mut paths: Vec<String> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !paths.iter().any(|p| p == entry) {
            paths.push(entry.to_string());
        }
    }

    if paths.is_empty() {
        return Err("no probe paths declared".to_string());
    }

    for path in &paths {
        if !path.starts_with('/') {
            return Err(format!("probe path {path} must begin with '/'"));
        }
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_paths_are_split_and_trimmed() {
        let paths = parse_probe_paths("/api/health, /healthz").expect("valid list");
        assert_eq!(paths, vec!["/api/health", "/healthz"]);
    }

    #[test]
    fn duplicate_probe_paths_collapse() {
        let paths = parse_probe_paths("/health,/api/health,/health").expect("valid list");
        assert_eq!(paths, vec!["/health", "/api/health"]);
    }

    #[test]
    fn unrooted_probe_path_is_rejected() {
        assert!(parse_probe_paths("/health,api/health").is_err());
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(parse_probe_paths(" , ").is_err());
    }
}
