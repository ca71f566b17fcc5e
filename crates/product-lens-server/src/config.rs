//! Configuration loading and resolution.
//!
//! Every setting resolves explicit flag → `PRODUCT_LENS_*` environment
//! variable → built-in default.

use anyhow::Context;
use product_lens::{OverrideSource, ResolverConfig};
use std::net::SocketAddr;

pub const ENV_ORIGIN: &str = "PRODUCT_LENS_ORIGIN";
pub const ENV_OVERRIDES: &str = "PRODUCT_LENS_OVERRIDES";
pub const ENV_TIMEOUT_MS: &str = "PRODUCT_LENS_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "PRODUCT_LENS_MAX_RETRIES";
pub const ENV_ADDR: &str = "PRODUCT_LENS_ADDR";

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Settings given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigFlags {
    pub origin: Option<String>,
    pub overrides: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Build the resolver configuration from flags and the process environment.
pub fn resolve_config(flags: &ConfigFlags) -> anyhow::Result<ResolverConfig> {
    resolve_config_with(flags, |key| std::env::var(key).ok())
}

/// Same as [`resolve_config`] with an explicit environment lookup.
pub fn resolve_config_with<F>(flags: &ConfigFlags, env: F) -> anyhow::Result<ResolverConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let mut config = match flags.origin.clone().or_else(|| env(ENV_ORIGIN)) {
        Some(origin) => ResolverConfig::for_origin(origin.trim()),
        None => ResolverConfig::default(),
    };

    if let Some(source) = flags.overrides.clone().or_else(|| env(ENV_OVERRIDES)) {
        config.overrides = OverrideSource::parse(&source);
    }

    if let Some(ms) = flags.timeout_ms {
        config.page_timeout_ms = ms;
    } else if let Some(raw) = env(ENV_TIMEOUT_MS) {
        config.page_timeout_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("{ENV_TIMEOUT_MS}={raw} is not a number of milliseconds"))?;
    }

    if let Some(retries) = flags.max_retries {
        config.max_retries = retries;
    } else if let Some(raw) = env(ENV_MAX_RETRIES) {
        config.max_retries = raw
            .trim()
            .parse()
            .with_context(|| format!("{ENV_MAX_RETRIES}={raw} is not a retry count"))?;
    }

    Ok(config)
}

/// Resolve the listen address for `serve`.
pub fn resolve_addr(explicit: Option<&str>) -> anyhow::Result<SocketAddr> {
    resolve_addr_with(explicit, |key| std::env::var(key).ok())
}

pub fn resolve_addr_with<F>(explicit: Option<&str>, env: F) -> anyhow::Result<SocketAddr>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match explicit {
        Some(addr) => addr.to_string(),
        None => env(ENV_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string()),
    };
    raw.trim()
        .parse()
        .with_context(|| format!("invalid listen address: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_flags_or_env() {
        let config = resolve_config_with(&ConfigFlags::default(), env_of(&[])).unwrap();
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn test_env_fills_unset_flags() {
        let env = env_of(&[
            (ENV_ORIGIN, "http://127.0.0.1:9000/"),
            (ENV_OVERRIDES, "https://cdn.example.com/overrides.json"),
            (ENV_TIMEOUT_MS, "1500"),
            (ENV_MAX_RETRIES, " 0 "),
        ]);
        let config = resolve_config_with(&ConfigFlags::default(), env).unwrap();

        assert_eq!(config.origin, "http://127.0.0.1:9000");
        assert_eq!(config.root_sitemaps[0], "http://127.0.0.1:9000/sitemap_index.xml");
        assert_eq!(
            config.overrides,
            OverrideSource::Url("https://cdn.example.com/overrides.json".into())
        );
        assert_eq!(config.page_timeout_ms, 1500);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_flags_beat_env() {
        let env = env_of(&[(ENV_OVERRIDES, "https://x/o.json"), (ENV_MAX_RETRIES, "5")]);
        let flags = ConfigFlags {
            overrides: Some("data/overrides.json".into()),
            max_retries: Some(1),
            ..ConfigFlags::default()
        };
        let config = resolve_config_with(&flags, env).unwrap();

        assert_eq!(
            config.overrides,
            OverrideSource::File(PathBuf::from("data/overrides.json"))
        );
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_bad_numbers_are_errors() {
        let err = resolve_config_with(&ConfigFlags::default(), env_of(&[(ENV_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_MS));
    }

    #[test]
    fn test_addr_resolution() {
        assert_eq!(
            resolve_addr_with(None, env_of(&[])).unwrap().to_string(),
            DEFAULT_ADDR
        );
        assert_eq!(
            resolve_addr_with(None, env_of(&[(ENV_ADDR, "0.0.0.0:8080")]))
                .unwrap()
                .port(),
            8080
        );
        assert_eq!(
            resolve_addr_with(Some("127.0.0.1:4000"), env_of(&[(ENV_ADDR, "0.0.0.0:8080")]))
                .unwrap()
                .port(),
            4000
        );
        assert!(resolve_addr_with(Some("nowhere"), env_of(&[])).is_err());
    }
}
