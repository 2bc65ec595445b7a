use anyhow::{Context, Result};
use std::{env, str::FromStr, time::Duration};

use crate::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Process configuration, read once from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub temp_image_capacity: usize,
    pub temp_image_ttl: Option<Duration>,
    pub duplicate_check: bool,
    pub expose_error_details: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let ttl_secs: u64 = parse_or(&lookup, "TEMP_IMAGE_TTL_SECS", 3600)?;

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            public_base_url: lookup("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{}", port)),
            gemini_api_base: lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            temp_image_capacity: parse_or(&lookup, "TEMP_IMAGE_CAPACITY", 1000)?,
            temp_image_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            duplicate_check: parse_switch(&lookup, "DUPLICATE_CHECK", true)?,
            expose_error_details: parse_switch(&lookup, "EXPOSE_ERROR_DETAILS", true)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        None => Ok(default),
    }
}

fn parse_switch(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(value) = lookup(key) else { return Ok(default) };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => anyhow::bail!("parsing {} value `{}`: expected on/off", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.public_base_url, "http://localhost:3000");
        assert_eq!(cfg.gemini_model, "gemini-1.5-flash");
        assert_eq!(cfg.temp_image_capacity, 1000);
        assert_eq!(cfg.temp_image_ttl, Some(Duration::from_secs(3600)));
        assert!(cfg.duplicate_check);
        assert!(cfg.expose_error_details);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("GEMINI_MODEL", "gemini-test"),
            ("TEMP_IMAGE_TTL_SECS", "0"),
            ("DUPLICATE_CHECK", "off"),
            ("EXPOSE_ERROR_DETAILS", "OFF"),
        ])
        .unwrap();
        assert_eq!(cfg.public_base_url, "http://localhost:8080");
        assert_eq!(cfg.gemini_model, "gemini-test");
        assert_eq!(cfg.temp_image_ttl, None);
        assert!(!cfg.duplicate_check);
        assert!(!cfg.expose_error_details);
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config(&[("DUPLICATE_CHECK", "maybe")]).is_err());
        assert!(config(&[("TEMP_IMAGE_CAPACITY", "-1")]).is_err());
    }
}
