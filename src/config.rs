use std::{str::FromStr, time::Duration};

use crate::errors::ServerError;

const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub public_url: Option<String>,
    pub sweep_interval: Duration,
    pub inbox_ttl: Duration,
    pub max_note_ttl: Duration,
    pub trust_proxy: bool,
    pub rate_limit_replenish_ms: u64,
    pub rate_limit_burst: u32,
}

/// Per-request settings the handlers need.
#[derive(Clone, Debug)]
pub struct AppState {
    pub public_url: Option<String>,
    pub trust_proxy: bool,
}

fn var_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ServerError>
where
    T: FromStr,
    ServerError: From<T::Err>,
{
    match lookup(name) {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            if parsed.is_err() {
                log::error!("environment variable {} has an invalid value", name);
            }
            Ok(parsed?)
        }
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let sweep_secs: u64 = var_or(&lookup, "SWEEP_INTERVAL_SECS", 60)?;
        let inbox_secs: u64 = var_or(&lookup, "INBOX_TTL_SECS", 3600)?;
        let max_ttl_secs: u64 = var_or(&lookup, "MAX_NOTE_TTL_SECS", 30 * DAY_SECS)?;
        let replenish_ms: u64 = var_or(&lookup, "RATE_LIMIT_REPLENISH_MS", 500)?;
        let burst: u32 = var_or(&lookup, "RATE_LIMIT_BURST", 120)?;

        // a zero period would make the sweep timer panic
        if [sweep_secs, inbox_secs, max_ttl_secs, replenish_ms].contains(&0) || burst == 0 {
            log::error!("interval, ttl and rate limit settings must be positive");
            return Err(ServerError::EnvironmentError);
        }

        Ok(AppConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var_or(&lookup, "PORT", 5001)?,
            public_url: lookup("PUBLIC_URL").filter(|u| !u.trim().is_empty()),
            sweep_interval: Duration::from_secs(sweep_secs),
            inbox_ttl: Duration::from_secs(inbox_secs),
            max_note_ttl: Duration::from_secs(max_ttl_secs),
            trust_proxy: var_or(&lookup, "TRUST_PROXY", false)?,
            rate_limit_replenish_ms: replenish_ms,
            rate_limit_burst: burst,
        })
    }

    pub fn state(&self) -> AppState {
        AppState {
            public_url: self.public_url.clone(),
            trust_proxy: self.trust_proxy,
        }
    }
}
