//! ============================================================================
//! Configuration - Environment-driven settings
//! ============================================================================
//! STREAMGATE_DB_PATH              database file (default ~/.streamgate/gate.redb)
//! STREAMGATE_PUBLIC_URL           base for shareable links
//! STREAMGATE_SUBSCRIPTION_DAYS    activation period in days (default 30, at most 36500)
//! STREAMGATE_PLAN_AMOUNT_CENTS    default payment claim (default 2000)
//! ============================================================================

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use std::path::PathBuf;
use url::Url;

use crate::subscription::{DEFAULT_PERIOD_DAYS, DEFAULT_PLAN_AMOUNT_CENTS};

pub const DEFAULT_PUBLIC_URL: &str = "https://linkproibido.com";

/// Longest accepted activation period; keeps `now + period` inside chrono's range
pub const MAX_SUBSCRIPTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub db_path: PathBuf,
    pub public_url: Url,
    pub subscription_days: i64,
    pub plan_amount_cents: u64,
}

impl GateConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults, set but
    /// unparsable keys are errors
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = match lookup("STREAMGATE_DB_PATH") {
            Some(p) => PathBuf::from(p),
            None => default_db_path()?,
        };

        let public_url = lookup("STREAMGATE_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string());
        let public_url = Url::parse(&public_url)
            .with_context(|| format!("Invalid STREAMGATE_PUBLIC_URL '{}'", public_url))?;

        let subscription_days = match lookup("STREAMGATE_SUBSCRIPTION_DAYS") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|d| (1..=MAX_SUBSCRIPTION_DAYS).contains(d))
                .ok_or_else(|| anyhow!("Invalid STREAMGATE_SUBSCRIPTION_DAYS '{}'", v))?,
            None => DEFAULT_PERIOD_DAYS,
        };

        let plan_amount_cents = match lookup("STREAMGATE_PLAN_AMOUNT_CENTS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|a| *a > 0)
                .ok_or_else(|| anyhow!("Invalid STREAMGATE_PLAN_AMOUNT_CENTS '{}'", v))?,
            None => DEFAULT_PLAN_AMOUNT_CENTS,
        };

        Ok(Self {
            db_path,
            public_url,
            subscription_days,
            plan_amount_cents,
        })
    }

    pub fn subscription_period(&self) -> Duration {
        Duration::days(self.subscription_days)
    }
}

fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".streamgate").join("gate.redb"))
}
