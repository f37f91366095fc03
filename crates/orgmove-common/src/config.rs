//! Reconciler configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment:
//! - `ORGMOVE_POLL_INTERVAL_SECS` - seconds between confirmation listings
//! - `ORGMOVE_POLL_MAX_ATTEMPTS` - listing budget (0 = unbounded)
//! - `ORGMOVE_TRAVERSAL` - `strict` or `lenient`

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, Result};

/// Default delay between confirmation listings
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Environment variable overriding the poll interval
pub const POLL_INTERVAL_ENV: &str = "ORGMOVE_POLL_INTERVAL_SECS";

/// Environment variable overriding the poll attempt budget
pub const POLL_MAX_ATTEMPTS_ENV: &str = "ORGMOVE_POLL_MAX_ATTEMPTS";

/// Environment variable overriding the traversal policy
pub const TRAVERSAL_ENV: &str = "ORGMOVE_TRAVERSAL";

/// What to do when listing one subtree of the hierarchy fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalPolicy {
    /// Abort the whole traversal on the first failed subtree
    #[default]
    Strict,
    /// Log the failure and treat the subtree as empty
    Lenient,
}

impl FromStr for TraversalPolicy {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TraversalPolicy::Strict),
            "lenient" => Ok(TraversalPolicy::Lenient),
            other => Err(PlacementError::config(format!(
                "unknown traversal policy '{}', expected strict or lenient",
                other
            ))),
        }
    }
}

/// Confirmation poll settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between membership listings
    #[serde(rename = "interval_secs", with = "duration_secs")]
    pub interval: Duration,
    /// Maximum number of listings (0 = unbounded)
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: 0, // unbounded
        }
    }
}

impl PollConfig {
    /// Poll forever at the default interval
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Poll at most `attempts` times
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Override the interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether the attempt budget is exhausted after `attempt` listings
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// Settings for the placement reconciler
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Confirmation poll settings
    pub poll: PollConfig,
    /// Hierarchy traversal failure policy
    pub traversal: TraversalPolicy,
}

impl ReconcilerConfig {
    /// Parse a config from JSON
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| PlacementError::config(format!("invalid config: {}", e)))
    }

    /// Load a config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            PlacementError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    /// Load from an optional file, then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                PlacementError::config(format!("{} must be a number, got '{}'", POLL_INTERVAL_ENV, raw))
            })?;
            self.poll.interval = poll_interval(secs)
                .map_err(|e| PlacementError::config(format!("{}: {}", POLL_INTERVAL_ENV, e)))?;
        }
        if let Some(raw) = lookup(POLL_MAX_ATTEMPTS_ENV) {
            self.poll.max_attempts = raw.trim().parse().map_err(|_| {
                PlacementError::config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    POLL_MAX_ATTEMPTS_ENV, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(TRAVERSAL_ENV) {
            self.traversal = raw.parse()?;
        }
        Ok(self)
    }
}

/// Interval between confirmation listings; must be positive
fn poll_interval(secs: f64) -> std::result::Result<Duration, String> {
    let interval = Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err(format!("poll interval must be positive, got {}", secs));
    }
    Ok(interval)
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        super::poll_interval(secs).map_err(serde::de::Error::custom)
    }
}
