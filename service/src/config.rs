//! Service configuration document
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "cache": { "max_entries": 1024, "ttl_secs": 3600, "sweep_interval_secs": 300 },
//!   "retry": { "max_attempts": 5, "initial_delay_ms": 500, "max_delay_ms": 30000,
//!              "backoff_multiplier": 2.0, "jitter": 0.2 },
//!   "breaker": { "failure_threshold": 5, "window_secs": 60, "cooldown_secs": 30 },
//!   "resolver": { "match_threshold": 70.0, "tie_break_margin": 5.0,
//!                 "max_candidates": 5, "suggestion_limit": 10 },
//!   "relation_limit": 50
//! }
//! ```

use std::time::Duration;

use celebi_client::{BreakerConfig, RetryPolicy};
use celebi_dex::ResolverConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_entries: defaults.max_entries,
            ttl_secs: defaults.ttl.as_secs(),
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            backoff_multiplier: defaults.backoff_multiplier,
            jitter: defaults.jitter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakerSection {
    pub failure_threshold: u32,
    pub window_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for BreakerSection {
    fn default() -> Self {
        let defaults = BreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            window_secs: defaults.window.as_secs(),
            cooldown_secs: defaults.cooldown.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSection {
    pub match_threshold: f64,
    pub tie_break_margin: f64,
    pub max_candidates: usize,
    pub suggestion_limit: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        let defaults = ResolverConfig::default();
        Self {
            match_threshold: defaults.match_threshold,
            tie_break_margin: defaults.tie_break_margin,
            max_candidates: defaults.max_candidates,
            suggestion_limit: defaults.suggestion_limit,
        }
    }
}

/// Complete configuration for [`build`](crate::build)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cache: CacheSection,
    pub retry: RetrySection,
    pub breaker: BreakerSection,
    pub resolver: ResolverSection,
    /// Maximum related keys attached to one answer
    pub relation_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheSection::default(),
            retry: RetrySection::default(),
            breaker: BreakerSection::default(),
            resolver: ResolverSection::default(),
            relation_limit: 50,
        }
    }
}

impl Config {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.max_entries == 0 {
            return Err(invalid("cache.max_entries", "must be at least 1"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be positive"));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(invalid("cache.sweep_interval_secs", "must be positive"));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if retry.max_delay_ms == 0 {
            return Err(invalid("retry.max_delay_ms", "must be positive"));
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            return Err(invalid(
                "retry.initial_delay_ms",
                format!("exceeds max_delay_ms ({})", retry.max_delay_ms),
            ));
        }
        if !(retry.backoff_multiplier >= 1.0 && retry.backoff_multiplier.is_finite()) {
            return Err(invalid("retry.backoff_multiplier", "must be a finite value >= 1"));
        }
        if !(0.0..1.0).contains(&retry.jitter) {
            return Err(invalid("retry.jitter", "must be in [0, 1)"));
        }

        if self.breaker.failure_threshold == 0 {
            return Err(invalid("breaker.failure_threshold", "must be at least 1"));
        }
        if self.breaker.window_secs == 0 {
            return Err(invalid("breaker.window_secs", "must be positive"));
        }
        if self.breaker.cooldown_secs == 0 {
            return Err(invalid("breaker.cooldown_secs", "must be positive"));
        }

        let resolver = &self.resolver;
        if !(0.0..=100.0).contains(&resolver.match_threshold) {
            return Err(invalid("resolver.match_threshold", "must be within 0-100"));
        }
        if !(0.0..=100.0).contains(&resolver.tie_break_margin) {
            return Err(invalid("resolver.tie_break_margin", "must be within 0-100"));
        }
        if resolver.max_candidates == 0 {
            return Err(invalid("resolver.max_candidates", "must be at least 1"));
        }
        if resolver.suggestion_limit == 0 {
            return Err(invalid("resolver.suggestion_limit", "must be at least 1"));
        }

        if self.relation_limit == 0 {
            return Err(invalid("relation_limit", "must be at least 1"));
        }

        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache.max_entries,
            ttl: Duration::from_secs(self.cache.ttl_secs),
            sweep_interval: Duration::from_secs(self.cache.sweep_interval_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            jitter: self.retry.jitter,
        }
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker.failure_threshold,
            window: Duration::from_secs(self.breaker.window_secs),
            cooldown: Duration::from_secs(self.breaker.cooldown_secs),
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            match_threshold: self.resolver.match_threshold,
            tie_break_margin: self.resolver.tie_break_margin,
            max_candidates: self.resolver.max_candidates,
            suggestion_limit: self.resolver.suggestion_limit,
        }
    }
}
