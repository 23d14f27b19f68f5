use std::env;

use anyhow::{Context, bail};

use crate::proximity::ProximityStrategy;
use crate::scorer::{DEFAULT_RTREE_CUTOFF, ScorerOptions};

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
/// Distance at which a reported hazard counts against a route.
pub const DEFAULT_THRESHOLD_M: f64 = 150.0;
/// Three minutes per nearby hazard.
pub const DEFAULT_PENALTY_S: f64 = 180.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub default_threshold_m: f64,
    pub default_penalty_s: f64,
    pub proximity: ProximityStrategy,
    pub rtree_cutoff: usize,
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            default_threshold_m: DEFAULT_THRESHOLD_M,
            default_penalty_s: DEFAULT_PENALTY_S,
            proximity: ProximityStrategy::Auto,
            rtree_cutoff: DEFAULT_RTREE_CUTOFF,
            parallel: true,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("ROUTEWATCH_BIND").unwrap_or(defaults.bind_addr);

        let default_threshold_m = match get("ROUTEWATCH_THRESHOLD_M") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid ROUTEWATCH_THRESHOLD_M value '{v}'"))?,
            None => defaults.default_threshold_m,
        };
        if !default_threshold_m.is_finite() || default_threshold_m <= 0.0 {
            bail!("ROUTEWATCH_THRESHOLD_M must be positive, got {default_threshold_m}");
        }

        let default_penalty_s = match get("ROUTEWATCH_PENALTY_S") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid ROUTEWATCH_PENALTY_S value '{v}'"))?,
            None => defaults.default_penalty_s,
        };
        if !default_penalty_s.is_finite() || default_penalty_s < 0.0 {
            bail!("ROUTEWATCH_PENALTY_S must be non-negative, got {default_penalty_s}");
        }

        let proximity = match get("ROUTEWATCH_PROXIMITY") {
            Some(v) => v
                .parse::<ProximityStrategy>()
                .map_err(|e| anyhow::anyhow!("invalid ROUTEWATCH_PROXIMITY: {e}"))?,
            None => defaults.proximity,
        };

        let rtree_cutoff = match get("ROUTEWATCH_RTREE_CUTOFF") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid ROUTEWATCH_RTREE_CUTOFF value '{v}'"))?,
            None => defaults.rtree_cutoff,
        };

        let parallel = match get("ROUTEWATCH_PARALLEL") {
            Some(v) => parse_flag(&v)
                .with_context(|| format!("invalid ROUTEWATCH_PARALLEL value '{v}'"))?,
            None => defaults.parallel,
        };

        Ok(Self {
            bind_addr,
            default_threshold_m,
            default_penalty_s,
            proximity,
            rtree_cutoff,
            parallel,
        })
    }

    pub fn scorer_options(&self) -> ScorerOptions {
        ScorerOptions {
            proximity: self.proximity,
            rtree_cutoff: self.rtree_cutoff,
            parallel: self.parallel,
            ..ScorerOptions::default()
        }
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_threshold_m, 150.0);
        assert_eq!(config.default_penalty_s, 180.0);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ROUTEWATCH_BIND", "127.0.0.1:8080"),
            ("ROUTEWATCH_THRESHOLD_M", "200"),
            ("ROUTEWATCH_PENALTY_S", "60.5"),
            ("ROUTEWATCH_PROXIMITY", "rtree"),
            ("ROUTEWATCH_RTREE_CUTOFF", "10"),
            ("ROUTEWATCH_PARALLEL", "off"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.default_threshold_m, 200.0);
        assert_eq!(config.default_penalty_s, 60.5);
        assert_eq!(config.proximity, ProximityStrategy::RTree);

        let options = config.scorer_options();
        assert_eq!(options.rtree_cutoff, 10);
        assert!(!options.parallel);
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = Config::from_lookup(lookup(&[("ROUTEWATCH_PENALTY_S", "  ")])).unwrap();
        assert_eq!(config.default_penalty_s, DEFAULT_PENALTY_S);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("ROUTEWATCH_THRESHOLD_M", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ROUTEWATCH_THRESHOLD_M", "far")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ROUTEWATCH_PENALTY_S", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ROUTEWATCH_PROXIMITY", "kd")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ROUTEWATCH_PARALLEL", "maybe")])).is_err());
    }
}
