use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToponymError};

/// Thresholds of the anchor/lasso heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HeuristicSettings {
    /// Maximum distance for a candidate to be "caught" by an anchor.
    pub anchor_distance_km: f64,
    /// Minimum population for a location to become an anchor on its own.
    pub anchor_population_threshold: u64,
    /// Minimum population to be caught as a descendant of an anchor.
    pub lower_population_threshold: u64,
    /// Maximum spread (km) of same-named candidates that are assumed to be one place.
    pub same_distance_threshold: f64,
    /// The lasso stops once the farthest remaining location is closer than this (km).
    pub lasso_distance_threshold: f64,
    /// Person-like mentions whose biggest candidate stays below this are dropped.
    pub lower_unlikely_population_threshold: u64,
    /// Multi-word mentions with at least this many tokens qualify as anchors regardless of population.
    pub min_token_count: usize,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            anchor_distance_km: 100.0,
            anchor_population_threshold: 1_000_000,
            lower_population_threshold: 5_000,
            same_distance_threshold: 50.0,
            lasso_distance_threshold: 100.0,
            lower_unlikely_population_threshold: 100_000,
            min_token_count: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassifierSettings {
    /// Minimum "true" probability for the best candidate to be accepted.
    pub probability_threshold: f64,
    /// Tokens left of a mention inspected by the context classifier.
    pub context_window_size: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            probability_threshold: 0.15,
            context_window_size: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FeatureSettings {
    /// Radii (km) for the distance-banded features.
    pub distance_values: Vec<u32>,
    /// Population cutoffs for the population-banded features.
    pub population_values: Vec<u64>,
    /// Candidates of one mention spread less than this (km) count as a single place.
    pub equal_distance_km: f64,
    /// Marker words ("river", "lake", ...) checked against the mention text.
    pub location_markers: Vec<String>,
    /// Mention categories exported as `category(<name>)` probabilities.
    pub entity_categories: Vec<String>,
    pub use_hierarchy_features: bool,
    /// Adds identifying columns (text hash, offsets, ids) for inspecting training data.
    pub debug_features: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            distance_values: vec![10, 50, 100, 250],
            population_values: vec![1_000, 10_000, 100_000, 1_000_000],
            equal_distance_km: 50.0,
            location_markers: Vec::new(),
            entity_categories: Vec::new(),
            use_hierarchy_features: true,
            debug_features: false,
        }
    }
}

/// Immutable configuration handed to every strategy at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DisambiguationConfig {
    pub heuristic: HeuristicSettings,
    pub classifier: ClassifierSettings,
    pub features: FeatureSettings,
}

impl DisambiguationConfig {
    /// Load a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DisambiguationConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `TOPONYM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Overlay `TOPONYM_*` environment variables onto this configuration.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let h = &mut self.heuristic;
        override_from_env("TOPONYM_ANCHOR_DISTANCE_KM", &mut h.anchor_distance_km)?;
        override_from_env("TOPONYM_ANCHOR_POPULATION_THRESHOLD", &mut h.anchor_population_threshold)?;
        override_from_env("TOPONYM_LOWER_POPULATION_THRESHOLD", &mut h.lower_population_threshold)?;
        override_from_env("TOPONYM_SAME_DISTANCE_THRESHOLD", &mut h.same_distance_threshold)?;
        override_from_env("TOPONYM_LASSO_DISTANCE_THRESHOLD", &mut h.lasso_distance_threshold)?;
        override_from_env(
            "TOPONYM_LOWER_UNLIKELY_POPULATION_THRESHOLD",
            &mut h.lower_unlikely_population_threshold,
        )?;
        override_from_env("TOPONYM_MIN_TOKEN_COUNT", &mut h.min_token_count)?;

        let c = &mut self.classifier;
        override_from_env("TOPONYM_PROBABILITY_THRESHOLD", &mut c.probability_threshold)?;
        override_from_env("TOPONYM_CONTEXT_WINDOW_SIZE", &mut c.context_window_size)?;

        let f = &mut self.features;
        override_from_env("TOPONYM_EQUAL_DISTANCE_KM", &mut f.equal_distance_km)?;
        override_from_env("TOPONYM_DEBUG_FEATURES", &mut f.debug_features)?;
        if let Ok(markers) = env::var("TOPONYM_LOCATION_MARKERS") {
            f.location_markers = markers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let h = &self.heuristic;
        for (name, value) in [
            ("anchorDistanceKm", h.anchor_distance_km),
            ("sameDistanceThreshold", h.same_distance_threshold),
            ("lassoDistanceThreshold", h.lasso_distance_threshold),
            ("equalDistanceKm", self.features.equal_distance_km),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ToponymError::Config(format!(
                    "{name} must be a non-negative distance, got {value}"
                )));
            }
        }
        if h.min_token_count == 0 {
            return Err(ToponymError::Config("minTokenCount must be at least 1".into()));
        }
        let p = self.classifier.probability_threshold;
        if !(0.0..=1.0).contains(&p) {
            return Err(ToponymError::Config(format!(
                "probabilityThreshold must lie in [0, 1], got {p}"
            )));
        }
        Ok(())
    }

    /// One-line summary of the effective thresholds.
    pub fn log_summary(&self) {
        let h = &self.heuristic;
        tracing::info!(
            anchor_distance_km = h.anchor_distance_km,
            anchor_population = h.anchor_population_threshold,
            lower_population = h.lower_population_threshold,
            same_distance_km = h.same_distance_threshold,
            lasso_distance_km = h.lasso_distance_threshold,
            unlikely_population = h.lower_unlikely_population_threshold,
            min_token_count = h.min_token_count,
            probability_threshold = self.classifier.probability_threshold,
            "Disambiguation config loaded"
        );
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) -> Result<()> {
    match env::var(key) {
        Ok(raw) => {
            *target = raw
                .trim()
                .parse()
                .map_err(|_| ToponymError::Config(format!("{key} has an invalid value: {raw}")))?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = DisambiguationConfig::default();
        assert_eq!(config.heuristic.anchor_distance_km, 100.0);
        assert_eq!(config.heuristic.anchor_population_threshold, 1_000_000);
        assert_eq!(config.heuristic.lower_population_threshold, 5_000);
        assert_eq!(config.heuristic.same_distance_threshold, 50.0);
        assert_eq!(config.heuristic.lasso_distance_threshold, 100.0);
        assert_eq!(config.heuristic.lower_unlikely_population_threshold, 100_000);
        assert_eq!(config.heuristic.min_token_count, 2);
        assert_eq!(config.classifier.probability_threshold, 0.15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: DisambiguationConfig = toml::from_str(
            r#"
            [heuristic]
            anchorDistanceKm = 75.0

            [features]
            locationMarkers = ["river", "lake"]
            "#,
        )
        .unwrap();
        assert_eq!(config.heuristic.anchor_distance_km, 75.0);
        assert_eq!(config.heuristic.lasso_distance_threshold, 100.0);
        assert_eq!(config.features.location_markers, vec!["river", "lake"]);
        assert_eq!(config.features.distance_values, vec![10, 50, 100, 250]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<DisambiguationConfig, _> = toml::from_str(
            r#"
            [heuristic]
            anchorDistance = 75.0
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = DisambiguationConfig::default();
        config.classifier.probability_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ToponymError::Config(_))));

        let mut config = DisambiguationConfig::default();
        config.heuristic.anchor_distance_km = -1.0;
        assert!(config.validate().is_err());
    }
}
