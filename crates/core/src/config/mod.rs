use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

const SHARE_TOLERANCE: f64 = 1e-6;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub catalog: CatalogConfig,
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    /// Reads a TOML file, filling omitted fields with defaults, and
    /// validates the result.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| PipelineError::config(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.default_countries.is_empty() {
            return Err(PipelineError::config(
                "session.default_countries must not be empty",
            ));
        }
        for code in &self.session.default_countries {
            normalize_country(code).map_err(|err| {
                PipelineError::config(format!("session.default_countries: {err}"))
            })?;
        }
        self.catalog.weights.validate()?;
        self.analytics.validate()
    }
}

/// Settings applied when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub default_countries: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_countries: ["US", "CA", "GB", "AU"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub weights: OpportunityWeights,
}

/// Weights combining the three niche scores into an opportunity score.
///
/// Every weight must be positive so the score never falls when an input rises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpportunityWeights {
    pub cpm: f64,
    pub competition: f64,
    pub trend: f64,
}

impl Default for OpportunityWeights {
    fn default() -> Self {
        Self {
            cpm: 0.4,
            competition: 0.3,
            trend: 0.3,
        }
    }
}

impl OpportunityWeights {
    fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("cpm", self.cpm),
            ("competition", self.competition),
            ("trend", self.trend),
        ] {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(PipelineError::config(format!(
                    "catalog.weights.{name} must be a positive number, got {weight}"
                )));
            }
        }
        Ok(())
    }

    fn total(&self) -> f64 {
        self.cpm + self.competition + self.trend
    }

    /// Weighted mean of the three scores, rounded to two decimals.
    pub fn score(&self, cpm: f64, competition: f64, trend: f64) -> f64 {
        let weighted = cpm * self.cpm + competition * self.competition + trend * self.trend;
        round2(weighted / self.total())
    }
}

/// Parameters of the simulated post-publication performance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// CPM used when the owning niche can no longer be resolved.
    pub default_cpm: f64,
    /// Weight given to every country missing from `country_shares`.
    pub residual_share: f64,
    /// Share of views attributed to each known market.
    pub country_shares: BTreeMap<String, f64>,
    pub growth: GrowthCurve,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let country_shares = [("US", 0.55), ("GB", 0.15), ("CA", 0.12), ("AU", 0.10)]
            .into_iter()
            .map(|(code, share)| (code.to_string(), share))
            .collect();

        Self {
            default_cpm: 5.0,
            residual_share: 0.08,
            country_shares,
            growth: GrowthCurve::default(),
        }
    }
}

impl AnalyticsConfig {
    fn validate(&self) -> Result<()> {
        if !(self.default_cpm.is_finite() && self.default_cpm >= 0.0) {
            return Err(PipelineError::config(
                "analytics.default_cpm must be a non-negative number",
            ));
        }

        for code in self.country_shares.keys() {
            if normalize_country(code).ok().as_deref() != Some(code.as_str()) {
                return Err(PipelineError::config(format!(
                    "analytics.country_shares key `{code}` must be an upper-case two-letter country code"
                )));
            }
        }

        let shares = self.country_shares.values().chain([&self.residual_share]);
        if shares.clone().any(|share| !(share.is_finite() && *share >= 0.0)) {
            return Err(PipelineError::config(
                "analytics shares must be non-negative numbers",
            ));
        }

        let total: f64 = shares.sum();
        if (total - 1.0).abs() > SHARE_TOLERANCE {
            return Err(PipelineError::config(format!(
                "analytics.country_shares plus residual_share must sum to 1, got {total}"
            )));
        }

        self.growth.validate()
    }

    /// Share weight for a country code, falling back to the residual share.
    pub fn share_for(&self, country: &str) -> f64 {
        self.country_shares
            .get(country)
            .copied()
            .unwrap_or(self.residual_share)
    }
}

/// Saturating view growth: a fraction of the peak arrives immediately and
/// the rest approaches the peak exponentially.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthCurve {
    pub peak_views: f64,
    pub initial_fraction: f64,
    pub time_constant_hours: f64,
}

impl Default for GrowthCurve {
    fn default() -> Self {
        Self {
            peak_views: 20_000.0,
            initial_fraction: 0.05,
            time_constant_hours: 72.0,
        }
    }
}

impl GrowthCurve {
    fn validate(&self) -> Result<()> {
        if !(self.peak_views.is_finite() && self.peak_views >= 0.0) {
            return Err(PipelineError::config(
                "analytics.growth.peak_views must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_fraction) {
            return Err(PipelineError::config(
                "analytics.growth.initial_fraction must lie in [0, 1]",
            ));
        }
        if !(self.time_constant_hours.is_finite() && self.time_constant_hours > 0.0) {
            return Err(PipelineError::config(
                "analytics.growth.time_constant_hours must be positive",
            ));
        }
        Ok(())
    }

    /// Fraction of the peak reached after `hours`; non-decreasing in time.
    pub fn progress(&self, hours: f64) -> f64 {
        let hours = hours.max(0.0);
        let settled = 1.0 - (-hours / self.time_constant_hours).exp();
        self.initial_fraction + (1.0 - self.initial_fraction) * settled
    }
}

/// Validates a two-letter country code and returns it upper-cased.
pub(crate) fn normalize_country(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PipelineError::invalid_input(format!(
            "`{code}` is not a two-letter country code"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
