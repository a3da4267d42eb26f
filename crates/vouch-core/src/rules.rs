//! Rule configuration for the comparator.
//!
//! Field names serialise in camelCase; snake_case aliases are accepted so the
//! same shapes can be written in a TOML config file.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Risk points added per failed rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldWeights {
  #[serde(alias = "name_mismatch")]
  pub name_mismatch:           u32,
  #[serde(alias = "salary_mismatch")]
  pub salary_mismatch:         u32,
  #[serde(alias = "date_mismatch")]
  pub date_mismatch:           u32,
  #[serde(alias = "not_eligible_for_rehire")]
  pub not_eligible_for_rehire: u32,
  #[serde(alias = "low_performance")]
  pub low_performance:         u32,
}

impl Default for FieldWeights {
  fn default() -> Self {
    Self {
      name_mismatch:           30,
      salary_mismatch:         20,
      date_mismatch:           15,
      not_eligible_for_rehire: 40,
      low_performance:         15,
    }
  }
}

/// Tolerances, zone thresholds and weights for one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleConfig {
  #[serde(alias = "salary_tolerance_percent")]
  pub salary_tolerance_percent: f64,
  #[serde(alias = "dates_tolerance_days")]
  pub dates_tolerance_days:     i64,
  /// Scores at or above this are at least YELLOW.
  #[serde(alias = "green_zone_threshold")]
  pub green_zone_threshold:     u8,
  /// Scores at or above this are RED.
  #[serde(alias = "red_zone_threshold")]
  pub red_zone_threshold:       u8,
  #[serde(alias = "field_weights")]
  pub field_weights:            FieldWeights,
}

impl Default for RuleConfig {
  fn default() -> Self {
    Self {
      salary_tolerance_percent: 10.0,
      dates_tolerance_days:     30,
      green_zone_threshold:     30,
      red_zone_threshold:       70,
      field_weights:            FieldWeights::default(),
    }
  }
}

/// Rule configurations keyed by client service tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
  pub default: RuleConfig,
  pub tiers:   HashMap<String, RuleConfig>,
}

impl RuleBook {
  /// The configuration for `tier`, falling back to the default. Tier labels
  /// are matched case-insensitively.
  pub fn for_tier(&self, tier: &str) -> &RuleConfig {
    self
      .tiers
      .iter()
      .find(|(label, _)| label.eq_ignore_ascii_case(tier.trim()))
      .map(|(_, rules)| rules)
      .unwrap_or(&self.default)
  }
}
