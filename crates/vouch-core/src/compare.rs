//! The deterministic comparator: the system of record for risk score and
//! zone.
//!
//! Each rule runs independently and adds its weight on failure. A rule whose
//! inputs are missing or unparseable is skipped: it counts as neither a match
//! nor a discrepancy, so missing data can never raise the score. The total is
//! clamped to `0..=100` once, after every rule has run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
  check::Zone,
  fact::{FactField, FactRecord},
  rules::RuleConfig,
};

// ─── Result types ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
  Medium,
  High,
  Critical,
}

/// One field on which the two sides disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
  pub field:              FactField,
  pub severity:           Severity,
  pub claimed_value:      Option<String>,
  pub verified_value:     Option<String>,
  /// Salary only: deviation relative to the claimed value.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difference_percent: Option<f64>,
  /// Employment dates only: largest boundary deviation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difference_days:    Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
  pub risk_score:    u8,
  pub zone:          Zone,
  pub discrepancies: Vec<Discrepancy>,
  pub matches:       Vec<FactField>,
  pub match_rate:    f64,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Compare what the candidate claimed against what the employer verified.
pub fn compare(
  claimed: &FactRecord,
  verified: &FactRecord,
  rules: &RuleConfig,
) -> ComparisonResult {
  let mut tally = Tally::default();

  compare_name(claimed, verified, rules, &mut tally);
  compare_salary(claimed, verified, rules, &mut tally);
  compare_dates(claimed, verified, rules, &mut tally);
  compare_rehire(claimed, verified, rules, &mut tally);
  compare_performance(claimed, verified, rules, &mut tally);

  let risk_score = tally.score.min(100) as u8;
  let total = tally.matches.len() + tally.discrepancies.len();
  let match_rate = if total == 0 {
    100.0
  } else {
    tally.matches.len() as f64 / total as f64 * 100.0
  };

  ComparisonResult {
    risk_score,
    zone: zone_for(risk_score, rules),
    discrepancies: tally.discrepancies,
    matches: tally.matches,
    match_rate,
  }
}

/// Map a score onto a zone using the configured thresholds.
pub fn zone_for(risk_score: u8, rules: &RuleConfig) -> Zone {
  if risk_score >= rules.red_zone_threshold {
    Zone::Red
  } else if risk_score >= rules.green_zone_threshold {
    Zone::Yellow
  } else {
    Zone::Green
  }
}

#[derive(Default)]
struct Tally {
  score:         u32,
  matches:       Vec<FactField>,
  discrepancies: Vec<Discrepancy>,
}

impl Tally {
  fn matched(&mut self, field: FactField) { self.matches.push(field); }

  fn mismatch(&mut self, weight: u32, discrepancy: Discrepancy) {
    self.score = self.score.saturating_add(weight);
    self.discrepancies.push(discrepancy);
  }
}

fn discrepancy(
  field: FactField,
  severity: Severity,
  claimed: &FactRecord,
  verified: &FactRecord,
) -> Discrepancy {
  Discrepancy {
    field,
    severity,
    claimed_value: claimed.get(field).map(str::to_owned),
    verified_value: verified.get(field).map(str::to_owned),
    difference_percent: None,
    difference_days: None,
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

fn compare_name(
  claimed: &FactRecord,
  verified: &FactRecord,
  rules: &RuleConfig,
  tally: &mut Tally,
) {
  let field = FactField::EmployeeName;
  let (Some(c), Some(v)) = (claimed.get(field), verified.get(field)) else {
    return;
  };
  let c = normalise_name(c);
  let v = normalise_name(v);

  if c == v || c.contains(&v) || v.contains(&c) {
    tally.matched(field);
  } else {
    tally.mismatch(
      rules.field_weights.name_mismatch,
      discrepancy(field, Severity::Critical, claimed, verified),
    );
  }
}

fn normalise_name(s: &str) -> String {
  s.split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

fn compare_salary(
  claimed: &FactRecord,
  verified: &FactRecord,
  rules: &RuleConfig,
  tally: &mut Tally,
) {
  let field = FactField::Salary;
  let Some(c) = claimed.get(field).and_then(parse_salary) else { return };
  let Some(v) = verified.get(field).and_then(parse_salary) else { return };
  if c <= 0.0 {
    return;
  }

  let diff = (v - c).abs() / c * 100.0;
  if diff > rules.salary_tolerance_percent {
    let mut d = discrepancy(field, Severity::High, claimed, verified);
    d.difference_percent = Some((diff * 100.0).round() / 100.0);
    tally.mismatch(rules.field_weights.salary_mismatch, d);
  } else {
    tally.matched(field);
  }
}

/// Parse a currency-like magnitude: `"₹10,00,000"`, `"USD 85,000"`,
/// `"12.5 LPA"`, `"12 lakhs per annum"`. Returns `None` when no number is
/// present.
pub fn parse_salary(raw: &str) -> Option<f64> {
  let lower = raw.to_lowercase();
  let start = lower.find(|c: char| c.is_ascii_digit())?;
  let number: String = lower[start..]
    .chars()
    .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
    .filter(|c| *c != ',')
    .collect();
  let value: f64 = number.trim_end_matches('.').parse().ok()?;

  let in_lakhs = lower.contains("lakh")
    || lower.contains("lac")
    || lower.contains("lpa")
    || lower.contains("l.p.a");
  Some(if in_lakhs { value * 100_000.0 } else { value })
}

fn compare_dates(
  claimed: &FactRecord,
  verified: &FactRecord,
  rules: &RuleConfig,
  tally: &mut Tally,
) {
  let field = FactField::EmploymentDates;
  let Some(c) = claimed.get(field).and_then(parse_date_range) else { return };
  let Some(v) = verified.get(field).and_then(parse_date_range) else { return };

  let start_diff = (c.start - v.start).num_days().abs();
  let end_diff = match (c.end, v.end) {
    (Some(ce), Some(ve)) => Some((ce - ve).num_days().abs()),
    (None, None) => Some(0),
    // One side says "present", the other names an end date.
    _ => None,
  };

  let worst = end_diff.map(|e| e.max(start_diff));
  match worst {
    Some(days) if days <= rules.dates_tolerance_days => tally.matched(field),
    _ => {
      let mut d = discrepancy(field, Severity::High, claimed, verified);
      d.difference_days = worst;
      tally.mismatch(rules.field_weights.date_mismatch, d);
    }
  }
}

/// A parsed employment period. `end == None` means "to present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   Option<NaiveDate>,
}

/// Parse `"<start> - <end>"` or `"<start> to <end>"`. Each side may be an ISO
/// date, `dd/mm/yyyy`, `Mon yyyy`, `mm/yyyy`, a bare year, or (end only)
/// `present` / `current` / `till date`.
pub fn parse_date_range(raw: &str) -> Option<DateRange> {
  let normalised = raw.replace(['–', '—'], " - ");
  let lower = normalised.to_lowercase();

  let (start, end) = [" to ", " - ", " till ", " until "]
    .iter()
    .find_map(|sep| lower.split_once(sep))?;

  let start = parse_date(start.trim())?;
  let end = match end.trim() {
    "present" | "current" | "till date" | "date" | "now" | "ongoing" => None,
    other => Some(parse_date(other)?),
  };
  Some(DateRange { start, end })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
  const FULL: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%d %B %Y",
    "%b %d, %Y", "%B %d, %Y",
  ];

  let s = s.trim_end_matches('.');
  if let Some(date) = FULL
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
  {
    return Some(date);
  }

  // Month precision: pin to the first of the month.
  let month_only = [
    (format!("01 {s}"), "%d %b %Y"),
    (format!("01/{s}"), "%d/%m/%Y"),
    (format!("{s}-01"), "%Y-%m-%d"),
  ];
  if let Some(date) = month_only
    .iter()
    .find_map(|(candidate, f)| NaiveDate::parse_from_str(candidate, f).ok())
  {
    return Some(date);
  }

  s.parse::<i32>()
    .ok()
    .filter(|y| (1900..=2200).contains(y))
    .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
}

fn compare_rehire(
  claimed: &FactRecord,
  verified: &FactRecord,
  rules: &RuleConfig,
  tally: &mut Tally,
) {
  let field = FactField::EligibleForRehire;
  let Some(v) = verified.get(field) else { return };

  if v.to_lowercase().contains("no") {
    tally.mismatch(
      rules.field_weights.not_eligible_for_rehire,
      discrepancy(field, Severity::Critical, claimed, verified),
    );
  } else {
    tally.matched(field);
  }
}

fn compare_performance(
  claimed: &FactRecord,
  verified: &FactRecord,
  rules: &RuleConfig,
  tally: &mut Tally,
) {
  let field = FactField::PerformanceRating;
  let Some(rating) = verified.get(field).and_then(leading_integer) else {
    return;
  };

  if rating < 3 {
    tally.mismatch(
      rules.field_weights.low_performance,
      discrepancy(field, Severity::Medium, claimed, verified),
    );
  } else {
    tally.matched(field);
  }
}

/// The integer at the start of `s`, e.g. `4` for `"4/5"`.
fn leading_integer(s: &str) -> Option<i64> {
  let digits: String = s
    .trim()
    .chars()
    .take_while(|c| c.is_ascii_digit())
    .collect();
  digits.parse().ok()
}
