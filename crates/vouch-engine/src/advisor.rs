//! The built-in narrator and the fallback used when any narrator fails.

use std::{convert::Infallible, fmt::Write as _};

use vouch_core::{
  check::Check,
  compare::{ComparisonResult, Discrepancy},
};

use crate::collab::Advisor;

/// Composes a plain narrative from the deterministic result. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateAdvisor;

impl Advisor for TemplateAdvisor {
  type Error = Infallible;

  async fn assess(&self, check: &Check, result: &ComparisonResult) -> Result<String, Infallible> {
    let subject = check
      .claimed
      .employee_name
      .as_deref()
      .unwrap_or("The candidate");

    let mut out = format!(
      "{subject}: {} {} check scored {} ({}), {:.0}% of compared fields matched.",
      check.check_type.to_string().to_lowercase(),
      if result.discrepancies.is_empty() { "clean" } else { "flagged" },
      result.risk_score,
      result.zone,
      result.match_rate,
    );

    if !result.matches.is_empty() {
      let fields: Vec<&str> = result.matches.iter().map(|f| f.label()).collect();
      let _ = write!(out, " Confirmed: {}.", fields.join(", "));
    }
    for d in &result.discrepancies {
      let _ = write!(out, " {}", describe(d));
    }
    Ok(out)
  }
}

fn describe(d: &Discrepancy) -> String {
  let claimed = d.claimed_value.as_deref().unwrap_or("-");
  let verified = d.verified_value.as_deref().unwrap_or("-");
  let mut line = format!(
    "{} ({}): claimed \"{claimed}\", employer states \"{verified}\"",
    d.field.label(),
    d.severity,
  );
  if let Some(pct) = d.difference_percent {
    let _ = write!(line, ", {pct:.2}% apart");
  }
  if let Some(days) = d.difference_days {
    let _ = write!(line, ", {days} days apart");
  }
  line.push('.');
  line
}

/// The summary written when the advisor errors. States the deterministic
/// outcome only.
pub fn degraded_summary(result: &ComparisonResult) -> String {
  let fields: Vec<&str> = result.discrepancies.iter().map(|d| d.field.label()).collect();
  let flagged = if fields.is_empty() {
    "none".to_owned()
  } else {
    fields.join(", ")
  };
  format!(
    "Narrative unavailable. Risk score {} ({}); discrepancies: {flagged}.",
    result.risk_score, result.zone,
  )
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;
  use vouch_core::{
    check::{CheckType, NewCheck},
    compare::compare,
    fact::{FactField, FactRecord},
    rules::RuleConfig,
  };

  use super::*;

  #[tokio::test]
  async fn narrative_mentions_each_discrepancy() {
    let mut claimed = FactRecord::default();
    claimed.set(FactField::EmployeeName, "Jane Doe");
    claimed.set(FactField::Salary, "10 LPA");
    let mut verified = claimed.clone();
    verified.set(FactField::Salary, "11.2 LPA");

    let check = Check::open(
      NewCheck {
        case_id: Uuid::new_v4(),
        check_type: CheckType::Employment,
        claimed: claimed.clone(),
      },
      Utc::now(),
    );
    let result = compare(&claimed, &verified, &RuleConfig::default());
    let text = TemplateAdvisor.assess(&check, &result).await.unwrap();

    assert!(text.starts_with("Jane Doe: employment flagged check scored 20 (GREEN)"));
    assert!(text.contains("Confirmed: Employee Name."));
    assert!(text.contains("Salary (HIGH)"));
    assert!(text.contains("12.00% apart"));
  }

  #[test]
  fn degraded_summary_lists_fields() {
    let result = compare(&FactRecord::default(), &FactRecord::default(), &RuleConfig::default());
    assert_eq!(
      degraded_summary(&result),
      "Narrative unavailable. Risk score 0 (GREEN); discrepancies: none."
    );
  }
}
