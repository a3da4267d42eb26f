//! Fact records: the shape shared by the claimed and the verified side of a
//! check.
//!
//! Every field is an optional string. Absence means "not compared", never
//! "mismatch": a verifier that leaves salary blank must not make a candidate
//! look riskier.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};

// ─── FactField ───────────────────────────────────────────────────────────────

/// A comparable employment attribute. The string form is the camelCase JSON
/// field name of [`FactRecord`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FactField {
  EmployeeName,
  CompanyName,
  Designation,
  EmploymentDates,
  Salary,
  EligibleForRehire,
  PerformanceRating,
  ReasonForLeaving,
}

impl FactField {
  /// Human-readable label, as printed in outbound messages and sheet rows.
  pub fn label(self) -> &'static str {
    match self {
      Self::EmployeeName => "Employee Name",
      Self::CompanyName => "Company Name",
      Self::Designation => "Designation",
      Self::EmploymentDates => "Employment Dates",
      Self::Salary => "Salary",
      Self::EligibleForRehire => "Eligible for Rehire",
      Self::PerformanceRating => "Performance Rating",
      Self::ReasonForLeaving => "Reason for Leaving",
    }
  }

  /// All fields in declaration order.
  pub fn all() -> impl Iterator<Item = FactField> { Self::iter() }
}

// ─── FactRecord ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub employee_name:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub designation:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub employment_dates:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub salary:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub eligible_for_rehire: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub performance_rating:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason_for_leaving:  Option<String>,
}

impl FactRecord {
  /// The value of `field`, or `None` when absent or blank.
  pub fn get(&self, field: FactField) -> Option<&str> {
    let slot = match field {
      FactField::EmployeeName => &self.employee_name,
      FactField::CompanyName => &self.company_name,
      FactField::Designation => &self.designation,
      FactField::EmploymentDates => &self.employment_dates,
      FactField::Salary => &self.salary,
      FactField::EligibleForRehire => &self.eligible_for_rehire,
      FactField::PerformanceRating => &self.performance_rating,
      FactField::ReasonForLeaving => &self.reason_for_leaving,
    };
    slot.as_deref().map(str::trim).filter(|v| !v.is_empty())
  }

  pub fn set(&mut self, field: FactField, value: impl Into<String>) {
    let slot = match field {
      FactField::EmployeeName => &mut self.employee_name,
      FactField::CompanyName => &mut self.company_name,
      FactField::Designation => &mut self.designation,
      FactField::EmploymentDates => &mut self.employment_dates,
      FactField::Salary => &mut self.salary,
      FactField::EligibleForRehire => &mut self.eligible_for_rehire,
      FactField::PerformanceRating => &mut self.performance_rating,
      FactField::ReasonForLeaving => &mut self.reason_for_leaving,
    };
    *slot = Some(value.into());
  }

  /// Fields that carry a non-blank value.
  pub fn present_fields(&self) -> Vec<FactField> {
    FactField::all().filter(|f| self.get(*f).is_some()).collect()
  }

  pub fn is_empty(&self) -> bool { self.present_fields().is_empty() }

  /// Fill every field missing from `self` with the value from `other`.
  pub fn merge_missing(&mut self, other: &FactRecord) {
    for field in FactField::all() {
      if self.get(field).is_none()
        && let Some(value) = other.get(field)
      {
        self.set(field, value);
      }
    }
  }
}

// ─── ResponseMethod ──────────────────────────────────────────────────────────

/// How an employer's reply carried its data.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseMethod {
  /// The reply points at the shared spreadsheet; the sheet is authoritative.
  StructuredLink,
  /// Labelled fields were found in the prose.
  FreeText,
  /// Nothing parseable; a human must read the note.
  Unstructured,
}
