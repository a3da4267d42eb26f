//! The fixed verification spreadsheet layout.
//!
//! Twenty rows: a header, then one question per row. Column A holds the
//! question, B the claimed value (read-only for the employer), C the verified
//! value the HR contact fills in, D free comments.

use serde::{Deserialize, Serialize};
use vouch_core::fact::{FactField, FactRecord};

use crate::{Error, Result};

pub const SHEET_ROWS: usize = 20;

const HEADER: [&str; 4] = ["Question", "Claimed", "Verified", "Comments"];

/// Questions beyond the comparable facts. Asked so the sheet reads like a
/// complete reference form; answers are kept in the document only.
const EXTRA_QUESTIONS: [&str; 11] = [
  "Employee ID",
  "Department",
  "Reporting Manager",
  "Work Location",
  "Employment Type",
  "Notice Period Served",
  "Exit Formalities Completed",
  "Disciplinary Action",
  "Verifier Name",
  "Verifier Designation",
  "Verifier Email",
];

/// One row, columns A to D.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
  pub question: String,
  #[serde(default)]
  pub claimed:  String,
  #[serde(default)]
  pub verified: String,
  #[serde(default)]
  pub comments: String,
}

impl SheetRow {
  fn question(question: &str, claimed: Option<&str>) -> Self {
    Self {
      question: question.to_owned(),
      claimed: claimed.unwrap_or_default().to_owned(),
      ..Self::default()
    }
  }

  /// The verified cell, unless blank or `N/A`.
  pub fn answer(&self) -> Option<&str> {
    let v = self.verified.trim();
    (!v.is_empty() && !v.eq_ignore_ascii_case("n/a")).then_some(v)
  }
}

/// A verification sheet as read from, or written to, the sheet source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDocument {
  pub document_ref: String,
  pub rows:         Vec<SheetRow>,
}

/// Which fact, if any, a question row answers.
fn field_for_question(question: &str) -> Option<FactField> {
  FactField::all().find(|f| f.label().eq_ignore_ascii_case(question.trim()))
}

impl SheetDocument {
  /// A blank sheet with the claimed column filled from `claimed`.
  pub fn template(document_ref: impl Into<String>, claimed: &FactRecord) -> Self {
    let header = SheetRow {
      question: HEADER[0].into(),
      claimed:  HEADER[1].into(),
      verified: HEADER[2].into(),
      comments: HEADER[3].into(),
    };
    let rows = std::iter::once(header)
      .chain(FactField::all().map(|f| SheetRow::question(f.label(), claimed.get(f))))
      .chain(EXTRA_QUESTIONS.iter().map(|q| SheetRow::question(q, None)))
      .collect();
    Self { document_ref: document_ref.into(), rows }
  }

  /// Reject documents whose shape does not match the fixed layout.
  pub fn validate(&self) -> Result<()> {
    if self.rows.len() != SHEET_ROWS {
      return Err(Error::SheetLayout {
        document_ref: self.document_ref.clone(),
        reason:       format!("expected {SHEET_ROWS} rows, found {}", self.rows.len()),
      });
    }
    let header_ok = self
      .rows
      .first()
      .is_some_and(|r| r.question.trim().eq_ignore_ascii_case(HEADER[0]));
    if !header_ok {
      return Err(Error::SheetLayout {
        document_ref: self.document_ref.clone(),
        reason:       "missing header row".into(),
      });
    }
    Ok(())
  }

  fn answers(&self) -> impl Iterator<Item = &SheetRow> {
    self.rows.iter().skip(1).filter(|r| r.answer().is_some())
  }

  /// At least three verified cells filled with something other than `N/A`.
  pub fn has_responded(&self) -> bool { self.answers().nth(2).is_some() }

  /// The verified column read back into a fact record.
  pub fn verified_facts(&self) -> FactRecord {
    let mut facts = FactRecord::default();
    for row in self.answers() {
      if let (Some(field), Some(value)) = (field_for_question(&row.question), row.answer()) {
        facts.set(field, value);
      }
    }
    facts
  }

  /// Comments column, joined, for rows that have one.
  pub fn comments(&self) -> Option<String> {
    let joined = self
      .rows
      .iter()
      .skip(1)
      .filter(|r| !r.comments.trim().is_empty())
      .map(|r| format!("{}: {}", r.question, r.comments.trim()))
      .collect::<Vec<_>>()
      .join("\n");
    (!joined.is_empty()).then_some(joined)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn claimed() -> FactRecord {
    let mut f = FactRecord::default();
    f.set(FactField::EmployeeName, "Jane Doe");
    f.set(FactField::Salary, "10 LPA");
    f
  }

  fn fill(doc: &mut SheetDocument, question: &str, value: &str) {
    let row = doc
      .rows
      .iter_mut()
      .find(|r| r.question == question)
      .expect("question present");
    row.verified = value.into();
  }

  #[test]
  fn template_has_fixed_layout() {
    let doc = SheetDocument::template("doc-1", &claimed());
    assert_eq!(doc.rows.len(), SHEET_ROWS);
    doc.validate().unwrap();
    assert_eq!(doc.rows[1].question, "Employee Name");
    assert_eq!(doc.rows[1].claimed, "Jane Doe");
    assert_eq!(doc.rows[5].claimed, "10 LPA");
    assert!(doc.rows.iter().skip(1).all(|r| r.verified.is_empty()));
  }

  #[test]
  fn responded_needs_three_real_answers() {
    let mut doc = SheetDocument::template("doc-1", &claimed());
    fill(&mut doc, "Employee Name", "Jane Doe");
    fill(&mut doc, "Salary", "N/A");
    fill(&mut doc, "Designation", "  ");
    assert!(!doc.has_responded());

    fill(&mut doc, "Designation", "Engineer");
    assert!(!doc.has_responded());

    fill(&mut doc, "Verifier Name", "R. Kumar");
    assert!(doc.has_responded());
  }

  #[test]
  fn verified_facts_only_maps_fact_rows() {
    let mut doc = SheetDocument::template("doc-1", &claimed());
    fill(&mut doc, "Salary", "11 LPA");
    fill(&mut doc, "Eligible for Rehire", "No");
    fill(&mut doc, "Performance Rating", "n/a");
    fill(&mut doc, "Verifier Name", "R. Kumar");

    let facts = doc.verified_facts();
    assert_eq!(facts.get(FactField::Salary), Some("11 LPA"));
    assert_eq!(facts.get(FactField::EligibleForRehire), Some("No"));
    assert_eq!(facts.get(FactField::PerformanceRating), None);
    assert_eq!(facts.present_fields().len(), 2);
  }

  #[test]
  fn wrong_shape_is_rejected() {
    let mut doc = SheetDocument::template("doc-1", &claimed());
    doc.rows.pop();
    assert!(matches!(doc.validate(), Err(Error::SheetLayout { .. })));
  }
}
