//! The fact normalizer: free-text reply → partial [`FactRecord`].
//!
//! Extraction is an ordered list of `(target, matcher, validator)` rules run
//! over the sanitised span produced by [`crate::sanitize::strip_quoted`]. The
//! first valid match for each target wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use vouch_core::fact::{FactField, FactRecord, ResponseMethod};

use crate::sanitize::{is_quoted_line, strip_quoted};

// ─── Output ──────────────────────────────────────────────────────────────────

/// What the normalizer could make of one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
  pub method:       ResponseMethod,
  /// Asserted values, as stated by the replier; not cross-checked.
  pub facts:        FactRecord,
  /// Fields found, in rule order.
  pub matched:      Vec<FactField>,
  /// Correlation reference quoted in the reply, `_EMP` suffix removed.
  pub reference:    Option<String>,
  /// Spreadsheet id when the reply links the shared sheet.
  pub document_ref: Option<String>,
  /// The retained text, kept when nothing structured could be extracted.
  pub note:         Option<String>,
}

// ─── Rules ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
  Fact(FactField),
  Reference,
}

struct FieldRule {
  target:   Target,
  matcher:  Regex,
  /// Cleans a raw candidate, or rejects it with `None`.
  validate: fn(&str) -> Option<String>,
}

impl FieldRule {
  /// `phrases` are multi-word labels and may be followed by whitespace alone.
  /// `words` are single-word labels and need an explicit `:` or `#`, so
  /// prose like "Employer policy does not permit..." is not a field.
  fn new(
    target: Target,
    phrases: &str,
    words: &str,
    validate: fn(&str) -> Option<String>,
  ) -> Option<Self> {
    // Optional bullet ("-", "*", "1.") then a label and its separator, then
    // the value to end of line.
    let pattern = format!(
      r"(?mi)^[ \t]*(?:[-*•][ \t]*|\d{{1,2}}[.)][ \t]*)?(?:(?:{phrases})[:#\t ]+|(?:{words})[ \t]*[:#][:#\t ]*)([^\r\n]+)"
    );
    Regex::new(&pattern)
      .ok()
      .map(|matcher| Self { target, matcher, validate })
  }

  fn first_value(&self, text: &str) -> Option<String> {
    self.matcher.captures_iter(text).find_map(|caps| {
      let whole = caps.get(0)?;
      if is_quoted_line(text, whole.start()) {
        return None;
      }
      (self.validate)(caps.get(1)?.as_str().trim())
    })
  }
}

fn has_letter(v: &str) -> Option<String> {
  v.chars()
    .any(char::is_alphabetic)
    .then(|| v.to_owned())
}

fn has_digit(v: &str) -> Option<String> {
  v.chars().any(|c| c.is_ascii_digit()).then(|| v.to_owned())
}

fn dates(v: &str) -> Option<String> {
  let lower = v.to_lowercase();
  (v.chars().any(|c| c.is_ascii_digit()) || lower.contains("present"))
    .then(|| v.to_owned())
}

fn non_empty(v: &str) -> Option<String> { (!v.is_empty()).then(|| v.to_owned()) }

fn reference(v: &str) -> Option<String> {
  let token: String = v
    .chars()
    .skip_while(|c| matches!(c, '#' | ':' | ' '))
    .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
    .collect();
  (token.len() >= 4 && token.chars().any(|c| c.is_ascii_digit()))
    .then(|| strip_emp_suffix(&token).to_owned())
}

static RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
  use FactField as F;
  [
    FieldRule::new(
      Target::Fact(F::EmployeeName),
      r"employee\s+name|name\s+of\s+(?:the\s+)?employee|candidate\s+name|full\s+name",
      r"name",
      has_letter,
    ),
    FieldRule::new(
      Target::Fact(F::CompanyName),
      r"company\s+name|name\s+of\s+(?:the\s+)?(?:company|organi[sz]ation|employer)",
      r"organi[sz]ation|employer|company",
      has_letter,
    ),
    FieldRule::new(
      Target::Fact(F::Designation),
      r"job\s+title|position\s+held",
      r"designation|title|position|role",
      has_letter,
    ),
    FieldRule::new(
      Target::Fact(F::EmploymentDates),
      r"employment\s+dates|dates\s+of\s+employment|employment\s+period|period\s+of\s+employment|duration\s+of\s+employment",
      r"tenure",
      dates,
    ),
    FieldRule::new(
      Target::Fact(F::Salary),
      r"last\s+drawn\s+salary|annual\s+ctc",
      r"salary|ctc|compensation|remuneration",
      has_digit,
    ),
    FieldRule::new(
      Target::Fact(F::EligibleForRehire),
      r"eligible\s+for\s+re-?hire|re-?hire\s+eligibility|eligibility\s+for\s+re-?hire|re-?hire\s+eligible",
      r"re-?hire",
      non_empty,
    ),
    FieldRule::new(
      Target::Fact(F::PerformanceRating),
      r"performance\s+rating",
      r"performance|rating",
      non_empty,
    ),
    FieldRule::new(
      Target::Fact(F::ReasonForLeaving),
      r"reason\s+for\s+(?:leaving|exit|separation)|reason\s+of\s+leaving|exit\s+reason",
      r"reason",
      non_empty,
    ),
    FieldRule::new(
      Target::Reference,
      r"check\s*id|verification\s*id|request\s*id|case\s*id|reference\s+(?:id|no\.?|number)|ref\s+(?:id|no\.?)",
      r"reference|ref(?:id|no\.?)?",
      reference,
    ),
  ]
  .into_iter()
  .flatten()
  .collect()
});

static RE_SHEET_LINK: LazyLock<Option<Regex>> = LazyLock::new(|| {
  Regex::new(r"https?://docs\.google\.com/spreadsheets/d/([A-Za-z0-9_-]+)").ok()
});

// ─── Public API ──────────────────────────────────────────────────────────────

/// Remove a trailing `_EMP` marker from an identifier.
pub fn strip_emp_suffix(id: &str) -> &str {
  match id.len().checked_sub(4).and_then(|at| id.get(at..).map(|s| (at, s))) {
    Some((at, suffix)) if suffix.eq_ignore_ascii_case("_EMP") => &id[..at],
    _ => id,
  }
}

/// The spreadsheet id linked from `text`, if any.
pub fn sheet_reference(text: &str) -> Option<String> {
  RE_SHEET_LINK
    .as_ref()?
    .captures(text)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().to_owned())
}

/// Normalize a reply body (already stripped of MIME framing).
pub fn normalize(text: &str) -> Extraction {
  let retained = strip_quoted(text);

  if let Some(document_ref) = sheet_reference(retained) {
    return Extraction {
      method:       ResponseMethod::StructuredLink,
      facts:        FactRecord::default(),
      matched:      Vec::new(),
      reference:    None,
      document_ref: Some(document_ref),
      note:         None,
    };
  }

  let mut facts = FactRecord::default();
  let mut matched = Vec::new();
  let mut reference = None;

  for rule in RULES.iter() {
    let Some(value) = rule.first_value(retained) else { continue };
    match rule.target {
      Target::Fact(field) => {
        facts.set(field, value);
        matched.push(field);
      }
      Target::Reference => reference = Some(value),
    }
  }

  if matched.is_empty() {
    return Extraction {
      method: ResponseMethod::Unstructured,
      facts,
      matched,
      reference,
      document_ref: None,
      note: (!retained.is_empty()).then(|| retained.to_owned()),
    };
  }

  Extraction {
    method: ResponseMethod::FreeText,
    facts,
    matched,
    reference,
    document_ref: None,
    note: None,
  }
}
