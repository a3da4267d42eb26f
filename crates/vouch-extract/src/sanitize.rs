//! Quote stripping: cut a reply down to the text its author actually wrote.
//!
//! Kept separate from field extraction so each can be tested on its own. The
//! normalizer only ever sees the span returned here.

use std::sync::LazyLock;

use regex::Regex;

macro_rules! boundary {
  ($name:ident, $re:expr) => {
    static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($re).ok());
  };
}

// "On Mon, Jan 1, 2024 at 10:00, Alice <alice@example.com> wrote:"
boundary!(RE_WROTE, r"(?m)^[^\n]*\bwrote:[ \t]*\r?$");

// The same attribution wrapped by the client:
// "On Mon, Jan 1, 2024 at 10:00 AM Alice <" / "alice@example.com> wrote:"
boundary!(RE_WROTE_WRAPPED, r"(?m)^[ \t]*On [^\n]*,[^\n]*\r?\n[^\n]*\bwrote:[ \t]*\r?$");

// "-----Original Message-----"
boundary!(RE_ORIGINAL, r"(?mi)^[ \t]*-{2,}[ \t]*original message[ \t]*-{2,}");

// Outlook separator rule.
boundary!(RE_UNDERSCORES, r"(?m)^[ \t]*_{10,}[ \t]*\r?$");

// Outlook header block: "From: …" immediately followed by "Sent:" or "Date:".
boundary!(RE_HEADER_BLOCK, r"(?mi)^From:[^\n]*\r?\n(?:Sent|Date):");

// "> quoted line"
boundary!(RE_QUOTE_LINE, r"(?m)^[ \t]*>");

fn markers() -> impl Iterator<Item = &'static Regex> {
  [
    &RE_WROTE,
    &RE_WROTE_WRAPPED,
    &RE_ORIGINAL,
    &RE_UNDERSCORES,
    &RE_HEADER_BLOCK,
    &RE_QUOTE_LINE,
  ]
  .into_iter()
  .filter_map(|re| re.as_ref())
}

/// Byte offset of the earliest reply-boundary marker, if any.
pub fn quote_boundary(text: &str) -> Option<usize> {
  markers()
    .filter_map(|re| re.find(text).map(|m| m.start()))
    .min()
}

/// The author's own text: everything before the first reply-boundary marker,
/// trimmed. Returns the whole text (trimmed) when there is no marker.
pub fn strip_quoted(text: &str) -> &str {
  match quote_boundary(text) {
    Some(at) => text[..at].trim(),
    None => text.trim(),
  }
}

/// Whether the line containing byte offset `at` is a quoted line.
pub fn is_quoted_line(text: &str, at: usize) -> bool {
  let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
  text[line_start..].trim_start().starts_with('>')
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_attribution_line_and_quote() {
    let body = "Yes, confirmed.\n\nOn Jan 1, Alice wrote:\n> Please confirm dates";
    assert_eq!(strip_quoted(body), "Yes, confirmed.");
  }

  #[test]
  fn strips_attribution_wrapped_over_two_lines() {
    let body = "Salary: 12 LPA\n\nOn Mon, Jan 1, 2024 at 10:00 AM Alice Smith <\nalice@vouch.example> wrote:\n> Salary: 10 LPA";
    assert_eq!(strip_quoted(body), "Salary: 12 LPA");
  }

  #[test]
  fn sentence_starting_with_on_is_kept() {
    let body = "On joining, she was a trainee.\nDesignation: Analyst";
    assert_eq!(strip_quoted(body), body);
  }

  #[test]
  fn strips_original_message_delimiter() {
    let body = "Salary: 12 LPA\r\n\r\n-----Original Message-----\r\nFrom: verifier";
    assert_eq!(strip_quoted(body), "Salary: 12 LPA");
  }

  #[test]
  fn strips_underscore_rule() {
    let body = "All good.\n________________________________\nFrom: Vouch";
    assert_eq!(strip_quoted(body), "All good.");
  }

  #[test]
  fn strips_outlook_header_block() {
    let body = "Confirmed.\n\nFrom: Vouch Verification\nSent: Monday\nSubject: x";
    assert_eq!(strip_quoted(body), "Confirmed.");
  }

  #[test]
  fn earliest_marker_wins() {
    let body = "Top.\n> quoted first\nOn Jan 1, Bob wrote:\nmore";
    assert_eq!(strip_quoted(body), "Top.");
  }

  #[test]
  fn no_marker_keeps_everything() {
    let body = "  Designation: Engineer\nSalary: 10 LPA  ";
    assert_eq!(strip_quoted(body), "Designation: Engineer\nSalary: 10 LPA");
  }

  #[test]
  fn wrote_must_end_the_line() {
    let body = "She wrote: great reviews every year.\nRating: 4";
    assert_eq!(strip_quoted(body), body);
  }

  #[test]
  fn quoted_line_detection() {
    let text = "a\n  > b: c\nd";
    assert!(is_quoted_line(text, text.find('b').unwrap()));
    assert!(!is_quoted_line(text, text.find('d').unwrap()));
  }
}
