//! Birthday normalizer: maps one contact's birthday to its canonical form
//!
//! Every birthday ends up as a structured `{year, month, day}` with no
//! residual text, and "year unknown" is always the configured default year.
//!
//! # Decision table
//!
//! Evaluated in order for the single birthday entry of a record:
//!
//! 1. Date present, year absent or equal to the current year
//!    → year becomes the default year (changed)
//! 2. Date present with a real year → date kept; changed only if text is dropped
//! 3. No usable date, text present → parse text
//!    - failure → `Unresolved`, processing continues
//!    - success → year resolved as in (1), fresh date, text dropped (changed)
//!
//! Text is removed whenever a structured date is present or produced.
//! A date missing its month or day is not usable and falls through to (3)
//! when text is present. Without text, such a date is `Unchanged` if it
//! carries a real year and `Unresolved` otherwise.
//!
//! # Guarantees
//!
//! - **Pure**: no I/O; the current year arrives through [`NormalizeOptions`]
//! - **Idempotent**: a normalized record yields `Outcome::Unchanged`

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::NormalizeOptions;
use crate::cursor::PageCursor;
use crate::model::{BirthdayDate, BirthdayEntry, ContactRecord, NormalizedBirthday};
use crate::parser::TextDateParser;
use crate::service::Authorizer;
use crate::{Error, Result};

// ── Outcome types ─────────────────────────────────────────

/// One change the normalizer made to a birthday entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// Missing or current-year year replaced by the default year
    DefaultYearApplied { previous: Option<i32>, year: i32 },
    /// Date built from the free-text field
    ParsedFromText { text: String },
    /// Residual free text removed
    TextRemoved { text: String },
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::DefaultYearApplied {
                previous: Some(prev),
                year,
            } => write!(f, "year {} replaced by {}", prev, year),
            Change::DefaultYearApplied {
                previous: None,
                year,
            } => write!(f, "missing year set to {}", year),
            Change::ParsedFromText { text } => write!(f, "date parsed from text {:?}", text),
            Change::TextRemoved { text } => write!(f, "text {:?} removed", text),
        }
    }
}

/// A record that needs a write-back: original and its replacement
///
/// Both records share `resource_name`; only `birthdays` differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateProposal {
    pub original: ContactRecord,
    pub candidate: ContactRecord,
    pub changes: Vec<Change>,
}

impl UpdateProposal {
    pub fn resource_name(&self) -> &str {
        &self.candidate.resource_name
    }

    /// The normalized date carried by the candidate
    pub fn normalized_date(&self) -> Option<BirthdayDate> {
        self.candidate
            .birthdays
            .as_ref()
            .and_then(|b| b.first())
            .and_then(|e| e.date)
    }
}

/// A record whose birthday text could not be interpreted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedEntry {
    pub record: ContactRecord,
    pub text: Option<String>,
    pub reason: String,
}

impl UnresolvedEntry {
    pub fn resource_name(&self) -> &str {
        &self.record.resource_name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Unchanged,
    Proposal(UpdateProposal),
    Unresolved(UnresolvedEntry),
}

// ── Filtering ─────────────────────────────────────────────

/// Records carrying a birthday, plus how many records were looked at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BirthdayScan {
    pub scanned: usize,
    pub with_birthday: Vec<ContactRecord>,
}

/// Keep only records with at least one birthday entry
pub fn filter_with_birthday<I>(records: I) -> BirthdayScan
where
    I: IntoIterator<Item = ContactRecord>,
{
    let mut scan = BirthdayScan::default();
    for record in records {
        scan.scanned += 1;
        if record.birthday_count() > 0 {
            scan.with_birthday.push(record);
        }
    }
    info!(
        scanned = scan.scanned,
        with_birthday = scan.with_birthday.len(),
        "contacts reviewed"
    );
    scan
}

/// Walk every page of `cursor` and filter the flattened connections
pub fn collect_with_birthdays<A: Authorizer>(cursor: &mut PageCursor<A>) -> Result<BirthdayScan> {
    let mut records = Vec::new();
    for page in cursor.pages()? {
        records.extend(page?.connections);
    }
    Ok(filter_with_birthday(records))
}

// ── Decision procedure ────────────────────────────────────

/// Exactly one birthday entry, or a typed contract violation
fn single_entry(record: &ContactRecord) -> Result<&BirthdayEntry> {
    match record.birthdays.as_deref() {
        Some([entry]) => Ok(entry),
        Some(entries) if entries.len() > 1 => Err(Error::UnsupportedMultiEntry {
            resource_name: record.resource_name.clone(),
            count: entries.len(),
        }),
        _ => Err(Error::MalformedEntry {
            resource_name: record.resource_name.clone(),
        }),
    }
}

fn is_usable(date: &BirthdayDate) -> bool {
    date.month != 0 && date.day != 0
}

/// Decide the canonical birthday for one record
///
/// # Errors
/// `UnsupportedMultiEntry` for more than one entry, `MalformedEntry` for an
/// entry with neither date nor text. Parse failures are not errors: they
/// come back as `Outcome::Unresolved`.
pub fn normalize(
    record: &ContactRecord,
    options: &NormalizeOptions,
    parser: &dyn TextDateParser,
) -> Result<Outcome> {
    let entry = single_entry(record)?;
    let text = entry.text.as_deref();
    let mut changes = Vec::new();

    let normalized = match entry.date.filter(is_usable) {
        Some(date) => {
            let year = options.resolve_year(date.known_year());
            if date.year != Some(year) {
                changes.push(Change::DefaultYearApplied {
                    previous: date.known_year(),
                    year,
                });
            }
            NormalizedBirthday {
                year,
                month: date.month,
                day: date.day,
            }
        }
        None => {
            let Some(text) = text else {
                let Some(date) = entry.date else {
                    return Err(Error::MalformedEntry {
                        resource_name: record.resource_name.clone(),
                    });
                };
                // A real year on its own (e.g. `{"year": 1980}`) is left as stored.
                if date
                    .known_year()
                    .is_some_and(|year| year != options.current_year)
                {
                    return Ok(Outcome::Unchanged);
                }
                warn!(resource_name = %record.resource_name, "birthday date lacks month or day");
                return Ok(Outcome::Unresolved(UnresolvedEntry {
                    record: record.clone(),
                    text: None,
                    reason: "date lacks month or day and no text to parse".to_string(),
                }));
            };
            let parsed = match parser.parse(text) {
                Ok(parsed) => parsed,
                Err(failure) => {
                    warn!(resource_name = %record.resource_name, %failure, "birthday text unresolved");
                    return Ok(Outcome::Unresolved(UnresolvedEntry {
                        record: record.clone(),
                        text: Some(text.to_string()),
                        reason: failure.reason,
                    }));
                }
            };
            debug!(resource_name = %record.resource_name, text, ?parsed, "parsed birthday text");
            changes.push(Change::ParsedFromText {
                text: text.to_string(),
            });
            NormalizedBirthday {
                year: options.resolve_year(parsed.year),
                month: parsed.month,
                day: parsed.day,
            }
        }
    };

    if let Some(text) = text {
        changes.push(Change::TextRemoved {
            text: text.to_string(),
        });
    }

    if changes.is_empty() {
        return Ok(Outcome::Unchanged);
    }

    let replacement = BirthdayEntry {
        date: Some(normalized.into()),
        text: None,
        extra: entry.extra.clone(),
    };
    let candidate = ContactRecord {
        birthdays: Some(vec![replacement]),
        ..record.clone()
    };
    debug!(resource_name = %record.resource_name, changes = changes.len(), "birthday update proposed");
    Ok(Outcome::Proposal(UpdateProposal {
        original: record.clone(),
        candidate,
        changes,
    }))
}

// ── Batch ─────────────────────────────────────────────────

/// Result of normalizing a batch of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationReport {
    /// Records requiring a write-back
    pub proposals: Vec<UpdateProposal>,
    /// Records left for manual follow-up
    pub unresolved: Vec<UnresolvedEntry>,
    pub unchanged: usize,
    /// Count of per-record failures, reported at the end of a run
    pub errors: usize,
}

/// Normalize every record; only structural violations abort the batch
pub fn normalize_all<'a, I>(
    records: I,
    options: &NormalizeOptions,
    parser: &dyn TextDateParser,
) -> Result<NormalizationReport>
where
    I: IntoIterator<Item = &'a ContactRecord>,
{
    let mut report = NormalizationReport::default();
    for record in records {
        match normalize(record, options, parser)? {
            Outcome::Unchanged => report.unchanged += 1,
            Outcome::Proposal(proposal) => report.proposals.push(proposal),
            Outcome::Unresolved(entry) => {
                report.errors += 1;
                report.unresolved.push(entry);
            }
        }
    }
    info!(
        proposals = report.proposals.len(),
        unchanged = report.unchanged,
        unresolved = report.errors,
        "normalization finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseFailure;
    use crate::model::PartialDate;
    use crate::parser::CalendarTextParser;

    const CURRENT: i32 = 2024;

    fn opts() -> NormalizeOptions {
        NormalizeOptions::new(1900, CURRENT)
    }

    fn failing(text: &str) -> std::result::Result<PartialDate, ParseFailure> {
        Err(ParseFailure::new(text, "unparseable"))
    }

    fn fixed(
        year: Option<i32>,
        month: u32,
        day: u32,
    ) -> impl Fn(&str) -> std::result::Result<PartialDate, ParseFailure> {
        move |_: &str| -> std::result::Result<PartialDate, ParseFailure> {
            Ok(PartialDate::new(year, month, day))
        }
    }

    fn dated(name: &str, year: Option<i32>, month: u32, day: u32) -> ContactRecord {
        ContactRecord::new(name).with_birthday(BirthdayEntry::from_date(BirthdayDate::new(year, month, day)))
    }

    fn texted(name: &str, text: &str) -> ContactRecord {
        ContactRecord::new(name).with_birthday(BirthdayEntry::from_text(text))
    }

    fn proposal(outcome: Outcome) -> UpdateProposal {
        match outcome {
            Outcome::Proposal(p) => p,
            other => panic!("expected proposal, got {:?}", other),
        }
    }

    // ── Rule 1: missing or current year ────────────────

    #[test]
    fn test_missing_year_gets_default() {
        let record = dated("p2", None, 7, 4);
        let p = proposal(normalize(&record, &opts(), &failing).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1900), 7, 4)));
        assert_eq!(
            p.changes,
            vec![Change::DefaultYearApplied {
                previous: None,
                year: 1900
            }]
        );
    }

    #[test]
    fn test_current_year_treated_as_missing() {
        let record = dated("p", Some(CURRENT), 12, 31);
        let p = proposal(normalize(&record, &opts(), &failing).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1900), 12, 31)));
    }

    #[test]
    fn test_year_zero_treated_as_missing() {
        let record = dated("p", Some(0), 1, 2);
        let p = proposal(normalize(&record, &opts(), &failing).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1900), 1, 2)));
    }

    #[test]
    fn test_missing_year_with_text_drops_text() {
        let record = ContactRecord::new("p")
            .with_birthday(BirthdayEntry::from_date(BirthdayDate::new(None, 5, 6)).with_text("May 6"));
        let p = proposal(normalize(&record, &opts(), &failing).unwrap());
        let entry = &p.candidate.birthdays.as_ref().unwrap()[0];
        assert!(entry.text.is_none());
        assert_eq!(p.changes.len(), 2);
    }

    // ── Rule 2: real year ──────────────────────────────

    #[test]
    fn test_real_year_without_text_is_unchanged() {
        for year in [1850, 1900, 1985, 2001, CURRENT - 1, CURRENT + 1] {
            let record = dated("p", Some(year), 3, 14);
            assert_eq!(normalize(&record, &opts(), &failing).unwrap(), Outcome::Unchanged);
        }
    }

    #[test]
    fn test_real_year_with_text_only_drops_text() {
        let record = ContactRecord::new("p")
            .with_birthday(BirthdayEntry::from_date(BirthdayDate::new(Some(1985), 3, 14)).with_text("Pi day"));
        let p = proposal(normalize(&record, &opts(), &failing).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1985), 3, 14)));
        assert_eq!(
            p.changes,
            vec![Change::TextRemoved {
                text: "Pi day".into()
            }]
        );
    }

    // ── Rule 3: text only ──────────────────────────────

    #[test]
    fn test_text_with_past_year() {
        let record = texted("p", "June 1 1990");
        let p = proposal(normalize(&record, &opts(), &fixed(Some(1990), 6, 1)).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1990), 6, 1)));
        let entry = &p.candidate.birthdays.as_ref().unwrap()[0];
        assert!(entry.text.is_none());
    }

    #[test]
    fn test_text_parsed_to_current_year_gets_default() {
        let record = texted("p1", "March 3");
        let p = proposal(normalize(&record, &opts(), &fixed(Some(CURRENT), 3, 3)).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1900), 3, 3)));
    }

    #[test]
    fn test_text_parsed_without_year_gets_default() {
        let record = texted("p", "Oct 9");
        let p = proposal(normalize(&record, &opts(), &CalendarTextParser::new()).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1900), 10, 9)));
        assert_eq!(p.changes.len(), 2);
    }

    #[test]
    fn test_parse_failure_is_unresolved() {
        let record = texted("p3", "not a date");
        match normalize(&record, &opts(), &failing).unwrap() {
            Outcome::Unresolved(entry) => {
                assert_eq!(entry.resource_name(), "p3");
                assert_eq!(entry.text.as_deref(), Some("not a date"));
            }
            other => panic!("expected unresolved, got {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_date_falls_back_to_text() {
        let record = ContactRecord::new("p")
            .with_birthday(BirthdayEntry::from_date(BirthdayDate::new(Some(1970), 0, 0)).with_text("Aug 8 1970"));
        let p = proposal(normalize(&record, &opts(), &CalendarTextParser::new()).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1970), 8, 8)));
    }

    #[test]
    fn test_incomplete_date_without_text_is_unresolved() {
        for year in [None, Some(0), Some(CURRENT)] {
            let record = dated("p", year, 0, 0);
            assert!(matches!(
                normalize(&record, &opts(), &failing).unwrap(),
                Outcome::Unresolved(_)
            ));
        }
    }

    #[test]
    fn test_year_only_date_unchanged() {
        let record: ContactRecord =
            serde_json::from_str(r#"{"resourceName":"p","birthdays":[{"date":{"year":1980}}]}"#).unwrap();
        assert_eq!(normalize(&record, &opts(), &failing).unwrap(), Outcome::Unchanged);

        let report = normalize_all([&record], &opts(), &failing).unwrap();
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.errors, 0);
        assert!(report.unresolved.is_empty());
    }

    // ── Contract violations ────────────────────────────

    #[test]
    fn test_multiple_entries_rejected() {
        let record = ContactRecord::new("p")
            .with_birthday(BirthdayEntry::from_text("Jan 1"))
            .with_birthday(BirthdayEntry::from_text("Jan 2"));
        let err = normalize(&record, &opts(), &failing).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMultiEntry { count: 2, .. }));
    }

    #[test]
    fn test_empty_entry_rejected() {
        let record = ContactRecord::new("p").with_birthday(BirthdayEntry::default());
        assert!(matches!(
            normalize(&record, &opts(), &failing),
            Err(Error::MalformedEntry { .. })
        ));
        let mut no_entries = ContactRecord::new("q");
        no_entries.birthdays = Some(vec![]);
        assert!(matches!(
            normalize(&no_entries, &opts(), &failing),
            Err(Error::MalformedEntry { .. })
        ));
    }

    // ── Shape of the candidate ─────────────────────────

    #[test]
    fn test_candidate_is_deep_copy_differing_only_in_birthdays() {
        let json = r#"{
            "resourceName": "people/c7",
            "etag": "abc",
            "names": [{"displayName": "Linus"}],
            "birthdays": [{"metadata": {"primary": true}, "text": "Dec 28"}],
            "phoneNumbers": [{"value": "555"}]
        }"#;
        let record: ContactRecord = serde_json::from_str(json).unwrap();
        let p = proposal(normalize(&record, &opts(), &CalendarTextParser::new()).unwrap());

        assert_eq!(p.original, record);
        assert_eq!(p.candidate.resource_name, record.resource_name);
        assert_eq!(p.candidate.etag, record.etag);
        assert_eq!(p.candidate.names, record.names);
        assert_eq!(p.candidate.extra, record.extra);
        let entry = &p.candidate.birthdays.as_ref().unwrap()[0];
        assert_eq!(entry.extra["metadata"]["primary"], true);
    }

    #[test]
    fn test_idempotent_on_normalized_record() {
        let record = texted("p", "March 3");
        let p = proposal(normalize(&record, &opts(), &fixed(Some(CURRENT), 3, 3)).unwrap());
        assert_eq!(
            normalize(&p.candidate, &opts(), &failing).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn test_custom_default_year() {
        let record = dated("p", None, 2, 29);
        let options = NormalizeOptions::new(1604, CURRENT);
        let p = proposal(normalize(&record, &options, &failing).unwrap());
        assert_eq!(p.normalized_date(), Some(BirthdayDate::new(Some(1604), 2, 29)));
    }

    // ── Batch ──────────────────────────────────────────

    #[test]
    fn test_filter_with_birthday_counts_scanned() {
        let mut empty = ContactRecord::new("empty");
        empty.birthdays = Some(vec![]);
        let records = vec![
            ContactRecord::new("none"),
            dated("a", Some(1980), 1, 1),
            empty,
            texted("b", "Jan 1"),
        ];
        let scan = filter_with_birthday(records);
        assert_eq!(scan.scanned, 4);
        let names: Vec<_> = scan.with_birthday.iter().map(|r| r.resource_name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_batch_counts_unresolved() {
        let records = vec![
            texted("bad1", "??"),
            dated("ok", Some(1970), 1, 1),
            texted("bad2", "someday"),
            dated("fix", None, 1, 1),
            texted("bad3", "n/a"),
        ];
        let report = normalize_all(&records, &opts(), &failing).unwrap();
        assert_eq!(report.unresolved.len(), 3);
        assert_eq!(report.errors, 3);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.proposals.len(), 1);
        assert_eq!(report.proposals[0].resource_name(), "fix");
    }

    #[test]
    fn test_batch_aborts_on_multi_entry() {
        let multi = ContactRecord::new("multi")
            .with_birthday(BirthdayEntry::from_text("a"))
            .with_birthday(BirthdayEntry::from_text("b"));
        let records = vec![dated("fix", None, 1, 1), multi];
        assert!(normalize_all(&records, &opts(), &failing).is_err());
    }

    // ── End to end ─────────────────────────────────────

    #[test]
    fn test_end_to_end_text_in_current_year() {
        let record: ContactRecord =
            serde_json::from_str(r#"{"resourceName":"p1","birthdays":[{"text":"March 3"}]}"#).unwrap();
        let p = proposal(normalize(&record, &opts(), &fixed(Some(2024), 3, 3)).unwrap());
        assert_eq!(
            serde_json::to_value(&p.candidate).unwrap(),
            serde_json::json!({"resourceName":"p1","birthdays":[{"date":{"year":1900,"month":3,"day":3}}]})
        );
    }

    #[test]
    fn test_end_to_end_missing_year() {
        let record: ContactRecord =
            serde_json::from_str(r#"{"resourceName":"p2","birthdays":[{"date":{"month":7,"day":4}}]}"#).unwrap();
        let p = proposal(normalize(&record, &opts(), &failing).unwrap());
        assert_eq!(
            serde_json::to_value(&p.candidate).unwrap(),
            serde_json::json!({"resourceName":"p2","birthdays":[{"date":{"year":1900,"month":7,"day":4}}]})
        );
    }

    #[test]
    fn test_end_to_end_unparseable() {
        let record: ContactRecord =
            serde_json::from_str(r#"{"resourceName":"p3","birthdays":[{"text":"not a date"}]}"#).unwrap();
        let report = normalize_all([&record], &opts(), &failing).unwrap();
        assert!(report.proposals.is_empty());
        assert_eq!(report.errors, 1);
        assert_eq!(report.unresolved[0].resource_name(), "p3");
    }
}
