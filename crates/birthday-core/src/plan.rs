//! Plan: one full dry pass over the contact list
//!
//! A plan is what the operator reviews before committing: every proposal,
//! every unresolved record, and a digest that a later committing run must
//! reproduce exactly.

use serde::Serialize;
use tracing::info;

use crate::apply::plan_digest;
use crate::config::NormalizeOptions;
use crate::cursor::PageCursor;
use crate::normalizer::{collect_with_birthdays, normalize_all, NormalizationReport};
use crate::parser::TextDateParser;
use crate::service::Authorizer;
use crate::Result;

#[derive(Debug, Clone)]
pub struct Plan {
    /// Records looked at across all pages
    pub scanned: usize,
    /// Records carrying a birthday
    pub with_birthday: usize,
    pub report: NormalizationReport,
    pub digest: String,
}

/// Counters of a plan, for JSON output and logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub scanned: usize,
    pub with_birthday: usize,
    pub proposals: usize,
    pub unchanged: usize,
    pub unresolved: usize,
    pub digest: String,
}

impl Plan {
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            scanned: self.scanned,
            with_birthday: self.with_birthday,
            proposals: self.report.proposals.len(),
            unchanged: self.report.unchanged,
            unresolved: self.report.errors,
            digest: self.digest.clone(),
        }
    }
}

/// Fetch every page, normalize every birthday, and fingerprint the result
pub fn build_plan<A: Authorizer>(
    cursor: &mut PageCursor<A>,
    options: &NormalizeOptions,
    parser: &dyn TextDateParser,
) -> Result<Plan> {
    let scan = collect_with_birthdays(cursor)?;
    let report = normalize_all(&scan.with_birthday, options, parser)?;
    let digest = plan_digest(&report.proposals)?;
    info!(
        scanned = scan.scanned,
        proposals = report.proposals.len(),
        digest = %digest,
        "plan built"
    );
    Ok(Plan {
        scanned: scan.scanned,
        with_birthday: scan.with_birthday.len(),
        report,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{apply_all, WriteMode};
    use crate::model::{BirthdayDate, BirthdayEntry, ContactRecord, ListRequest};
    use crate::parser::CalendarTextParser;
    use crate::service::{ContactService, SnapshotService};
    use crate::Error;

    struct MemoryAuthorizer(Vec<ContactRecord>);

    impl Authorizer for MemoryAuthorizer {
        type Service = SnapshotService;

        fn authorize(&mut self) -> Result<SnapshotService> {
            Ok(SnapshotService::from_records(self.0.clone()))
        }
    }

    fn contacts() -> Vec<ContactRecord> {
        vec![
            ContactRecord::new("people/1").with_birthday(BirthdayEntry::from_text("March 3")),
            ContactRecord::new("people/2")
                .with_birthday(BirthdayEntry::from_date(BirthdayDate::new(None, 7, 4))),
            ContactRecord::new("people/3").with_birthday(BirthdayEntry::from_text("not a date")),
            ContactRecord::new("people/4")
                .with_birthday(BirthdayEntry::from_date(BirthdayDate::new(Some(1984), 1, 24))),
            ContactRecord::new("people/5"),
        ]
    }

    fn cursor() -> PageCursor<MemoryAuthorizer> {
        PageCursor::new(MemoryAuthorizer(contacts()), ListRequest::new(2, "names,birthdays"))
    }

    #[test]
    fn test_plan_over_three_pages() {
        let options = NormalizeOptions::new(1900, 2024);
        let mut cursor = cursor();
        let plan = build_plan(&mut cursor, &options, &CalendarTextParser::new()).unwrap();
        assert_eq!(cursor.pages_fetched(), 3);

        let summary = plan.summary();
        assert_eq!(summary.scanned, 5);
        assert_eq!(summary.with_birthday, 4);
        assert_eq!(summary.proposals, 2);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.unresolved, 1);
    }

    #[test]
    fn test_plan_is_reproducible() {
        let options = NormalizeOptions::new(1900, 2024);
        let parser = CalendarTextParser::new();
        let first = build_plan(&mut cursor(), &options, &parser).unwrap();
        let second = build_plan(&mut cursor(), &options, &parser).unwrap();
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_commit_through_cursor_session() {
        let options = NormalizeOptions::new(1900, 2024);
        let mut cursor = cursor();
        let plan = build_plan(&mut cursor, &options, &CalendarTextParser::new()).unwrap();
        let service = cursor.service_mut().unwrap();
        let summary = apply_all(service, &plan.report.proposals, WriteMode::Commit);
        assert_eq!(summary.committed(), 2);

        let stored = service.get("people/1", "birthdays").unwrap();
        let birthdays = stored.birthdays.unwrap();
        let entry = &birthdays[0];
        assert_eq!(entry.date, Some(BirthdayDate::new(Some(1900), 3, 3)));
        assert!(entry.text.is_none());
    }

    #[test]
    fn test_plan_aborts_on_multi_entry() {
        let mut records = contacts();
        records.push(
            ContactRecord::new("people/6")
                .with_birthday(BirthdayEntry::from_text("a"))
                .with_birthday(BirthdayEntry::from_text("b")),
        );
        let mut cursor = PageCursor::new(MemoryAuthorizer(records), ListRequest::new(50, "birthdays"));
        let err = build_plan(&mut cursor, &NormalizeOptions::new(1900, 2024), &CalendarTextParser::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMultiEntry { .. }));
    }
}
