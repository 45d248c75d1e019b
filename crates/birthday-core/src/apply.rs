//! Write-back of update proposals
//!
//! Each proposal is one partial update restricted to the `birthdays` field.
//! Updates are sent one at a time; a failure is recorded against its record
//! and the rest continue. Nothing already written is rolled back.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::model::BIRTHDAY_FIELD;
use crate::normalizer::UpdateProposal;
use crate::service::ContactService;
use crate::{Error, Result};

/// Whether proposals are committed or only reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    DryRun,
    Commit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The service accepted the update
    Committed,
    /// Dry run: the service was not contacted
    DryRun,
}

/// Write one proposal back through the update capability
///
/// # Errors
/// `IdentifierMismatch` before any call if the proposal's records disagree;
/// otherwise whatever the service returns.
pub fn apply<S>(service: &mut S, proposal: &UpdateProposal, mode: WriteMode) -> Result<ApplyOutcome>
where
    S: ContactService + ?Sized,
{
    let original = &proposal.original.resource_name;
    let candidate = &proposal.candidate.resource_name;
    if original != candidate {
        return Err(Error::IdentifierMismatch {
            original: original.clone(),
            candidate: candidate.clone(),
        });
    }

    match mode {
        WriteMode::DryRun => {
            info!(resource_name = %original, "no update, dry run");
            Ok(ApplyOutcome::DryRun)
        }
        WriteMode::Commit => {
            service.update_contact(original, BIRTHDAY_FIELD, &proposal.candidate)?;
            info!(resource_name = %original, "birthday updated");
            Ok(ApplyOutcome::Committed)
        }
    }
}

/// Per-record results of applying a batch, in proposal order
#[derive(Debug, Default)]
pub struct ApplySummary {
    pub results: Vec<(String, Result<ApplyOutcome>)>,
}

impl ApplySummary {
    pub fn committed(&self) -> usize {
        self.count(|r| matches!(r, Ok(ApplyOutcome::Committed)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, Ok(ApplyOutcome::DryRun)))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.results.iter().filter_map(|(name, r)| match r {
            Err(e) => Some((name.as_str(), e)),
            Ok(_) => None,
        })
    }

    fn count(&self, pred: impl Fn(&Result<ApplyOutcome>) -> bool) -> usize {
        self.results.iter().filter(|(_, r)| pred(r)).count()
    }
}

/// Apply every proposal in order, independently
pub fn apply_all<S>(service: &mut S, proposals: &[UpdateProposal], mode: WriteMode) -> ApplySummary
where
    S: ContactService + ?Sized,
{
    let mut summary = ApplySummary::default();
    for proposal in proposals {
        let result = apply(service, proposal, mode);
        if let Err(e) = &result {
            warn!(resource_name = %proposal.resource_name(), error = %e, "update failed");
        }
        summary
            .results
            .push((proposal.resource_name().to_string(), result));
    }
    info!(
        committed = summary.committed(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        "write-back finished"
    );
    summary
}

// ── Plan digest ───────────────────────────────────────────

#[derive(Serialize)]
struct DigestEntry<'a> {
    resource_name: &'a str,
    birthdays: &'a Option<Vec<crate::model::BirthdayEntry>>,
}

/// SHA-256 (lowercase hex) over what a commit would write
///
/// Covers each proposal's identifier and candidate birthdays, sorted by
/// identifier, so the same set of proposals always yields the same digest.
pub fn plan_digest(proposals: &[UpdateProposal]) -> Result<String> {
    let mut entries: Vec<DigestEntry<'_>> = proposals
        .iter()
        .map(|p| DigestEntry {
            resource_name: p.resource_name(),
            birthdays: &p.candidate.birthdays,
        })
        .collect();
    entries.sort_by(|a, b| a.resource_name.cmp(b.resource_name));

    let mut hasher = Sha256::new();
    for entry in &entries {
        // Struct field order is fixed and flattened maps are BTreeMaps.
        let line = serde_json::to_string(entry)?;
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fail with `DigestMismatch` unless `expected` matches the proposals
pub fn verify_digest(proposals: &[UpdateProposal], expected: &str) -> Result<()> {
    let actual = plan_digest(proposals)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(Error::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        })
    }
}
