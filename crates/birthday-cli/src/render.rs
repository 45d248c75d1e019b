//! Human and JSON rendering of plans and write-back results

use birthday_core::{
    ApplyOutcome, ApplySummary, BirthdayDate, BirthdayEntry, ContactRecord, Plan, UnresolvedEntry,
    UpdateProposal,
};
use colored::Colorize;
use serde_json::json;

fn format_date(date: &BirthdayDate) -> String {
    match date.known_year() {
        Some(year) => format!("{:04}-{:02}-{:02}", year, date.month, date.day),
        None => format!("--{:02}-{:02}", date.month, date.day),
    }
}

fn describe(record: &ContactRecord) -> String {
    let entries = record.birthdays.as_deref().unwrap_or_default();
    match entries {
        [entry] => describe_entry(entry),
        [] => "none".to_string(),
        many => format!("{} entries", many.len()),
    }
}

fn describe_entry(entry: &BirthdayEntry) -> String {
    match (&entry.date, &entry.text) {
        (Some(date), Some(text)) => format!("{} + text {:?}", format_date(date), text),
        (Some(date), None) => format_date(date),
        (None, Some(text)) => format!("text {:?}", text),
        (None, None) => "empty".to_string(),
    }
}

fn label(record: &ContactRecord) -> String {
    match record.display_name() {
        Some(name) => format!("{} ({})", record.resource_name, name),
        None => record.resource_name.clone(),
    }
}

pub fn print_proposal(proposal: &UpdateProposal) {
    println!("{} {}", "~".yellow().bold(), label(&proposal.original));
    println!("    before: {}", describe(&proposal.original));
    println!("    after:  {}", describe(&proposal.candidate).green());
    for change in &proposal.changes {
        println!("    - {}", change);
    }
}

pub fn print_unresolved(entry: &UnresolvedEntry) {
    let text = entry.text.as_deref().unwrap_or("<no text>");
    println!(
        "{} {}: {:?} ({})",
        "!".red().bold(),
        label(&entry.record),
        text,
        entry.reason
    );
}

pub fn print_plan(plan: &Plan) {
    for proposal in &plan.report.proposals {
        print_proposal(proposal);
    }
    if !plan.report.unresolved.is_empty() {
        println!();
        println!("{}", "Needs manual follow-up:".red().bold());
        for entry in &plan.report.unresolved {
            print_unresolved(entry);
        }
    }
    println!();
    println!(
        "{} contacts reviewed, {} with birthdays",
        plan.scanned, plan.with_birthday
    );
    println!(
        "{} to update, {} unchanged, {} unresolved",
        plan.report.proposals.len().to_string().bold(),
        plan.report.unchanged,
        plan.report.errors
    );
    println!("plan digest: {}", plan.digest.cyan());
}

pub fn plan_json(plan: &Plan) -> serde_json::Value {
    let proposals: Vec<_> = plan
        .report
        .proposals
        .iter()
        .map(|p| {
            json!({
                "resource_name": p.resource_name(),
                "before": p.original.birthdays,
                "after": p.candidate.birthdays,
                "changes": p.changes,
            })
        })
        .collect();
    let unresolved: Vec<_> = plan
        .report
        .unresolved
        .iter()
        .map(|u| {
            json!({
                "resource_name": u.resource_name(),
                "text": u.text,
                "reason": u.reason,
            })
        })
        .collect();
    json!({
        "summary": plan.summary(),
        "proposals": proposals,
        "unresolved": unresolved,
    })
}

pub fn print_summary(summary: &ApplySummary) {
    for (name, result) in &summary.results {
        match result {
            Ok(ApplyOutcome::Committed) => println!("{} {}", "✓".green(), name),
            Ok(ApplyOutcome::DryRun) => println!("{} {} (dry run)", "-".dimmed(), name),
            Err(e) => println!("{} {}: {}", "✗".red(), name, e),
        }
    }
    println!(
        "{} committed, {} skipped, {} failed",
        summary.committed(),
        summary.skipped(),
        summary.failed()
    );
}

pub fn summary_json(summary: &ApplySummary) -> serde_json::Value {
    let results: Vec<_> = summary
        .results
        .iter()
        .map(|(name, result)| match result {
            Ok(outcome) => json!({"resource_name": name, "outcome": outcome}),
            Err(e) => json!({"resource_name": name, "error": e.to_string()}),
        })
        .collect();
    json!({
        "committed": summary.committed(),
        "skipped": summary.skipped(),
        "failed": summary.failed(),
        "results": results,
    })
}
