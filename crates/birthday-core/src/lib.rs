//! Birthday Core - normalization of contact birthdays
//!
//! Fetches a contact list page by page, decides for every birthday the
//! canonical structured date to write back, and applies the resulting
//! proposals one by one.
//!
//! # Architecture
//!
//! ```text
//! Authorizer → PageCursor → pages → filter_with_birthday
//!                                        ↓
//!                         normalize (TextDateParser) → Outcome
//!                                        ↓
//!                         Plan { proposals, unresolved, digest }
//!                                        ↓
//!                         apply (dry run | commit) → ContactService
//! ```
//!
//! # Guarantees
//!
//! - **Structured**: every proposal carries `{year, month, day}` and no text
//! - **One sentinel**: an unknown year is always `Config::default_year`
//! - **Recoverable**: unparseable text never aborts a run
//! - **Reviewable**: a commit only proceeds on the digest of a reviewed plan

pub mod apply;
pub mod config;
pub mod cursor;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod parser;
pub mod plan;
pub mod review;
pub mod service;

pub use apply::{apply, apply_all, plan_digest, verify_digest, ApplyOutcome, ApplySummary, WriteMode};
pub use config::{Config, ConfigOverrides, NormalizeOptions, DEFAULT_YEAR};
pub use cursor::{CursorState, PageCursor};
pub use error::{Error, ParseFailure, Result};
pub use model::*;
pub use normalizer::{
    collect_with_birthdays, filter_with_birthday, normalize, normalize_all, BirthdayScan, Change,
    NormalizationReport, Outcome, UnresolvedEntry, UpdateProposal,
};
pub use parser::{CalendarTextParser, TextDateParser};
pub use plan::{build_plan, Plan, PlanSummary};
pub use review::{find_by_name, review};
pub use service::{Authorizer, ContactService, Snapshot, SnapshotAuthorizer, SnapshotService};

/// Version of this library crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
