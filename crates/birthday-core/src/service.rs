//! Contact service capability and the snapshot-backed implementation
//!
//! The normalizer never talks HTTP itself. It sees the contact service as
//! three calls (`list`, `get`, `update_contact`) behind [`ContactService`],
//! and credential acquisition as [`Authorizer`]. [`SnapshotService`] serves a
//! JSON export of the contact list with the same paging contract, which is
//! what the CLI and the tests run against.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ContactRecord, ListRequest, ListResponse, BIRTHDAY_FIELD};
use crate::{Error, Result};

/// The list/get/update capability of a contact service
pub trait ContactService {
    /// One page of connections, continuing from `request.page_token`
    fn list(&mut self, request: &ListRequest) -> Result<ListResponse>;

    /// A single contact, for manual review
    fn get(&mut self, resource_name: &str, person_fields: &str) -> Result<ContactRecord>;

    /// Partial update restricted to `update_person_fields`; returns the stored record
    fn update_contact(
        &mut self,
        resource_name: &str,
        update_person_fields: &str,
        body: &ContactRecord,
    ) -> Result<ContactRecord>;
}

impl<S: ContactService + ?Sized> ContactService for &mut S {
    fn list(&mut self, request: &ListRequest) -> Result<ListResponse> {
        (**self).list(request)
    }

    fn get(&mut self, resource_name: &str, person_fields: &str) -> Result<ContactRecord> {
        (**self).get(resource_name, person_fields)
    }

    fn update_contact(
        &mut self,
        resource_name: &str,
        update_person_fields: &str,
        body: &ContactRecord,
    ) -> Result<ContactRecord> {
        (**self).update_contact(resource_name, update_person_fields, body)
    }
}

/// Produces an authorized service session
///
/// Called on every `PageCursor::start`, so a restarted traversal always runs
/// on a freshly acquired session.
pub trait Authorizer {
    type Service: ContactService;

    fn authorize(&mut self) -> Result<Self::Service>;
}

// ── Snapshot service ──────────────────────────────────────

/// On-disk shape of a contact snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub connections: Vec<ContactRecord>,
}

/// Contact service backed by an in-memory list, optionally persisted to a file
///
/// Page tokens are decimal offsets into the list. Updates accept only the
/// `birthdays` mask and, when file-backed, rewrite the snapshot immediately
/// so each update stands on its own.
#[derive(Debug, Clone)]
pub struct SnapshotService {
    contacts: Vec<ContactRecord>,
    path: Option<PathBuf>,
}

impl SnapshotService {
    pub fn from_records(contacts: Vec<ContactRecord>) -> Self {
        Self {
            contacts,
            path: None,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        debug!(path = %path.display(), contacts = snapshot.connections.len(), "snapshot loaded");
        Ok(Self {
            contacts: snapshot.connections,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn contacts(&self) -> &[ContactRecord] {
        &self.contacts
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = Snapshot {
            connections: self.contacts.clone(),
        };
        let mut text = serde_json::to_string_pretty(&snapshot)?;
        text.push('\n');
        std::fs::write(path, text)?;
        Ok(())
    }

    fn position(&self, resource_name: &str) -> Result<usize> {
        self.contacts
            .iter()
            .position(|c| c.resource_name == resource_name)
            .ok_or_else(|| Error::Service(format!("contact not found: {}", resource_name)))
    }
}

impl ContactService for SnapshotService {
    fn list(&mut self, request: &ListRequest) -> Result<ListResponse> {
        if request.page_size == 0 {
            return Err(Error::Service("page size must be positive".to_string()));
        }
        let start = match &request.page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .ok()
                .filter(|offset| *offset > 0 && *offset < self.contacts.len())
                .ok_or_else(|| Error::Service(format!("invalid page token: {}", token)))?,
        };
        let end = (start + request.page_size as usize).min(self.contacts.len());
        let next_page_token = (end < self.contacts.len()).then(|| end.to_string());
        Ok(ListResponse {
            connections: self.contacts[start..end].to_vec(),
            next_page_token,
            total_people: Some(self.contacts.len() as u32),
        })
    }

    fn get(&mut self, resource_name: &str, _person_fields: &str) -> Result<ContactRecord> {
        let idx = self.position(resource_name)?;
        Ok(self.contacts[idx].clone())
    }

    fn update_contact(
        &mut self,
        resource_name: &str,
        update_person_fields: &str,
        body: &ContactRecord,
    ) -> Result<ContactRecord> {
        let idx = self.position(resource_name)?;
        if let Some(other) = update_person_fields
            .split(',')
            .map(str::trim)
            .find(|field| *field != BIRTHDAY_FIELD)
        {
            return Err(Error::Service(format!(
                "unsupported update field: {}",
                other
            )));
        }
        self.contacts[idx].birthdays = body.birthdays.clone();
        self.persist()?;
        debug!(resource_name, update_person_fields, "contact updated");
        Ok(self.contacts[idx].clone())
    }
}

/// Authorizes by (re)loading a snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotAuthorizer {
    path: PathBuf,
}

impl SnapshotAuthorizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Authorizer for SnapshotAuthorizer {
    type Service = SnapshotService;

    fn authorize(&mut self) -> Result<SnapshotService> {
        SnapshotService::open(&self.path)
    }
}
