//! Wire and domain types
//!
//! Records mirror the contact service's JSON shape (camelCase). Fields this
//! crate does not interpret are kept in flattened maps so that a candidate
//! record is a faithful deep copy of the original.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resource name of the authenticated user's own contact list
pub const SELF_RESOURCE: &str = "people/me";

/// Field mask used for every write-back
pub const BIRTHDAY_FIELD: &str = "birthdays";

/// A contact as returned by the list/get capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<PersonName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdays: Option<Vec<BirthdayEntry>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ContactRecord {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            etag: None,
            names: Vec::new(),
            birthdays: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_birthday(mut self, entry: BirthdayEntry) -> Self {
        self.birthdays.get_or_insert_with(Vec::new).push(entry);
        self
    }

    pub fn with_name(mut self, name: PersonName) -> Self {
        self.names.push(name);
        self
    }

    /// Number of birthday entries (zero when the field is absent)
    pub fn birthday_count(&self) -> usize {
        self.birthdays.as_ref().map_or(0, Vec::len)
    }

    /// Display name of the first name entry, if any
    pub fn display_name(&self) -> Option<&str> {
        self.names.first().and_then(|n| n.display_name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PersonName {
    pub fn display(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// True if any string field of this name (display, given, family, or
    /// any other, such as `middleName`) equals `query`
    pub fn matches(&self, query: &str) -> bool {
        let known = [&self.display_name, &self.given_name, &self.family_name]
            .into_iter()
            .flatten()
            .map(String::as_str);
        let other = self.extra.values().filter_map(serde_json::Value::as_str);
        known.chain(other).any(|value| value == query)
    }
}

/// One birthday entry: structured date, free text, or both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BirthdayEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<BirthdayDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BirthdayEntry {
    pub fn from_date(date: BirthdayDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Structured date as carried on the wire
///
/// The service encodes "no year" either by omitting `year` or by sending `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayDate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub day: u32,
}

impl BirthdayDate {
    pub fn new(year: Option<i32>, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Year with the wire's `0` sentinel folded into `None`
    pub fn known_year(&self) -> Option<i32> {
        self.year.filter(|y| *y != 0)
    }
}

/// A fully specified birthday; `year` is real or the unknown-year sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedBirthday {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<NormalizedBirthday> for BirthdayDate {
    fn from(n: NormalizedBirthday) -> Self {
        BirthdayDate::new(Some(n.year), n.month, n.day)
    }
}

/// Output of the text parser: month and day always, year only if written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: u32,
    pub day: u32,
}

impl PartialDate {
    pub fn new(year: Option<i32>, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }
}

// ── List capability ───────────────────────────────────────

/// Parameters of one list call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub resource_name: String,
    pub page_size: u32,
    pub person_fields: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ListRequest {
    pub fn new(page_size: u32, person_fields: impl Into<String>) -> Self {
        Self {
            resource_name: SELF_RESOURCE.to_string(),
            page_size,
            person_fields: person_fields.into(),
            page_token: None,
        }
    }
}

/// One page of the list capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub connections: Vec<ContactRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_people: Option<u32>,
}
