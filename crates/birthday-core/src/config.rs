//! Run configuration
//!
//! Everything that used to be a module-level constant is a field here and is
//! threaded explicitly into the normalizer and write-back calls.

use std::path::Path;

use chrono::Datelike;
use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sentinel year meaning "year unknown"
pub const DEFAULT_YEAR: i32 = 1900;

/// Default page size for the list capability
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page the contact service accepts
pub const MAX_PAGE_SIZE: u32 = 1000;

pub const DEFAULT_PERSON_FIELDS: &str = "names,birthdays";

/// Prefix of environment variables read by [`Config::load_layered`]
pub const ENV_PREFIX: &str = "BIRTHDAY_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Year written when a birthday has no real year
    pub default_year: i32,
    /// `false` reports proposals only; `true` commits them
    pub do_update: bool,
    pub page_size: u32,
    pub person_fields: String,
    pub resource_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_year: DEFAULT_YEAR,
            do_update: false,
            page_size: DEFAULT_PAGE_SIZE,
            person_fields: DEFAULT_PERSON_FIELDS.to_string(),
            resource_name: crate::model::SELF_RESOURCE.to_string(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl Config {
    /// Layered loading: defaults → JSON file → `BIRTHDAY_*` env → overrides,
    /// then validation.
    ///
    /// Example: `BIRTHDAY_DO_UPDATE=true` sets `do_update`.
    pub fn load_layered(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            // figment skips missing files; an explicit path must exist.
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Json::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=9999).contains(&self.default_year) {
            return Err(Error::Config(format!(
                "default_year must be within 1..=9999, got {}",
                self.default_year
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::Config(format!(
                "page_size must be within 1..={}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if !self.person_fields.split(',').any(|f| f.trim() == "birthdays") {
            return Err(Error::Config(format!(
                "person_fields must include birthdays, got {:?}",
                self.person_fields
            )));
        }
        if self.resource_name.trim().is_empty() {
            return Err(Error::Config("resource_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn list_request(&self) -> crate::model::ListRequest {
        crate::model::ListRequest {
            resource_name: self.resource_name.clone(),
            page_size: self.page_size,
            person_fields: self.person_fields.clone(),
            page_token: None,
        }
    }

    pub fn write_mode(&self) -> crate::apply::WriteMode {
        if self.do_update {
            crate::apply::WriteMode::Commit
        } else {
            crate::apply::WriteMode::DryRun
        }
    }

    /// Normalization options for a run happening in `current_year`
    pub fn normalize_options(&self, current_year: i32) -> NormalizeOptions {
        NormalizeOptions {
            default_year: self.default_year,
            current_year,
        }
    }
}

/// Inputs of the decision procedure that are not part of the record
///
/// A stored year equal to `current_year` is read as "no year supplied":
/// some providers backfill a missing year with the current one. This is a
/// heuristic with a known blind spot, since a contact actually born in
/// `current_year` is rewritten to `default_year` as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub default_year: i32,
    pub current_year: i32,
}

impl NormalizeOptions {
    pub fn new(default_year: i32, current_year: i32) -> Self {
        Self {
            default_year,
            current_year,
        }
    }

    /// Options using today's local calendar year
    pub fn for_today(default_year: i32) -> Self {
        Self::new(default_year, chrono::Local::now().year())
    }

    /// Resolve a possibly missing year to a real year or the sentinel
    pub fn resolve_year(&self, year: Option<i32>) -> i32 {
        match year {
            Some(y) if y != 0 && y != self.current_year => y,
            _ => self.default_year,
        }
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::for_today(DEFAULT_YEAR)
    }
}
