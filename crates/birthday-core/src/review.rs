//! Manual review helpers
//!
//! Used by an operator to cross-check a contact against other address books
//! before or after a write-back. Not part of the decision procedure.

use crate::model::ContactRecord;
use crate::service::ContactService;
use crate::Result;

/// Records whose first name entry has a string field equal to `name`
pub fn find_by_name<'a>(records: &'a [ContactRecord], name: &str) -> Vec<&'a ContactRecord> {
    records
        .iter()
        .filter(|r| r.names.first().is_some_and(|n| n.matches(name)))
        .collect()
}

/// Fetch the current server-side state of one contact
pub fn review<S>(service: &mut S, resource_name: &str, person_fields: &str) -> Result<ContactRecord>
where
    S: ContactService + ?Sized,
{
    service.get(resource_name, person_fields)
}
