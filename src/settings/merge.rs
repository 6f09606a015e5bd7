//! Settings document merge.
//!
//! Merge semantics, per integration key:
//! - key in both documents: shallow-extend, user fields win field-by-field
//! - key in one document: passes through verbatim
//!
//! Values below the integration level are opaque; the merge never recurses
//! into them.

use std::collections::btree_map::Entry;

use super::SettingsDoc;

/// Overlay the user document onto the project document.
pub fn merge(mut project: SettingsDoc, user: SettingsDoc) -> SettingsDoc {
    for (name, fields) in user {
        match project.entry(name) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().extend(fields);
            }
            Entry::Vacant(entry) => {
                entry.insert(fields);
            }
        }
    }
    project
}
