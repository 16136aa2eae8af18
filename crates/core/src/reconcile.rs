//! One-shot merge of remote and local design lists.
//!
//! Both lists must already be normalized into [`Design`]. The merge keys on
//! the normalized id, so a design saved both locally and remotely appears
//! once. Deletions are not propagated: a design removed on one side but not
//! the other still shows up.

use std::collections::HashMap;

use crate::models::Design;

/// Merge remote and local designs into one list, newest first.
///
/// On an id collision the remote record wins. Ties on `created_at` are
/// broken by id so the output order is stable.
#[must_use]
pub fn reconcile(remote: Vec<Design>, local: Vec<Design>) -> Vec<Design> {
    let mut by_id: HashMap<String, Design> = HashMap::with_capacity(remote.len() + local.len());

    for design in local.into_iter().chain(remote) {
        by_id.insert(design.id.as_str().to_owned(), design);
    }

    let mut merged: Vec<Design> = by_id.into_values().collect();
    sort_newest_first(&mut merged);
    merged
}

/// Sort designs by creation time, most recent first.
pub fn sort_newest_first(designs: &mut [Design]) {
    designs.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
