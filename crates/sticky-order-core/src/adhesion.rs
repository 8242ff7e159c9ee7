use std::collections::{BTreeMap, BTreeSet};

use crate::error::AdhesionError;
use crate::model::{ItemName, OrderedItem, Role};

/// Regroup an already sorted order so every adjacency-sticky item sits directly
/// behind its direct target, siblings ordered by ascending priority.
///
/// `order` holds indices into `items` and is left untouched; a fresh order is
/// returned. Followers of the start-of-sequence target lead the result.
///
/// # Errors
/// Returns [`AdhesionError`] when a target is missing from the plain partition,
/// either because it does not exist or because it is a follower itself.
pub(crate) fn resolve_adhesion<T>(
    items: &[OrderedItem<T>],
    order: &[usize],
) -> Result<Vec<usize>, AdhesionError> {
    let mut plain = Vec::with_capacity(order.len());
    let mut groups: BTreeMap<Option<&ItemName>, Vec<usize>> = BTreeMap::new();
    for &index in order {
        match items[index].role() {
            Role::Adjacent { target, .. } => groups.entry(target).or_default().push(index),
            Role::Plain | Role::Absolute { .. } => plain.push(index),
        }
    }

    for group in groups.values_mut() {
        group.sort_by_key(|&index| items[index].priority());
    }

    let placed = plain.iter().map(|&index| &items[index].name).collect::<BTreeSet<_>>();
    for (target, followers) in &groups {
        let Some(target) = target else {
            continue;
        };
        if placed.contains(target) {
            continue;
        }

        let followers = followers.iter().map(|&index| items[index].name.clone()).collect();
        let is_follower = items.iter().any(|item| &item.name == *target && item.is_follower());
        let err = if is_follower {
            AdhesionError::FollowerTarget { target: (*target).clone(), followers }
        } else {
            AdhesionError::MissingTarget { target: (*target).clone(), followers }
        };
        tracing::warn!(error = %err, "adhesion group cannot be placed");
        return Err(err);
    }

    tracing::debug!(plain = plain.len(), groups = groups.len(), "resolved adhesion groups");

    let mut output = Vec::with_capacity(order.len());
    if let Some(leading) = groups.remove(&None) {
        output.extend(leading);
    }
    for index in plain {
        output.push(index);
        if let Some(followers) = groups.remove(&Some(&items[index].name)) {
            output.extend(followers);
        }
    }
    Ok(output)
}
