use std::cmp::Ordering;

use crate::error::ResolveError;
use crate::model::{OrderedItem, Role};
use crate::resolve::TargetResolver;

/// Baseline ordering by `order_key`.
#[must_use]
pub fn natural<T>(lhs: &OrderedItem<T>, rhs: &OrderedItem<T>) -> Ordering {
    lhs.order_key.cmp(&rhs.order_key)
}

/// Compare an absolute slot against another item's key, letting the absolute item
/// win an exact tie by comparing against the slot just after the other item.
#[must_use]
pub fn compare_asymmetric(absolute_position: i64, other_key: i64) -> Ordering {
    match absolute_position.cmp(&other_key) {
        Ordering::Equal => absolute_position.cmp(&other_key.saturating_add(1)),
        ordering => ordering,
    }
}

#[must_use]
pub fn sticky_tie_breakers() -> Vec<String> {
    vec![
        "absolute_position asc".to_string(),
        "absolute wins exact slot ties".to_string(),
        "anchor order_key asc".to_string(),
        "follower after its anchor".to_string(),
        "priority asc".to_string(),
        "hops asc".to_string(),
        "input order (stable)".to_string(),
    ]
}

/// Comparator over indices into the resolver's item slice.
#[derive(Debug)]
pub struct StickyComparator<'r, 'a, T> {
    resolver: &'r TargetResolver<'a, T>,
    stickiness: bool,
    recursive: bool,
}

impl<'r, 'a, T> StickyComparator<'r, 'a, T> {
    #[must_use]
    pub fn new(resolver: &'r TargetResolver<'a, T>, stickiness: bool, recursive: bool) -> Self {
        Self { resolver, stickiness, recursive }
    }

    /// Compare the items at `lhs` and `rhs`.
    ///
    /// # Errors
    /// Returns [`ResolveError`] when a target cannot be resolved while comparing or
    /// an index is out of range.
    pub fn compare(&self, lhs: usize, rhs: usize) -> Result<Ordering, ResolveError> {
        let (left, right) = (self.resolver.item(lhs)?, self.resolver.item(rhs)?);
        if !self.stickiness {
            return Ok(natural(left, right));
        }

        match (left.role(), right.role()) {
            (
                Role::Absolute { position: left_position, priority: left_priority },
                Role::Absolute { position: right_position, priority: right_priority },
            ) => Ok(left_position.cmp(&right_position).then(left_priority.cmp(&right_priority))),
            (Role::Absolute { position, .. }, _) => self.absolute_against(position, rhs),
            (_, Role::Absolute { position, .. }) => {
                self.absolute_against(position, lhs).map(Ordering::reverse)
            }
            (
                Role::Adjacent { priority: left_priority, .. },
                Role::Adjacent { priority: right_priority, .. },
            ) => {
                let left_resolution = self.resolver.resolve(lhs, self.recursive)?;
                let right_resolution = self.resolver.resolve(rhs, self.recursive)?;
                let left_key = self.resolver.anchor_key(left_resolution.anchor)?;
                let right_key = self.resolver.anchor_key(right_resolution.anchor)?;
                Ok(left_key
                    .cmp(&right_key)
                    .then(left_priority.cmp(&right_priority))
                    .then(left_resolution.hops.cmp(&right_resolution.hops)))
            }
            (Role::Adjacent { .. }, Role::Plain) => self.follower_against(lhs, rhs),
            (Role::Plain, Role::Adjacent { .. }) => {
                self.follower_against(rhs, lhs).map(Ordering::reverse)
            }
            (Role::Plain, Role::Plain) => Ok(natural(left, right)),
        }
    }

    /// The key the non-absolute side competes with: its own key when plain, its
    /// anchor's key when adjacency-sticky. The anchor key is substituted directly
    /// instead of re-entering the comparator.
    fn effective_key(&self, index: usize) -> Result<i64, ResolveError> {
        let resolution = self.resolver.resolve(index, self.recursive)?;
        self.resolver.anchor_key(resolution.anchor)
    }

    fn absolute_against(&self, position: i64, other: usize) -> Result<Ordering, ResolveError> {
        Ok(compare_asymmetric(position, self.effective_key(other)?))
    }

    fn follower_against(&self, follower: usize, plain: usize) -> Result<Ordering, ResolveError> {
        let anchor_key = self.effective_key(follower)?;
        let plain_key = self.resolver.item(plain)?.order_key;
        Ok(match anchor_key.cmp(&plain_key) {
            Ordering::Equal => Ordering::Greater,
            ordering => ordering,
        })
    }
}

/// Stable top-down merge sort driven by a fallible comparator. The comparator
/// need not be transitive.
///
/// # Errors
/// Returns the first error produced by `compare`.
pub fn try_stable_sort<K, E>(
    keys: &[K],
    compare: &mut impl FnMut(K, K) -> Result<Ordering, E>,
) -> Result<Vec<K>, E>
where
    K: Copy,
{
    if keys.len() <= 1 {
        return Ok(keys.to_vec());
    }

    let (left, right) = keys.split_at(keys.len() / 2);
    let left = try_stable_sort(left, compare)?;
    let right = try_stable_sort(right, compare)?;

    let mut merged = Vec::with_capacity(keys.len());
    let (mut l, mut r) = (0, 0);
    while l < left.len() && r < right.len() {
        if compare(right[r], left[l])? == Ordering::Less {
            merged.push(right[r]);
            r += 1;
        } else {
            merged.push(left[l]);
            l += 1;
        }
    }
    merged.extend_from_slice(&left[l..]);
    merged.extend_from_slice(&right[r..]);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StickyDescriptor;

    fn compare_all(items: &[OrderedItem<()>], stickiness: bool, recursive: bool) -> Vec<String> {
        let resolver =
            TargetResolver::new(items).unwrap_or_else(|err| panic!("resolver should build: {err}"));
        let comparator = StickyComparator::new(&resolver, stickiness, recursive);
        let indices = (0..items.len()).collect::<Vec<_>>();
        let sorted = try_stable_sort(&indices, &mut |lhs, rhs| comparator.compare(lhs, rhs))
            .unwrap_or_else(|err| panic!("sort should succeed: {err}"));
        sorted.into_iter().map(|index| items[index].name.to_string()).collect()
    }

    #[test]
    fn asymmetric_rule_lets_absolute_win_exact_ties() {
        assert_eq!(compare_asymmetric(2, 2), Ordering::Less);
        assert_eq!(compare_asymmetric(1, 2), Ordering::Less);
        assert_eq!(compare_asymmetric(3, 2), Ordering::Greater);
    }

    #[test]
    fn absolute_items_order_by_position_then_priority() {
        let items = vec![
            OrderedItem::new("y", (), 0).with_sticky(StickyDescriptor::absolute(0, 1)),
            OrderedItem::new("z", (), 1).with_sticky(StickyDescriptor::absolute(1, 0)),
            OrderedItem::new("x", (), 2).with_sticky(StickyDescriptor::absolute(0, 0)),
        ];
        assert_eq!(compare_all(&items, true, false), vec!["x", "y", "z"]);
    }

    #[test]
    fn absolute_item_claims_its_slot_among_plain_items() {
        let items = vec![
            OrderedItem::new("a", (), 0),
            OrderedItem::new("b", (), 1),
            OrderedItem::new("c", (), 2),
            OrderedItem::new("pin", (), 3).with_sticky(StickyDescriptor::absolute(1, 0)),
        ];
        assert_eq!(compare_all(&items, true, false), vec!["a", "pin", "b", "c"]);
    }

    #[test]
    fn followers_sort_behind_their_anchor_by_priority() {
        let items = vec![
            OrderedItem::new("d", (), 0).with_sticky(StickyDescriptor::adjacent_to("b", 1)),
            OrderedItem::new("a", (), 1),
            OrderedItem::new("c", (), 2).with_sticky(StickyDescriptor::adjacent_to("b", 0)),
            OrderedItem::new("b", (), 3),
        ];
        assert_eq!(compare_all(&items, true, false), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn hops_break_ties_among_recursive_followers() {
        let items = vec![
            OrderedItem::new("a", (), 0),
            OrderedItem::new("far", (), 1).with_sticky(StickyDescriptor::adjacent_to("near", 0)),
            OrderedItem::new("near", (), 2).with_sticky(StickyDescriptor::adjacent_to("a", 0)),
        ];
        assert_eq!(compare_all(&items, true, true), vec!["a", "near", "far"]);
    }

    #[test]
    fn disabled_stickiness_falls_back_to_natural_order() {
        let items = vec![
            OrderedItem::new("b", (), 1).with_sticky(StickyDescriptor::absolute(0, 0)),
            OrderedItem::new("a", (), 0),
            OrderedItem::new("c", (), 2).with_sticky(StickyDescriptor::at_start(0)),
        ];
        assert_eq!(compare_all(&items, false, false), vec!["a", "b", "c"]);
    }

    #[test]
    fn swapped_arguments_negate_the_result() {
        let items = vec![
            OrderedItem::new("a", (), 0),
            OrderedItem::new("pin", (), 5).with_sticky(StickyDescriptor::absolute(0, 0)),
            OrderedItem::new("f", (), 7).with_sticky(StickyDescriptor::adjacent_to("a", 0)),
        ];
        let resolver =
            TargetResolver::new(&items).unwrap_or_else(|err| panic!("resolver should build: {err}"));
        let comparator = StickyComparator::new(&resolver, true, false);
        for lhs in 0..items.len() {
            for rhs in 0..items.len() {
                let forward = comparator.compare(lhs, rhs);
                let backward = comparator.compare(rhs, lhs);
                if lhs == rhs {
                    continue;
                }
                assert_eq!(forward.map(Ordering::reverse), backward, "pair ({lhs}, {rhs})");
            }
        }
    }

    #[test]
    fn absolute_item_wins_a_tie_with_a_followers_anchor() {
        let items = vec![
            OrderedItem::new("a", (), 0),
            OrderedItem::new("f", (), 5).with_sticky(StickyDescriptor::adjacent_to("a", 0)),
            OrderedItem::new("pin", (), 9).with_sticky(StickyDescriptor::absolute(0, 0)),
        ];
        let resolver =
            TargetResolver::new(&items).unwrap_or_else(|err| panic!("resolver should build: {err}"));
        let comparator = StickyComparator::new(&resolver, true, false);
        assert_eq!(comparator.compare(2, 1), Ok(Ordering::Less));
        assert_eq!(comparator.compare(1, 2), Ok(Ordering::Greater));
    }

    #[test]
    fn chained_follower_competes_with_direct_target_unless_recursive() {
        let items = vec![
            OrderedItem::new("a", (), 0),
            OrderedItem::new("b", (), 1).with_sticky(StickyDescriptor::adjacent_to("a", 0)),
            OrderedItem::new("c", (), 2).with_sticky(StickyDescriptor::adjacent_to("b", 0)),
            OrderedItem::new("pin", (), 3).with_sticky(StickyDescriptor::absolute(1, 0)),
        ];
        let resolver =
            TargetResolver::new(&items).unwrap_or_else(|err| panic!("resolver should build: {err}"));

        let direct = StickyComparator::new(&resolver, true, false);
        assert_eq!(direct.compare(3, 2), Ok(Ordering::Less));

        let recursive = StickyComparator::new(&resolver, true, true);
        assert_eq!(recursive.compare(3, 2), Ok(Ordering::Greater));
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let items = vec![OrderedItem::new("a", (), 0)];
        let resolver =
            TargetResolver::new(&items).unwrap_or_else(|err| panic!("resolver should build: {err}"));
        let comparator = StickyComparator::new(&resolver, true, false);
        assert_eq!(
            comparator.compare(0, 4),
            Err(ResolveError::IndexOutOfRange { index: 4, len: 1 })
        );
    }

    #[test]
    fn comparator_surfaces_resolution_errors() {
        let items = vec![
            OrderedItem::new("a", (), 0).with_sticky(StickyDescriptor::adjacent_to("b", 0)),
            OrderedItem::new("b", (), 1).with_sticky(StickyDescriptor::adjacent_to("a", 0)),
        ];
        let resolver =
            TargetResolver::new(&items).unwrap_or_else(|err| panic!("resolver should build: {err}"));
        let comparator = StickyComparator::new(&resolver, true, true);
        assert!(matches!(comparator.compare(0, 1), Err(ResolveError::Cycle { .. })));
    }

    #[test]
    fn merge_sort_is_stable() {
        let keys = [(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        let mut by_first = |lhs: (i32, char), rhs: (i32, char)| -> Result<Ordering, ()> {
            Ok(lhs.0.cmp(&rhs.0))
        };
        let sorted = try_stable_sort(&keys, &mut by_first).unwrap_or_else(|()| unreachable!());
        assert_eq!(sorted, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }
}
