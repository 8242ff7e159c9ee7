use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adhesion::resolve_adhesion;
use crate::compare::{try_stable_sort, StickyComparator};
use crate::error::{ConfigError, OrderError, ResolveError};
use crate::model::{ItemName, OrderedItem, Placement, StickyDescriptor};
use crate::resolve::TargetResolver;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct SortOptions {
    /// Honor sticky descriptors; when off, the sort is by `order_key` only.
    pub stickiness: bool,
    /// Walk adjacency chains to their final anchor instead of one lookup.
    pub recursive_targets: bool,
    /// Physically regroup followers behind their direct target after sorting.
    pub adhesion: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self { stickiness: true, recursive_targets: false, adhesion: true }
    }
}

impl SortOptions {
    #[must_use]
    pub fn natural() -> Self {
        Self { stickiness: false, recursive_targets: false, adhesion: false }
    }
}

/// Assign dense order keys matching the current physical order.
pub fn reindex<T>(sequence: &mut [OrderedItem<T>]) {
    for (key, item) in (0_i64..).zip(sequence.iter_mut()) {
        item.order_key = key;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderedCollection<T> {
    items: Vec<OrderedItem<T>>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> OrderedCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item; order keys are not required to be unique.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for blank or duplicate names.
    pub fn add(
        &mut self,
        name: impl Into<ItemName>,
        value: T,
        order_key: i64,
    ) -> Result<(), ConfigError> {
        self.push(OrderedItem::new(name, value, order_key))
    }

    /// Append an item carrying a placement preference.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for blank or duplicate names.
    pub fn add_sticky(
        &mut self,
        name: impl Into<ItemName>,
        value: T,
        order_key: i64,
        descriptor: StickyDescriptor,
    ) -> Result<(), ConfigError> {
        self.push(OrderedItem::new(name, value, order_key).with_sticky(descriptor))
    }

    /// # Errors
    /// Returns [`ConfigError`] for blank or duplicate names.
    pub fn push(&mut self, item: OrderedItem<T>) -> Result<(), ConfigError> {
        if item.name.is_blank() {
            return Err(ConfigError::BlankName);
        }
        if self.get(item.name.as_str()).is_some() {
            return Err(ConfigError::DuplicateName(item.name));
        }
        self.items.push(item);
        Ok(())
    }

    #[must_use]
    pub fn items(&self) -> &[OrderedItem<T>] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<OrderedItem<T>> {
        self.items
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OrderedItem<T>> {
        self.items.iter().find(|item| item.name.as_str() == name)
    }

    /// Check every active descriptor against the collection before ordering.
    ///
    /// With stickiness disabled only the name index is checked, because descriptors
    /// do not take part in the order.
    ///
    /// # Errors
    /// Returns [`OrderError`] for duplicate names, invalid descriptors, absolute
    /// collisions, dangling or self targets, and cycles when `recursive_targets` is on.
    pub fn validate(&self, options: &SortOptions) -> Result<(), OrderError> {
        let resolver = TargetResolver::new(&self.items)?;
        if !options.stickiness {
            return Ok(());
        }

        let mut claimed: BTreeMap<(i64, i32), &ItemName> = BTreeMap::new();
        for (index, item) in self.items.iter().enumerate() {
            let Some(descriptor) = item.active_sticky() else {
                continue;
            };
            descriptor.validate(&item.name)?;

            match &descriptor.placement {
                Placement::Absolute { position } => {
                    let slot = (*position, descriptor.priority);
                    if let Some(first) = claimed.insert(slot, &item.name) {
                        return Err(ConfigError::AbsoluteCollision {
                            first: first.clone(),
                            second: item.name.clone(),
                            position: *position,
                            priority: descriptor.priority,
                        }
                        .into());
                    }
                }
                Placement::Adjacent { target: Some(target) } => {
                    let Some(target_index) = resolver.lookup(target.as_str()) else {
                        return Err(ResolveError::Dangling {
                            item: item.name.clone(),
                            target: target.clone(),
                        }
                        .into());
                    };
                    if target_index == index {
                        return Err(ResolveError::Cycle {
                            chain: vec![item.name.clone(), item.name.clone()],
                        }
                        .into());
                    }
                    if options.recursive_targets {
                        resolver.resolve(index, true)?;
                    }
                }
                Placement::Adjacent { target: None } => {}
            }
        }
        Ok(())
    }

    /// Sort, optionally regroup followers, then reindex.
    ///
    /// On error the collection is left exactly as it was.
    ///
    /// # Errors
    /// Returns [`OrderError`] from validation, target resolution, or adhesion.
    pub fn sort(&mut self, options: &SortOptions) -> Result<(), OrderError> {
        if let Err(err) = self.validate(options) {
            tracing::warn!(error = %err, "rejected ordering configuration");
            return Err(err);
        }

        let order = {
            let resolver = TargetResolver::new(&self.items)?;
            let comparator =
                StickyComparator::new(&resolver, options.stickiness, options.recursive_targets);
            let indices = (0..self.items.len()).collect::<Vec<_>>();
            let sorted = try_stable_sort(&indices, &mut |lhs, rhs| comparator.compare(lhs, rhs))?;
            if options.stickiness && options.adhesion {
                resolve_adhesion(&self.items, &sorted)?
            } else {
                sorted
            }
        };

        self.apply_order(&order);
        self.reindex();
        tracing::debug!(
            items = self.items.len(),
            stickiness = options.stickiness,
            recursive_targets = options.recursive_targets,
            adhesion = options.adhesion,
            "sorted collection"
        );
        Ok(())
    }

    /// Run only the adhesion pass over the current physical order, then reindex.
    ///
    /// # Errors
    /// Returns [`OrderError`] when a follower group cannot be placed.
    pub fn apply_adhesion(&mut self) -> Result<(), OrderError> {
        TargetResolver::new(&self.items)?;
        let current = (0..self.items.len()).collect::<Vec<_>>();
        let order = resolve_adhesion(&self.items, &current)?;
        self.apply_order(&order);
        self.reindex();
        Ok(())
    }

    pub fn reindex(&mut self) {
        reindex(&mut self.items);
    }

    /// Convert every item into an adjacency-sticky item pointing at its predecessor.
    /// The first item sticks to the start of the sequence.
    pub fn chain_to_predecessors(&mut self) {
        let mut previous: Option<ItemName> = None;
        for item in &mut self.items {
            let placement = Placement::Adjacent { target: previous.replace(item.name.clone()) };
            item.sticky = Some(StickyDescriptor { enabled: true, placement, priority: 0 });
        }
    }

    /// Folding another collection's preferences into this one has no defined
    /// semantics yet.
    ///
    /// # Errors
    /// Always returns [`OrderError::MergeUnsupported`].
    pub fn merge_order(&mut self, _other: &OrderedCollection<T>) -> Result<(), OrderError> {
        Err(OrderError::MergeUnsupported)
    }

    fn apply_order(&mut self, order: &[usize]) {
        let mut slots = std::mem::take(&mut self.items).into_iter().map(Some).collect::<Vec<_>>();
        self.items = order.iter().filter_map(|&index| slots[index].take()).collect();
    }
}

impl<T> FromIterator<OrderedItem<T>> for OrderedCollection<T> {
    /// Collects without name checks; [`OrderedCollection::validate`] reports duplicates.
    fn from_iter<I: IntoIterator<Item = OrderedItem<T>>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::AdhesionError;
    use crate::model::UNDETERMINED_ORDER_KEY;

    fn names<T>(collection: &OrderedCollection<T>) -> Vec<String> {
        collection.items().iter().map(|item| item.name.to_string()).collect()
    }

    fn sorted(mut collection: OrderedCollection<()>, options: &SortOptions) -> Vec<String> {
        collection.sort(options).unwrap_or_else(|err| panic!("sort should succeed: {err}"));
        names(&collection)
    }

    fn add(collection: &mut OrderedCollection<()>, name: &str, order_key: i64) {
        collection
            .add(name, (), order_key)
            .unwrap_or_else(|err| panic!("add {name} should succeed: {err}"));
    }

    fn add_sticky(
        collection: &mut OrderedCollection<()>,
        name: &str,
        order_key: i64,
        descriptor: StickyDescriptor,
    ) {
        collection
            .add_sticky(name, (), order_key, descriptor)
            .unwrap_or_else(|err| panic!("add {name} should succeed: {err}"));
    }

    #[test]
    fn shared_target_followers_form_a_priority_block() {
        let mut collection = OrderedCollection::new();
        add(&mut collection, "A", 0);
        add(&mut collection, "B", 1);
        add_sticky(
            &mut collection,
            "D",
            UNDETERMINED_ORDER_KEY,
            StickyDescriptor::adjacent_to("B", 1),
        );
        add_sticky(
            &mut collection,
            "C",
            UNDETERMINED_ORDER_KEY,
            StickyDescriptor::adjacent_to("B", 0),
        );
        assert_eq!(sorted(collection, &SortOptions::default()), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn absolute_tie_goes_to_lower_priority() {
        let mut collection = OrderedCollection::new();
        add_sticky(&mut collection, "Y", 0, StickyDescriptor::absolute(0, 1));
        add_sticky(&mut collection, "X", 1, StickyDescriptor::absolute(0, 0));
        assert_eq!(sorted(collection, &SortOptions::default()), vec!["X", "Y"]);
    }

    #[test]
    fn two_node_cycle_raises_with_recursive_targets() {
        let mut collection = OrderedCollection::new();
        add_sticky(&mut collection, "A", 0, StickyDescriptor::adjacent_to("B", 0));
        add_sticky(&mut collection, "B", 1, StickyDescriptor::adjacent_to("A", 0));
        let options = SortOptions { recursive_targets: true, ..SortOptions::default() };
        let result = collection.sort(&options);
        assert!(matches!(result, Err(OrderError::Resolve(ResolveError::Cycle { .. }))));
        assert_eq!(names(&collection), vec!["A", "B"]);
    }

    #[test]
    fn self_target_is_a_cycle_even_without_recursion() {
        let mut collection = OrderedCollection::new();
        add_sticky(&mut collection, "A", 0, StickyDescriptor::adjacent_to("A", 0));
        assert!(matches!(
            collection.validate(&SortOptions::default()),
            Err(OrderError::Resolve(ResolveError::Cycle { .. }))
        ));
    }

    #[test]
    fn absolute_collision_is_a_configuration_error() {
        let mut collection = OrderedCollection::new();
        add_sticky(&mut collection, "X", 0, StickyDescriptor::absolute(2, 0));
        add_sticky(&mut collection, "Y", 1, StickyDescriptor::absolute(2, 0));
        let result = collection.sort(&SortOptions::default());
        assert!(matches!(
            result,
            Err(OrderError::Config(ConfigError::AbsoluteCollision { position: 2, priority: 0, .. }))
        ));
    }

    #[test]
    fn dangling_target_is_a_resolution_error() {
        let mut collection = OrderedCollection::new();
        add(&mut collection, "A", 0);
        add_sticky(&mut collection, "B", 1, StickyDescriptor::adjacent_to("missing", 0));
        assert!(matches!(
            collection.sort(&SortOptions::default()),
            Err(OrderError::Resolve(ResolveError::Dangling { .. }))
        ));
    }

    #[test]
    fn disabled_stickiness_ignores_invalid_descriptors() {
        let mut collection = OrderedCollection::new();
        add(&mut collection, "B", 1);
        add_sticky(&mut collection, "A", 0, StickyDescriptor::adjacent_to("missing", 0));
        assert_eq!(sorted(collection, &SortOptions::natural()), vec!["A", "B"]);
    }

    #[test]
    fn duplicate_names_are_rejected_on_add() {
        let mut collection = OrderedCollection::new();
        add(&mut collection, "A", 0);
        assert_eq!(
            collection.add("A", (), 1),
            Err(ConfigError::DuplicateName(ItemName::from("A")))
        );
        assert_eq!(collection.add(" ", (), 1), Err(ConfigError::BlankName));
    }

    #[test]
    fn failed_adhesion_leaves_collection_untouched() {
        let mut collection = OrderedCollection::new();
        add(&mut collection, "A", 0);
        add_sticky(&mut collection, "B", 1, StickyDescriptor::adjacent_to("A", 0));
        add_sticky(&mut collection, "C", 2, StickyDescriptor::adjacent_to("B", 0));
        let before = collection.clone();
        let result = collection.sort(&SortOptions::default());
        assert!(matches!(
            result,
            Err(OrderError::Adhesion(AdhesionError::FollowerTarget { .. }))
        ));
        assert_eq!(collection, before);
    }

    #[test]
    fn chained_collection_keeps_its_order_under_recursive_sort() {
        let mut collection = OrderedCollection::new();
        for (key, name) in (0_i64..).zip(["A", "B", "C", "D"]) {
            add(&mut collection, name, key);
        }
        collection.chain_to_predecessors();
        assert_eq!(
            collection.get("A").and_then(|item| item.sticky.clone()),
            Some(StickyDescriptor::at_start(0))
        );
        assert_eq!(
            collection.get("C").and_then(|item| item.sticky.clone()),
            Some(StickyDescriptor::adjacent_to("B", 0))
        );

        let options = SortOptions { recursive_targets: true, adhesion: false, ..SortOptions::default() };
        assert_eq!(sorted(collection, &options), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn merge_order_is_explicitly_unsupported() {
        let mut collection: OrderedCollection<()> = OrderedCollection::new();
        let other = OrderedCollection::new();
        assert_eq!(collection.merge_order(&other), Err(OrderError::MergeUnsupported));
    }

    #[test]
    fn apply_adhesion_regroups_current_order() {
        let mut collection = OrderedCollection::new();
        add_sticky(&mut collection, "F", 0, StickyDescriptor::adjacent_to("B", 0));
        add(&mut collection, "A", 1);
        add(&mut collection, "B", 2);
        collection
            .apply_adhesion()
            .unwrap_or_else(|err| panic!("adhesion should succeed: {err}"));
        assert_eq!(names(&collection), vec!["A", "B", "F"]);
        assert_eq!(
            collection.items().iter().map(|item| item.order_key).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: SortOptions = serde_json::from_str(r#"{"recursive_targets": true}"#)
            .unwrap_or_else(|err| panic!("options should parse: {err}"));
        assert_eq!(
            options,
            SortOptions { stickiness: true, recursive_targets: true, adhesion: true }
        );
    }

    fn plain_collection(keys: &[i64]) -> OrderedCollection<usize> {
        keys.iter()
            .enumerate()
            .map(|(index, &key)| OrderedItem::new(format!("item{index}"), index, key))
            .collect()
    }

    proptest! {
        #[test]
        fn property_natural_sort_matches_stable_key_sort(keys in prop::collection::vec(-5_i64..20, 0..24)) {
            let mut collection = plain_collection(&keys);
            prop_assert!(collection.sort(&SortOptions::natural()).is_ok());

            let mut expected = keys.iter().copied().enumerate().collect::<Vec<_>>();
            expected.sort_by_key(|&(_, key)| key);
            let actual = collection.items().iter().map(|item| item.value).collect::<Vec<_>>();
            prop_assert_eq!(actual, expected.into_iter().map(|(index, _)| index).collect::<Vec<_>>());
        }

        #[test]
        fn property_reindex_yields_dense_keys(keys in prop::collection::vec(any::<i64>(), 0..24)) {
            let mut collection = plain_collection(&keys);
            collection.reindex();
            for (expected, item) in (0_i64..).zip(collection.items()) {
                prop_assert_eq!(item.order_key, expected);
            }
        }

        #[test]
        fn property_distinct_absolute_positions_sort_ascending(
            positions in prop::collection::btree_set(0_i64..64, 1..16),
            seed in any::<u64>(),
        ) {
            let mut positions = positions.into_iter().collect::<Vec<_>>();
            let len = positions.len();
            for step in 0..len {
                let swap_with = usize::try_from((seed >> (step % 32)) % len as u64).unwrap_or(0);
                positions.swap(step, swap_with);
            }

            let mut collection = OrderedCollection::new();
            for (index, &position) in positions.iter().enumerate() {
                let added = collection.add_sticky(
                    format!("abs{index}"),
                    position,
                    i64::try_from(index).unwrap_or(0),
                    StickyDescriptor::absolute(position, 0),
                );
                prop_assert!(added.is_ok());
            }
            prop_assert!(collection.sort(&SortOptions::default()).is_ok());

            let ordered = collection.items().iter().map(|item| item.value).collect::<Vec<_>>();
            prop_assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));
        }

        #[test]
        fn property_followers_form_contiguous_priority_blocks(
            plain_count in 1_usize..8,
            followers in prop::collection::vec((0_usize..8, -3_i32..3), 0..12),
        ) {
            let mut collection = OrderedCollection::new();
            for index in 0..plain_count {
                let added = collection.add(format!("p{index}"), None, i64::try_from(index).unwrap_or(0));
                prop_assert!(added.is_ok());
            }
            for (index, &(target, priority)) in followers.iter().enumerate() {
                let target = format!("p{}", target % plain_count);
                let added = collection.add_sticky(
                    format!("f{index}"),
                    Some((target.clone(), priority)),
                    -1,
                    StickyDescriptor::adjacent_to(target, priority),
                );
                prop_assert!(added.is_ok());
            }
            prop_assert!(collection.sort(&SortOptions::default()).is_ok());

            let items = collection.items();
            let mut cursor = 0;
            while cursor < items.len() {
                prop_assert!(items[cursor].value.is_none());
                let target = items[cursor].name.to_string();
                let mut last_priority = i32::MIN;
                cursor += 1;
                while cursor < items.len() {
                    let Some((follower_target, priority)) = &items[cursor].value else {
                        break;
                    };
                    prop_assert_eq!(follower_target, &target);
                    prop_assert!(*priority >= last_priority);
                    last_priority = *priority;
                    cursor += 1;
                }
            }
        }
    }
}
