use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ConfigError, ResolveError};
use crate::model::{ItemName, OrderedItem, Role, START_ORDER_KEY};

/// The item an adjacency chain ends at.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Anchor {
    /// The very start of the sequence.
    Start,
    /// Index into the slice the resolver was built over.
    Item(usize),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Resolution {
    pub anchor: Anchor,
    pub hops: usize,
}

/// Looks targets up by name within one collection snapshot.
#[derive(Debug)]
pub struct TargetResolver<'a, T> {
    items: &'a [OrderedItem<T>],
    by_name: BTreeMap<&'a str, usize>,
}

impl<'a, T> TargetResolver<'a, T> {
    /// Index `items` by name.
    ///
    /// # Errors
    /// Returns [`ConfigError::DuplicateName`] when two items share a name.
    pub fn new(items: &'a [OrderedItem<T>]) -> Result<Self, ConfigError> {
        let mut by_name = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            if by_name.insert(item.name.as_str(), index).is_some() {
                return Err(ConfigError::DuplicateName(item.name.clone()));
            }
        }
        Ok(Self { items, by_name })
    }

    #[must_use]
    pub fn items(&self) -> &'a [OrderedItem<T>] {
        self.items
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// # Errors
    /// Returns [`ResolveError::IndexOutOfRange`] when `index` is past the end.
    pub fn item(&self, index: usize) -> Result<&'a OrderedItem<T>, ResolveError> {
        self.items
            .get(index)
            .ok_or(ResolveError::IndexOutOfRange { index, len: self.items.len() })
    }

    /// # Errors
    /// Returns [`ResolveError::IndexOutOfRange`] for an item anchor past the end.
    pub fn anchor_key(&self, anchor: Anchor) -> Result<i64, ResolveError> {
        match anchor {
            Anchor::Start => Ok(START_ORDER_KEY),
            Anchor::Item(index) => Ok(self.item(index)?.order_key),
        }
    }

    fn target_anchor(
        &self,
        item: &ItemName,
        target: Option<&ItemName>,
    ) -> Result<Anchor, ResolveError> {
        let Some(target) = target else {
            return Ok(Anchor::Start);
        };
        self.lookup(target.as_str()).map(Anchor::Item).ok_or_else(|| ResolveError::Dangling {
            item: item.clone(),
            target: target.clone(),
        })
    }

    /// Resolve the anchor of the item at `index`.
    ///
    /// Without `recursive` the direct target is returned with zero hops, even when
    /// that target is itself adjacency-sticky. With `recursive` the chain is walked
    /// until a node that is not adjacency-sticky, counting one hop per link.
    ///
    /// # Errors
    /// Returns [`ResolveError::Dangling`] for unknown target names and
    /// [`ResolveError::Cycle`] when the recursive walk revisits an item, and
    /// [`ResolveError::IndexOutOfRange`] when `index` is past the end.
    pub fn resolve(&self, index: usize, recursive: bool) -> Result<Resolution, ResolveError> {
        let item = self.item(index)?;
        let Role::Adjacent { target, .. } = item.role() else {
            return Ok(Resolution { anchor: Anchor::Item(index), hops: 0 });
        };

        if !recursive {
            let anchor = self.target_anchor(&item.name, target)?;
            return Ok(Resolution { anchor, hops: 0 });
        }

        let mut visited = BTreeSet::from([index]);
        let mut chain = vec![item.name.clone()];
        let mut current = item;
        let mut current_target = target;
        let mut hops = 0;
        loop {
            hops += 1;
            let anchor = self.target_anchor(&current.name, current_target)?;
            let Anchor::Item(next_index) = anchor else {
                return Ok(Resolution { anchor, hops });
            };

            let next = self.item(next_index)?;
            chain.push(next.name.clone());
            if !visited.insert(next_index) {
                return Err(ResolveError::Cycle { chain });
            }

            match next.role() {
                Role::Adjacent { target, .. } => {
                    current = next;
                    current_target = target;
                }
                Role::Plain | Role::Absolute { .. } => return Ok(Resolution { anchor, hops }),
            }
        }
    }
}
