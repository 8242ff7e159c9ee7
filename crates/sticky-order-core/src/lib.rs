//! Sticky ordering engine.
//!
//! Items carry a natural `order_key` and an optional [`StickyDescriptor`] that pins
//! them to an absolute slot or sticks them directly behind another item. Sorting an
//! [`OrderedCollection`] runs the sticky comparator, regroups followers behind
//! their direct target, and reindexes the result into dense keys.

mod adhesion;
pub mod collection;
pub mod compare;
pub mod error;
pub mod model;
pub mod resolve;

pub use collection::{reindex, OrderedCollection, SortOptions};
pub use compare::{
    compare_asymmetric, natural, sticky_tie_breakers, try_stable_sort, StickyComparator,
};
pub use error::{AdhesionError, ConfigError, OrderError, ResolveError};
pub use model::{
    ItemName, OrderedItem, Placement, Role, StickyDescriptor, StickyKind, START_ORDER_KEY,
    UNDETERMINED_ORDER_KEY,
};
pub use resolve::{Anchor, Resolution, TargetResolver};
