use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Order key carried by items whose position has not been determined yet.
pub const UNDETERMINED_ORDER_KEY: i64 = -1;

/// Natural key of the start-of-sequence anchor.
pub const START_ORDER_KEY: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ItemName(String);

impl ItemName {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for ItemName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum StickyKind {
    AbsolutePosition,
    AdjacentToItem,
}

/// Where a sticky item wants to be placed.
///
/// `Adjacent { target: None }` sticks the item to the very start of the sequence.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    Absolute { position: i64 },
    Adjacent { target: Option<ItemName> },
}

impl Placement {
    #[must_use]
    pub fn kind(&self) -> StickyKind {
        match self {
            Self::Absolute { .. } => StickyKind::AbsolutePosition,
            Self::Adjacent { .. } => StickyKind::AdjacentToItem,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StickyDescriptor {
    pub enabled: bool,
    pub placement: Placement,
    #[serde(default)]
    pub priority: i32,
}

impl StickyDescriptor {
    #[must_use]
    pub fn absolute(position: i64, priority: i32) -> Self {
        Self { enabled: true, placement: Placement::Absolute { position }, priority }
    }

    #[must_use]
    pub fn adjacent_to(target: impl Into<ItemName>, priority: i32) -> Self {
        Self {
            enabled: true,
            placement: Placement::Adjacent { target: Some(target.into()) },
            priority,
        }
    }

    #[must_use]
    pub fn at_start(priority: i32) -> Self {
        Self { enabled: true, placement: Placement::Adjacent { target: None }, priority }
    }

    /// Keep the stored preference but stop it from influencing the order.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Validate the descriptor in isolation, without looking at the collection.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for blank target names or negative absolute positions.
    pub fn validate(&self, item: &ItemName) -> Result<(), ConfigError> {
        match &self.placement {
            Placement::Absolute { position } if *position < 0 => {
                Err(ConfigError::NegativeAbsolutePosition { item: item.clone(), position: *position })
            }
            Placement::Adjacent { target: Some(target) } if target.is_blank() => {
                Err(ConfigError::BlankTargetName { item: item.clone() })
            }
            _ => Ok(()),
        }
    }
}

/// How an item participates in one comparison.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role<'a> {
    Plain,
    Absolute { position: i64, priority: i32 },
    Adjacent { target: Option<&'a ItemName>, priority: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct OrderedItem<T> {
    pub name: ItemName,
    pub order_key: i64,
    pub value: T,
    #[serde(default)]
    pub sticky: Option<StickyDescriptor>,
}

impl<T> OrderedItem<T> {
    #[must_use]
    pub fn new(name: impl Into<ItemName>, value: T, order_key: i64) -> Self {
        Self { name: name.into(), order_key, value, sticky: None }
    }

    #[must_use]
    pub fn with_sticky(mut self, descriptor: StickyDescriptor) -> Self {
        self.sticky = Some(descriptor);
        self
    }

    /// The descriptor, only when it is enabled.
    #[must_use]
    pub fn active_sticky(&self) -> Option<&StickyDescriptor> {
        self.sticky.as_ref().filter(|descriptor| descriptor.enabled)
    }

    #[must_use]
    pub fn role(&self) -> Role<'_> {
        match self.active_sticky() {
            None => Role::Plain,
            Some(StickyDescriptor { placement: Placement::Absolute { position }, priority, .. }) => {
                Role::Absolute { position: *position, priority: *priority }
            }
            Some(StickyDescriptor { placement: Placement::Adjacent { target }, priority, .. }) => {
                Role::Adjacent { target: target.as_ref(), priority: *priority }
            }
        }
    }

    #[must_use]
    pub fn is_follower(&self) -> bool {
        matches!(self.role(), Role::Adjacent { .. })
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.sticky.as_ref().map_or(0, |descriptor| descriptor.priority)
    }
}
