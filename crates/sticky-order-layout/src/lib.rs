use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sticky_order_core::{
    Anchor, ConfigError, ItemName, OrderedCollection, OrderedItem, Placement, Role, SortOptions,
    StickyDescriptor, StickyKind, TargetResolver,
};

pub const LAYOUT_CONTRACT_VERSION: &str = "layout.v1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// One persisted column-ordering entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRecord {
    pub name: String,
    pub order_index: i64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub is_sticky: bool,
    #[serde(default)]
    pub sticky_kind: Option<StickyKind>,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub absolute_position: i64,
    #[serde(default)]
    pub priority: i32,
}

fn default_visible() -> bool {
    true
}

impl ColumnRecord {
    #[must_use]
    pub fn plain(name: impl Into<String>, order_index: i64) -> Self {
        Self {
            name: name.into(),
            order_index,
            visible: true,
            is_sticky: false,
            sticky_kind: None,
            target_name: None,
            absolute_position: 0,
            priority: 0,
        }
    }

    #[must_use]
    pub fn absolute(name: impl Into<String>, order_index: i64, position: i64, priority: i32) -> Self {
        Self {
            is_sticky: true,
            sticky_kind: Some(StickyKind::AbsolutePosition),
            absolute_position: position,
            priority,
            ..Self::plain(name, order_index)
        }
    }

    #[must_use]
    pub fn adjacent(
        name: impl Into<String>,
        order_index: i64,
        target: Option<&str>,
        priority: i32,
    ) -> Self {
        Self {
            is_sticky: true,
            sticky_kind: Some(StickyKind::AdjacentToItem),
            target_name: target.map(str::to_string),
            priority,
            ..Self::plain(name, order_index)
        }
    }

    /// The placement preference this record describes, if it names a sticky kind.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingStickyKind`] when `isSticky` is set without a kind.
    pub fn descriptor(&self) -> Result<Option<StickyDescriptor>, ConfigError> {
        let placement = match self.sticky_kind {
            None if self.is_sticky => {
                return Err(ConfigError::MissingStickyKind(ItemName::from(self.name.as_str())));
            }
            None => return Ok(None),
            Some(StickyKind::AbsolutePosition) => {
                Placement::Absolute { position: self.absolute_position }
            }
            Some(StickyKind::AdjacentToItem) => {
                Placement::Adjacent { target: self.target_name.as_deref().map(ItemName::from) }
            }
        };
        Ok(Some(StickyDescriptor { enabled: self.is_sticky, placement, priority: self.priority }))
    }

    fn adopt_descriptor(&mut self, descriptor: &StickyDescriptor) {
        self.is_sticky = descriptor.enabled;
        self.sticky_kind = Some(descriptor.placement.kind());
        self.priority = descriptor.priority;
        match &descriptor.placement {
            Placement::Absolute { position } => self.absolute_position = *position,
            Placement::Adjacent { target } => {
                self.target_name = target.as_ref().map(ToString::to_string);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutDocument {
    #[serde(default = "default_contract_version")]
    pub contract_version: String,
    pub columns: Vec<ColumnRecord>,
}

fn default_contract_version() -> String {
    LAYOUT_CONTRACT_VERSION.to_string()
}

/// Display-configuration editor over a set of column records.
///
/// Records are kept in `orderIndex` order; every mutating operation leaves the
/// indices dense and returns the resulting column names in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<ColumnRecord>,
}

impl ColumnLayout {
    #[must_use]
    pub fn new(mut columns: Vec<ColumnRecord>) -> Self {
        columns.sort_by_key(|column| column.order_index);
        Self { columns }
    }

    /// Parse a JSON layout document.
    ///
    /// # Errors
    /// Returns an error when the input is not a valid layout document.
    pub fn from_json(input: &str) -> Result<Self> {
        let document: LayoutDocument =
            serde_json::from_str(input).context("failed to parse JSON layout document")?;
        Self::from_document(document)
    }

    /// Parse a YAML layout document.
    ///
    /// # Errors
    /// Returns an error when the input is not a valid layout document.
    pub fn from_yaml(input: &str) -> Result<Self> {
        let document: LayoutDocument =
            serde_yaml::from_str(input).context("failed to parse YAML layout document")?;
        Self::from_document(document)
    }

    /// # Errors
    /// Returns an error when the document declares an unsupported contract version.
    pub fn from_document(document: LayoutDocument) -> Result<Self> {
        if document.contract_version != LAYOUT_CONTRACT_VERSION {
            return Err(anyhow!(
                "unsupported layout contract version `{}` (expected {LAYOUT_CONTRACT_VERSION})",
                document.contract_version
            ));
        }
        Ok(Self::new(document.columns))
    }

    /// Load a layout file; `.yaml`/`.yml` files are read as YAML, everything else as JSON.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path)
            .with_context(|| format!("failed to read layout file {}", path.display()))?;
        let layout = if is_yaml(path) { Self::from_yaml(&body) } else { Self::from_json(&body) };
        layout.with_context(|| format!("invalid layout file {}", path.display()))
    }

    /// Write the layout back in the format its extension selects.
    ///
    /// # Errors
    /// Returns an error when serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let document = self.to_document();
        let body = if is_yaml(path) {
            serde_yaml::to_string(&document).context("failed to serialize YAML layout")?
        } else {
            let mut body = serde_json::to_string_pretty(&document)
                .context("failed to serialize JSON layout")?;
            body.push('\n');
            body
        };
        fs::write(path, body)
            .with_context(|| format!("failed to write layout file {}", path.display()))
    }

    #[must_use]
    pub fn to_document(&self) -> LayoutDocument {
        LayoutDocument {
            contract_version: LAYOUT_CONTRACT_VERSION.to_string(),
            columns: self.columns.clone(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnRecord] {
        &self.columns
    }

    #[must_use]
    pub fn order(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    #[must_use]
    pub fn visible_order(&self) -> Vec<String> {
        self.columns.iter().filter(|column| column.visible).map(|column| column.name.clone()).collect()
    }

    /// Build the engine's view of the layout; each item's value is its record index.
    ///
    /// # Errors
    /// Returns an error for blank or duplicate names and sticky records without a kind.
    pub fn to_collection(&self) -> Result<OrderedCollection<usize>> {
        let mut collection = OrderedCollection::new();
        for (index, column) in self.columns.iter().enumerate() {
            let mut item = OrderedItem::new(column.name.as_str(), index, column.order_index);
            item.sticky = column.descriptor()?;
            collection.push(item)?;
        }
        Ok(collection)
    }

    /// # Errors
    /// Returns an error when the layout cannot be sorted with `options`.
    pub fn validate(&self, options: &SortOptions) -> Result<()> {
        self.to_collection()?.validate(options)?;
        Ok(())
    }

    /// Sort the columns and write the resulting `orderIndex` values back.
    ///
    /// # Errors
    /// Returns an error for invalid configuration, unresolvable targets, cycles,
    /// or follower groups that cannot be placed.
    pub fn sort(&mut self, options: &SortOptions) -> Result<Vec<String>> {
        let mut collection = self.to_collection()?;
        collection.sort(options)?;
        self.adopt(collection, false);
        Ok(self.order())
    }

    /// Rewrite every column as adjacency-sticky to its predecessor.
    ///
    /// # Errors
    /// Returns an error when the layout cannot be converted into a collection.
    pub fn chain_to_predecessors(&mut self) -> Result<Vec<String>> {
        let mut collection = self.to_collection()?;
        collection.chain_to_predecessors();
        collection.reindex();
        self.adopt(collection, true);
        Ok(self.order())
    }

    /// Move a column `count` steps up or down.
    ///
    /// With `respect_adhesion` a column drags its whole follower chain along and
    /// followers cannot be moved on their own; followers of the start stay at the
    /// head. With `respect_absolute` pinned columns keep their index and cannot be
    /// moved, and under `respect_adhesion` their followers stay directly behind them.
    ///
    /// # Errors
    /// Returns an error for unknown, pinned, or adhered columns, invalid records,
    /// and follower chains that dangle or loop.
    pub fn move_item(
        &mut self,
        name: &str,
        direction: MoveDirection,
        count: usize,
        respect_absolute: bool,
        respect_adhesion: bool,
    ) -> Result<Vec<String>> {
        let position = self.position(name)?;
        let collection = self.to_collection()?;
        let items = collection.items();
        let resolver = TargetResolver::new(items)?;

        let pinned = items
            .iter()
            .map(|item| respect_absolute && matches!(item.role(), Role::Absolute { .. }))
            .collect::<Vec<_>>();
        if pinned[position] {
            return Err(ConfigError::ItemPinned(ItemName::from(name)).into());
        }
        if respect_adhesion && items[position].is_follower() {
            return Err(ConfigError::ItemAdhered(ItemName::from(name)).into());
        }

        // Fixed blocks are keyed by their anchor slot; `None` is the start.
        let mut fixed: BTreeMap<Option<usize>, Vec<usize>> = BTreeMap::new();
        let mut movable: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for index in 0..items.len() {
            let anchor = if respect_adhesion {
                resolver.resolve(index, true)?.anchor
            } else {
                Anchor::Item(index)
            };
            match anchor {
                Anchor::Start => fixed.entry(None).or_default().push(index),
                Anchor::Item(root) if pinned[root] => {
                    fixed.entry(Some(root)).or_default().push(index);
                }
                Anchor::Item(root) => movable.entry(root).or_default().push(index),
            }
        }
        for (root, block) in &mut fixed {
            block.sort_by_key(|&member| (Some(member) != *root, member));
        }
        for (&root, unit) in &mut movable {
            unit.sort_by_key(|&member| (member != root, member));
        }

        let total = items.len();
        let mut slots: Vec<Option<usize>> = vec![None; total];
        let mut reserved = fixed.values().map(Vec::len).sum::<usize>();
        let mut cursor = 0;
        for (root, block) in &fixed {
            reserved = reserved.saturating_sub(block.len());
            let latest = total.saturating_sub(reserved + block.len());
            let first = cursor.max(root.unwrap_or(0).min(latest));
            for (slot, &member) in slots.iter_mut().skip(first).zip(block) {
                *slot = Some(member);
            }
            cursor = first + block.len();
        }

        let mut units = movable.into_values().collect::<Vec<_>>();
        let from = units
            .iter()
            .position(|unit| unit.first() == Some(&position))
            .ok_or_else(|| anyhow!("column `{name}` does not lead a movable unit"))?;
        let to = match direction {
            MoveDirection::Up => from.saturating_sub(count),
            MoveDirection::Down => from.saturating_add(count).min(units.len() - 1),
        };
        let unit = units.remove(from);
        units.insert(to, unit);

        let mut queue = units.into_iter().flatten();
        let reordered = slots
            .into_iter()
            .map(|slot| slot.or_else(|| queue.next()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| anyhow!("ran out of columns while moving `{name}`"))?;

        self.columns = reordered.iter().map(|&index| self.columns[index].clone()).collect();
        self.reindex();
        tracing::debug!(
            column = name,
            direction = direction.as_str(),
            count,
            from,
            to,
            fixed_blocks = fixed.len(),
            "moved column"
        );
        Ok(self.order())
    }

    /// # Errors
    /// Returns an error when no column has the given name.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> Result<Vec<String>> {
        let position = self.position(name)?;
        self.columns[position].visible = visible;
        Ok(self.order())
    }

    /// `sha256:<hex>` fingerprint of the ordered records.
    ///
    /// # Errors
    /// Returns an error when the records cannot be serialized.
    pub fn layout_digest(&self) -> Result<String> {
        let canonical =
            serde_json::to_vec(&self.columns).context("failed to serialize layout for digest")?;
        let digest = Sha256::digest(&canonical);
        Ok(format!("sha256:{digest:x}"))
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| ConfigError::UnknownItem(ItemName::from(name)).into())
    }

    fn reindex(&mut self) {
        for (index, column) in (0_i64..).zip(self.columns.iter_mut()) {
            column.order_index = index;
        }
    }

    fn adopt(&mut self, collection: OrderedCollection<usize>, with_descriptors: bool) {
        self.columns = collection
            .into_items()
            .into_iter()
            .map(|item| {
                let mut column = self.columns[item.value].clone();
                column.order_index = item.order_key;
                if let (true, Some(descriptor)) = (with_descriptors, item.sticky.as_ref()) {
                    column.adopt_descriptor(descriptor);
                }
                column
            })
            .collect();
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml" | "yml"))
}
