use crate::model::ItemName;

/// Invalid placement configuration, surfaced before any ordering work starts.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("item `{item}` MUST NOT declare a blank target name")]
    BlankTargetName { item: ItemName },
    #[error("item `{item}` declares negative absolute position {position}")]
    NegativeAbsolutePosition { item: ItemName, position: i64 },
    #[error(
        "items `{first}` and `{second}` both claim absolute position {position} with priority {priority}"
    )]
    AbsoluteCollision { first: ItemName, second: ItemName, position: i64, priority: i32 },
    #[error("item name `{0}` is already present in the collection")]
    DuplicateName(ItemName),
    #[error("item name MUST be non-empty")]
    BlankName,
    #[error("unknown item `{0}`")]
    UnknownItem(ItemName),
    #[error("item `{0}` is pinned to an absolute position and cannot be moved")]
    ItemPinned(ItemName),
    #[error("item `{0}` adheres to its target and only moves with it")]
    ItemAdhered(ItemName),
    #[error("item `{0}` is sticky but declares no sticky kind")]
    MissingStickyKind(ItemName),
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ResolveError {
    #[error("item `{item}` sticks to `{target}`, which is not in the collection")]
    Dangling { item: ItemName, target: ItemName },
    #[error("cycle in adjacency chain: {}", join_chain(.chain))]
    Cycle { chain: Vec<ItemName> },
    #[error("item index {index} is out of range for a collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum AdhesionError {
    #[error("adhesion target `{target}` is missing; followers [{}] cannot be placed", join_list(.followers))]
    MissingTarget { target: ItemName, followers: Vec<ItemName> },
    #[error(
        "adhesion target `{target}` is itself a follower; followers [{}] cannot be placed",
        join_list(.followers)
    )]
    FollowerTarget { target: ItemName, followers: Vec<ItemName> },
}

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum OrderError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("adhesion error: {0}")]
    Adhesion(#[from] AdhesionError),
    #[error("merging orderings is not supported; only chain_to_predecessors is available")]
    MergeUnsupported,
}

fn join_chain(chain: &[ItemName]) -> String {
    chain.iter().map(ItemName::as_str).collect::<Vec<_>>().join(" -> ")
}

fn join_list(names: &[ItemName]) -> String {
    names.iter().map(ItemName::as_str).collect::<Vec<_>>().join(", ")
}
