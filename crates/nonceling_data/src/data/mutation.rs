use super::role::Rarity;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationType {
    /// Color, scale and interaction tweaks.
    AttributeBoost,
    /// Re-draw of one trait category.
    TypeChange,
    /// New particles joining the group.
    CountIncrease,
    /// Half the group breaks off into a new group.
    GroupSplit,
}

impl MutationType {
    pub const ALL: [MutationType; 4] = [
        MutationType::AttributeBoost,
        MutationType::TypeChange,
        MutationType::CountIncrease,
        MutationType::GroupSplit,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationType::AttributeBoost => "attribute_boost",
            MutationType::TypeChange => "type_change",
            MutationType::CountIncrease => "count_increase",
            MutationType::GroupSplit => "group_split",
        };
        f.write_str(name)
    }
}

/// A milestone-triggered change to one or more groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub id: String,
    /// Confirmation count reported when the milestone was crossed.
    pub confirmations: u64,
    pub milestone: String,
    pub mutation_type: MutationType,
    pub rarity: Rarity,
    pub affected_groups: Vec<usize>,
    pub applied: bool,
}
