use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional role of a particle group. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticleRole {
    Core,
    Control,
    Movement,
    Defense,
    Attack,
}

impl ParticleRole {
    /// Every role in the canonical draw order.
    pub const ALL: [ParticleRole; 5] = [
        ParticleRole::Core,
        ParticleRole::Control,
        ParticleRole::Movement,
        ParticleRole::Defense,
        ParticleRole::Attack,
    ];

    pub const COUNT: usize = 5;

    #[inline]
    pub fn index(self) -> usize {
        match self {
            ParticleRole::Core => 0,
            ParticleRole::Control => 1,
            ParticleRole::Movement => 2,
            ParticleRole::Defense => 3,
            ParticleRole::Attack => 4,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ParticleRole::Core => "core",
            ParticleRole::Control => "control",
            ParticleRole::Movement => "movement",
            ParticleRole::Defense => "defense",
            ParticleRole::Attack => "attack",
        }
    }

    /// Role whose force field this role's field hangs off.
    ///
    /// Attack, Defense and Movement answer to Control; Control answers to Core;
    /// Core is the root of the hierarchy.
    pub fn parent(self) -> Option<ParticleRole> {
        match self {
            ParticleRole::Core => None,
            ParticleRole::Control => Some(ParticleRole::Core),
            ParticleRole::Movement | ParticleRole::Defense | ParticleRole::Attack => {
                Some(ParticleRole::Control)
            }
        }
    }
}

impl fmt::Display for ParticleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rarity tier, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub const ALL: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
    ];

    /// Base selection weight in percent. The six weights sum to 100.
    pub fn weight(self) -> f64 {
        match self {
            Rarity::Common => 40.0,
            Rarity::Uncommon => 30.0,
            Rarity::Rare => 20.0,
            Rarity::Epic => 8.0,
            Rarity::Legendary => 1.5,
            Rarity::Mythic => 0.5,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_index_round_trip() {
        for (i, role) in ParticleRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
            assert_eq!(ParticleRole::from_index(i), Some(*role));
        }
        assert_eq!(ParticleRole::from_index(5), None);
    }

    #[test]
    fn test_role_hierarchy() {
        assert_eq!(ParticleRole::Core.parent(), None);
        assert_eq!(ParticleRole::Control.parent(), Some(ParticleRole::Core));
        assert_eq!(ParticleRole::Attack.parent(), Some(ParticleRole::Control));
        assert_eq!(ParticleRole::Defense.parent(), Some(ParticleRole::Control));
        assert_eq!(ParticleRole::Movement.parent(), Some(ParticleRole::Control));
    }

    #[test]
    fn test_rarity_weights_sum_to_hundred() {
        let total: f64 = Rarity::ALL.iter().map(|r| r.weight()).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rarity_is_ordered() {
        assert!(Rarity::Common < Rarity::Mythic);
        assert!(Rarity::Epic > Rarity::Rare);
    }
}
