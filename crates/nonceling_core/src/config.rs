//! Configuration management for creature parameters.
//!
//! This module provides strongly-typed configuration structures that map to a
//! `nonceling.toml` file. Every tunable of the population, physics, force field
//! and mutation systems lives here; nothing is read from the environment.
//!
//! ## Configuration Hierarchy
//!
//! 1. Default values (hardcoded in `Default` impls)
//! 2. TOML file (overrides defaults, missing sections fall back to defaults)
//!
//! ## Example `nonceling.toml`
//!
//! ```toml
//! [population]
//! total = 500
//! baseline_per_role = 40
//!
//! [physics]
//! viscosity = 0.08
//! interaction_cutoff = 8.0
//!
//! [fields]
//! containment_strength = 200.0
//! ```

use nonceling_data::{DVec3, MutationType, ParticleRole, Rarity};
use serde::{Deserialize, Serialize};

/// One value per particle role.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PerRole<T> {
    pub core: T,
    pub control: T,
    pub movement: T,
    pub defense: T,
    pub attack: T,
}

impl<T: Copy> PerRole<T> {
    pub fn get(&self, role: ParticleRole) -> T {
        match role {
            ParticleRole::Core => self.core,
            ParticleRole::Control => self.control,
            ParticleRole::Movement => self.movement,
            ParticleRole::Defense => self.defense,
            ParticleRole::Attack => self.attack,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticleRole, T)> + '_ {
        ParticleRole::ALL.into_iter().map(move |r| (r, self.get(r)))
    }
}

/// Initial population sizing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    pub total: usize,
    pub baseline_per_role: usize,
    pub weight_min: f64,
    pub weight_max: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            total: 500,
            baseline_per_role: 40,
            weight_min: 0.1,
            weight_max: 0.3,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RngConfig {
    pub rehash_interval: u64,
    pub rehash_capacity: usize,
}

impl Default for RngConfig {
    fn default() -> Self {
        Self {
            rehash_interval: crate::rng::DEFAULT_REHASH_INTERVAL,
            rehash_capacity: crate::rng::DEFAULT_REHASH_CAPACITY,
        }
    }
}

/// Integrator and pairwise force parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed simulation step in seconds.
    pub fixed_dt: f64,
    /// Fraction of velocity lost per step.
    pub viscosity: f64,
    pub time_scale: f64,
    /// Pairs farther apart than this do not interact.
    pub interaction_cutoff: f64,
    /// Distances are clamped to at least this before dividing.
    pub min_distance: f64,
    pub collision_radius: f64,
    pub max_speed: f64,
    /// Upper bound on fixed steps run by one `tick` call.
    pub max_steps_per_update: usize,
    pub spatial_partitioning: bool,
    pub parallel: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            viscosity: 0.08,
            time_scale: 1.0,
            interaction_cutoff: 8.0,
            min_distance: 0.5,
            collision_radius: 0.6,
            max_speed: 40.0,
            max_steps_per_update: 8,
            spatial_partitioning: true,
            parallel: true,
        }
    }
}

/// Containment volume parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    pub radius: PerRole<f64>,
    /// Offset of each field's center from its parent's center.
    pub offset: PerRole<[f64; 3]>,
    pub containment_strength: f64,
    /// Fraction of the effective radius where containment starts.
    pub containment_threshold: f64,
    pub formation_strength: f64,
    /// Largest per-axis angular speed in radians per second.
    pub max_rotation_speed: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            radius: PerRole {
                core: 6.0,
                control: 10.0,
                movement: 16.0,
                defense: 20.0,
                attack: 24.0,
            },
            offset: PerRole {
                core: [0.0, 0.0, 0.0],
                control: [0.0, 0.0, 0.0],
                movement: [0.0, -2.0, 0.0],
                defense: [0.0, 0.0, 0.0],
                attack: [0.0, 2.0, 0.0],
            },
            containment_strength: 200.0,
            containment_threshold: 0.8,
            formation_strength: 0.6,
            max_rotation_speed: 0.6,
        }
    }
}

impl FieldConfig {
    pub fn offset_of(&self, role: ParticleRole) -> DVec3 {
        DVec3::from_array(self.offset.get(role))
    }
}

/// A confirmation-count threshold that may trigger one mutation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MilestoneConfig {
    pub name: String,
    pub threshold: u64,
    pub probability: f64,
    pub rarities: Vec<Rarity>,
    pub types: Vec<MutationType>,
}

impl MilestoneConfig {
    fn new(
        name: &str,
        threshold: u64,
        probability: f64,
        rarities: &[Rarity],
        types: &[MutationType],
    ) -> Self {
        Self {
            name: name.to_string(),
            threshold,
            probability,
            rarities: rarities.to_vec(),
            types: types.to_vec(),
        }
    }
}

/// Relative weight of each mutation type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TypeWeights {
    pub attribute_boost: f64,
    pub type_change: f64,
    pub count_increase: f64,
    pub group_split: f64,
}

impl TypeWeights {
    pub fn get(&self, t: MutationType) -> f64 {
        match t {
            MutationType::AttributeBoost => self.attribute_boost,
            MutationType::TypeChange => self.type_change,
            MutationType::CountIncrease => self.count_increase,
            MutationType::GroupSplit => self.group_split,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MutationConfig {
    pub milestones: Vec<MilestoneConfig>,
    pub type_weights: TypeWeights,
    /// Per-role, per-type base weight for picking affected groups.
    pub group_weights: PerRole<TypeWeights>,
    /// How fast each role's pick weight grows per 100k confirmations.
    pub role_growth: PerRole<f64>,
    /// Cap on particles added to a group, as a fraction of its birth count.
    pub max_growth_fraction: f64,
    pub max_groups: usize,
    pub min_split_size: usize,
    /// Largest absolute change to one interaction matrix entry.
    pub matrix_nudge: f64,
    pub hue_shift_degrees: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        use MutationType::*;
        use Rarity::*;
        let all = [AttributeBoost, TypeChange, CountIncrease, GroupSplit];
        Self {
            milestones: vec![
                MilestoneConfig::new(
                    "Awakening",
                    10_000,
                    0.01,
                    &[Common, Uncommon],
                    &[AttributeBoost, CountIncrease],
                ),
                MilestoneConfig::new(
                    "Adaptation",
                    25_000,
                    0.05,
                    &[Common, Uncommon, Rare],
                    &[AttributeBoost, TypeChange, CountIncrease],
                ),
                MilestoneConfig::new(
                    "Evolution",
                    50_000,
                    0.10,
                    &[Common, Uncommon, Rare, Epic],
                    &all,
                ),
                MilestoneConfig::new("Ascension", 100_000, 0.25, &[Rare, Epic, Legendary], &all),
                MilestoneConfig::new(
                    "Transcendence",
                    250_000,
                    0.50,
                    &[Epic, Legendary, Mythic],
                    &all,
                ),
                MilestoneConfig::new("Apotheosis", 500_000, 1.0, &[Legendary, Mythic], &all),
            ],
            type_weights: TypeWeights {
                attribute_boost: 50.0,
                type_change: 20.0,
                count_increase: 20.0,
                group_split: 10.0,
            },
            group_weights: PerRole {
                core: TypeWeights {
                    attribute_boost: 3.0,
                    type_change: 1.0,
                    count_increase: 1.0,
                    group_split: 0.5,
                },
                control: TypeWeights {
                    attribute_boost: 2.0,
                    type_change: 2.0,
                    count_increase: 1.0,
                    group_split: 1.0,
                },
                movement: TypeWeights {
                    attribute_boost: 1.0,
                    type_change: 2.0,
                    count_increase: 2.0,
                    group_split: 2.0,
                },
                defense: TypeWeights {
                    attribute_boost: 2.0,
                    type_change: 1.0,
                    count_increase: 3.0,
                    group_split: 1.0,
                },
                attack: TypeWeights {
                    attribute_boost: 2.0,
                    type_change: 2.0,
                    count_increase: 2.0,
                    group_split: 3.0,
                },
            },
            role_growth: PerRole {
                core: 0.2,
                control: 0.4,
                movement: 0.8,
                defense: 0.6,
                attack: 1.0,
            },
            max_growth_fraction: 0.5,
            max_groups: 12,
            min_split_size: 10,
            matrix_nudge: 0.2,
            hue_shift_degrees: 15.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub population: PopulationConfig,
    pub rng: RngConfig,
    pub physics: PhysicsConfig,
    pub fields: FieldConfig,
    pub mutation: MutationConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a description
    /// of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Population validation
        let p = &self.population;
        anyhow::ensure!(p.total > 0, "Population total must be positive");
        anyhow::ensure!(
            p.baseline_per_role * ParticleRole::COUNT <= p.total,
            "Baseline per role exceeds the population total"
        );
        anyhow::ensure!(
            p.weight_min > 0.0 && p.weight_min <= p.weight_max,
            "Population weights must satisfy 0 < weight_min <= weight_max"
        );

        // RNG validation
        anyhow::ensure!(
            self.rng.rehash_interval > 0,
            "Rehash interval must be positive"
        );
        anyhow::ensure!(
            self.rng.rehash_capacity > 0,
            "Rehash capacity must be positive"
        );

        // Physics validation
        let ph = &self.physics;
        anyhow::ensure!(ph.fixed_dt > 0.0, "Fixed timestep must be positive");
        anyhow::ensure!(
            (0.0..1.0).contains(&ph.viscosity),
            "Viscosity must be in [0.0, 1.0)"
        );
        anyhow::ensure!(ph.time_scale > 0.0, "Time scale must be positive");
        anyhow::ensure!(
            ph.interaction_cutoff > 0.0,
            "Interaction cutoff must be positive"
        );
        anyhow::ensure!(ph.min_distance > 0.0, "Minimum distance must be positive");
        anyhow::ensure!(
            ph.collision_radius >= 0.0,
            "Collision radius must be non-negative"
        );
        anyhow::ensure!(ph.max_speed > 0.0, "Max speed must be positive");
        anyhow::ensure!(
            ph.max_steps_per_update > 0,
            "Max steps per update must be positive"
        );

        // Field validation
        let f = &self.fields;
        for (role, radius) in f.radius.iter() {
            anyhow::ensure!(radius > 0.0, "Field radius for {} must be positive", role);
        }
        for (role, offset) in f.offset.iter() {
            anyhow::ensure!(
                offset.iter().all(|c| c.is_finite()),
                "Field offset for {} must be finite",
                role
            );
        }
        anyhow::ensure!(
            f.containment_strength >= 0.0,
            "Containment strength must be non-negative"
        );
        anyhow::ensure!(
            f.containment_threshold > 0.0 && f.containment_threshold <= 1.0,
            "Containment threshold must be in (0.0, 1.0]"
        );
        anyhow::ensure!(
            f.formation_strength >= 0.0,
            "Formation strength must be non-negative"
        );
        anyhow::ensure!(
            f.max_rotation_speed >= 0.0,
            "Max rotation speed must be non-negative"
        );

        // Mutation validation
        let m = &self.mutation;
        let mut last = None;
        for ms in &m.milestones {
            anyhow::ensure!(
                (0.0..=1.0).contains(&ms.probability),
                "Milestone {} probability must be in [0.0, 1.0]",
                ms.name
            );
            anyhow::ensure!(
                !ms.rarities.is_empty(),
                "Milestone {} has no eligible rarities",
                ms.name
            );
            anyhow::ensure!(
                ms.types.iter().any(|t| m.type_weights.get(*t) > 0.0),
                "Milestone {} has no enabled mutation type with positive weight",
                ms.name
            );
            if let Some(prev) = last {
                anyhow::ensure!(
                    ms.threshold > prev,
                    "Milestone thresholds must be strictly ascending"
                );
            }
            last = Some(ms.threshold);
        }
        anyhow::ensure!(
            m.max_growth_fraction >= 0.0,
            "Max growth fraction must be non-negative"
        );
        anyhow::ensure!(
            m.max_groups >= ParticleRole::COUNT,
            "Max groups must be at least the number of roles"
        );
        anyhow::ensure!(m.min_split_size > 0, "Min split size must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&m.matrix_nudge),
            "Matrix nudge must be in [0.0, 1.0]"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Hash of every parameter that influences simulation outcomes.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.population).as_bytes());
        hasher.update(format!("{:?}", self.rng).as_bytes());
        hasher.update(format!("{:?}", self.physics).as_bytes());
        hasher.update(format!("{:?}", self.fields).as_bytes());
        hasher.update(format!("{:?}", self.mutation).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baseline() {
        let config = AppConfig {
            population: PopulationConfig {
                baseline_per_role: 200,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_viscosity() {
        let config = AppConfig {
            physics: PhysicsConfig {
                viscosity: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsorted_milestones_rejected() {
        let mut config = AppConfig::default();
        config.mutation.milestones.swap(0, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_overrides_and_defaults() {
        let config = AppConfig::from_toml(
            "[physics]\nviscosity = 0.2\n\n[population]\ntotal = 300\nbaseline_per_role = 20\n",
        )
        .expect("valid toml");
        assert_eq!(config.physics.viscosity, 0.2);
        assert_eq!(config.physics.interaction_cutoff, 8.0);
        assert_eq!(config.population.total, 300);
        assert_eq!(config.mutation.milestones.len(), 6);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        assert!(AppConfig::from_toml("[physics]\nfixed_dt = -1.0\n").is_err());
    }

    #[test]
    fn test_per_role_lookup() {
        let f = FieldConfig::default();
        assert_eq!(f.radius.get(ParticleRole::Core), 6.0);
        assert_eq!(f.radius.get(ParticleRole::Attack), 24.0);
        assert_eq!(f.offset_of(ParticleRole::Attack), DVec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_fingerprint_consistency() {
        let config1 = AppConfig::default();
        let config2 = AppConfig::default();
        assert_eq!(config1.fingerprint(), config2.fingerprint());

        let mut config3 = AppConfig::default();
        config3.physics.viscosity = 0.1;
        assert_ne!(config1.fingerprint(), config3.fingerprint());
    }
}
