//! Rarity rolls and trait assignment.
//!
//! Each group gets a rarity tier from a weighted roll and then one trait per
//! category, drawn uniformly from the catalog entries available to its role at
//! that tier. Groups are visited in canonical role order because every draw
//! advances the shared `traits` stream.

use crate::error::{CoreError, Result};
use crate::rng::SeededRng;
use nonceling_data::{
    Behavior, Color, ForceProfile, Formation, ParticleGroup, ParticleRole, Rarity, Shape,
    TraitCategory,
};
use serde::{Deserialize, Serialize};

/// A catalog value, the tier it belongs to and the roles allowed to draw it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogEntry<T> {
    pub value: T,
    pub rarity: Rarity,
    /// Roles allowed to draw this entry; empty means every role.
    #[serde(default)]
    pub roles: Vec<ParticleRole>,
}

impl<T> CatalogEntry<T> {
    fn matches(&self, role: ParticleRole, rarity: Rarity) -> bool {
        self.rarity == rarity && (self.roles.is_empty() || self.roles.contains(&role))
    }
}

fn entry<T>(value: T, rarity: Rarity, roles: &[ParticleRole]) -> CatalogEntry<T> {
    CatalogEntry {
        value,
        rarity,
        roles: roles.to_vec(),
    }
}

fn profile(name: &str, strength: f64, reach: f64) -> ForceProfile {
    ForceProfile {
        name: name.to_string(),
        strength,
        reach,
    }
}

/// Filters `entries` to a role and tier and picks one with `floor(rng * len)`.
fn pick<'a, T>(
    entries: &'a [CatalogEntry<T>],
    role: ParticleRole,
    rarity: Rarity,
    category: TraitCategory,
    rng: &mut SeededRng,
) -> Result<&'a T> {
    let candidates: Vec<&CatalogEntry<T>> =
        entries.iter().filter(|e| e.matches(role, rarity)).collect();
    if candidates.is_empty() {
        return Err(CoreError::EmptyCatalog {
            role,
            rarity,
            category,
        });
    }
    Ok(&candidates[rng.index(candidates.len())].value)
}

/// Every trait value a group can be assigned.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TraitCatalog {
    pub shapes: Vec<CatalogEntry<Shape>>,
    pub colors: Vec<CatalogEntry<Color>>,
    pub formations: Vec<CatalogEntry<Formation>>,
    pub behaviors: Vec<CatalogEntry<Behavior>>,
    pub force_profiles: Vec<CatalogEntry<ForceProfile>>,
}

impl Default for TraitCatalog {
    fn default() -> Self {
        use ParticleRole::*;
        use Rarity::*;
        Self {
            shapes: vec![
                entry(Shape::Sphere, Common, &[]),
                entry(Shape::Cube, Common, &[Core, Defense]),
                entry(Shape::Tetrahedron, Common, &[Attack, Movement]),
                entry(Shape::Octahedron, Uncommon, &[]),
                entry(Shape::Tetrahedron, Uncommon, &[Attack]),
                entry(Shape::Icosahedron, Rare, &[]),
                entry(Shape::Cube, Rare, &[Defense]),
                entry(Shape::Torus, Epic, &[]),
                entry(Shape::Crystal, Legendary, &[]),
                entry(Shape::Star, Mythic, &[]),
            ],
            colors: vec![
                entry(Color::rgb(0xE0, 0xE6, 0xF0), Common, &[]),
                entry(Color::rgb(0x5A, 0x9B, 0xD5), Common, &[]),
                entry(Color::rgb(0xF2, 0xA1, 0x3B), Common, &[Core, Control]),
                entry(Color::rgb(0xD8, 0x3A, 0x3A), Common, &[Attack]),
                entry(Color::rgb(0x3F, 0xB9, 0x7A), Uncommon, &[]),
                entry(Color::rgb(0x8E, 0x5C, 0xD9), Uncommon, &[]),
                entry(Color::rgb(0x2B, 0xD4, 0xE3), Rare, &[]),
                entry(Color::rgb(0xF5, 0x5F, 0xA8), Rare, &[Attack, Movement]),
                entry(Color::rgb(0xFF, 0xD7, 0x00), Epic, &[]),
                entry(Color::rgb(0xFF, 0x6B, 0x00), Legendary, &[]),
                entry(Color::rgb(0xFF, 0xFF, 0xFF), Mythic, &[]),
                entry(Color::rgb(0x10, 0x10, 0x10), Mythic, &[Core]),
            ],
            formations: vec![
                entry(Formation::Cluster, Common, &[]),
                entry(Formation::Ring, Common, &[Control, Movement]),
                entry(Formation::Fins, Common, &[Attack]),
                entry(Formation::Lattice, Common, &[Defense]),
                entry(Formation::Shell, Uncommon, &[]),
                entry(Formation::Ring, Uncommon, &[]),
                entry(Formation::Spiral, Rare, &[]),
                entry(Formation::Lattice, Rare, &[Core, Defense]),
                entry(Formation::Helix, Epic, &[]),
                entry(Formation::Vortex, Legendary, &[]),
                entry(Formation::Vortex, Mythic, &[]),
                entry(Formation::Helix, Mythic, &[Movement, Attack]),
            ],
            behaviors: vec![
                entry(Behavior::Drift, Common, &[]),
                entry(Behavior::Guard, Common, &[Core, Defense]),
                entry(Behavior::Patrol, Common, &[Movement, Control]),
                entry(Behavior::Strike, Common, &[Attack]),
                entry(Behavior::Orbit, Uncommon, &[]),
                entry(Behavior::Pulse, Rare, &[]),
                entry(Behavior::Swarm, Rare, &[Movement, Attack]),
                entry(Behavior::Swarm, Epic, &[]),
                entry(Behavior::Phase, Legendary, &[]),
                entry(Behavior::Phase, Mythic, &[]),
                entry(Behavior::Pulse, Mythic, &[Core]),
            ],
            force_profiles: vec![
                entry(profile("steady", 1.0, 1.0), Common, &[]),
                entry(profile("loose", 0.8, 1.1), Common, &[Movement, Attack]),
                entry(profile("taut", 1.2, 0.9), Uncommon, &[]),
                entry(profile("surging", 1.4, 1.0), Rare, &[]),
                entry(profile("bastion", 1.6, 0.85), Epic, &[]),
                entry(profile("tidal", 1.8, 1.1), Legendary, &[]),
                entry(profile("singular", 2.0, 0.8), Mythic, &[]),
            ],
        }
    }
}

impl TraitCatalog {
    /// Parses a catalog from TOML and checks every role and tier is covered.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let catalog = toml::from_str::<Self>(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Fails on the first (role, rarity, category) cell without entries.
    pub fn validate(&self) -> Result<()> {
        for role in ParticleRole::ALL {
            for rarity in Rarity::ALL {
                for category in TraitCategory::ALL {
                    if self.count(category, role, rarity) == 0 {
                        return Err(CoreError::EmptyCatalog {
                            role,
                            rarity,
                            category,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of entries available to `role` at `rarity` in `category`.
    pub fn count(&self, category: TraitCategory, role: ParticleRole, rarity: Rarity) -> usize {
        fn n<T>(entries: &[CatalogEntry<T>], role: ParticleRole, rarity: Rarity) -> usize {
            entries.iter().filter(|e| e.matches(role, rarity)).count()
        }
        match category {
            TraitCategory::Shape => n(&self.shapes, role, rarity),
            TraitCategory::Color => n(&self.colors, role, rarity),
            TraitCategory::Formation => n(&self.formations, role, rarity),
            TraitCategory::Behavior => n(&self.behaviors, role, rarity),
            TraitCategory::ForceProfile => n(&self.force_profiles, role, rarity),
        }
    }

    /// Draws one value of `category` for `group`'s role at `rarity` and stores it.
    pub fn draw_into(
        &self,
        group: &mut ParticleGroup,
        category: TraitCategory,
        rarity: Rarity,
        rng: &mut SeededRng,
    ) -> Result<()> {
        let role = group.role;
        match category {
            TraitCategory::Shape => group.shape = *pick(&self.shapes, role, rarity, category, rng)?,
            TraitCategory::Color => group.color = *pick(&self.colors, role, rarity, category, rng)?,
            TraitCategory::Formation => {
                group.formation = *pick(&self.formations, role, rarity, category, rng)?
            }
            TraitCategory::Behavior => {
                group.behavior = *pick(&self.behaviors, role, rarity, category, rng)?
            }
            TraitCategory::ForceProfile => {
                group.force_profile =
                    pick(&self.force_profiles, role, rarity, category, rng)?.clone()
            }
        }
        Ok(())
    }
}

/// Weighted roll over `eligible` tiers using the base rarity weights.
///
/// With every tier eligible this is the plain 40/30/20/8/1.5/0.5 roll.
/// An empty `eligible` slice falls back to `Common`.
pub fn roll_rarity(rng: &mut SeededRng, eligible: &[Rarity]) -> Rarity {
    let weights: Vec<f64> = eligible.iter().map(|r| r.weight()).collect();
    rng.weighted_index(&weights)
        .map(|i| eligible[i])
        .unwrap_or(Rarity::Common)
}

/// Scale a group is born with at a given tier.
pub fn rarity_scale(rarity: Rarity) -> f64 {
    1.0 + 0.1 * rarity.index() as f64
}

/// Assigns rarity and all five trait categories to every group.
///
/// Groups are processed in canonical role order (ties broken by group id),
/// regardless of their order in the slice. Particles are not touched.
pub fn assign_traits(
    groups: &mut [ParticleGroup],
    catalog: &TraitCatalog,
    rng: &mut SeededRng,
) -> Result<()> {
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by_key(|&i| (groups[i].role.index(), groups[i].id));

    for i in order {
        let group = &mut groups[i];
        let rarity = roll_rarity(rng, &Rarity::ALL);
        group.rarity = rarity;
        for category in TraitCategory::ALL {
            catalog.draw_into(group, category, rarity, rng)?;
        }
        group.scale = rarity_scale(rarity);
        tracing::debug!(
            group = group.id,
            role = %group.role,
            rarity = %rarity,
            shape = ?group.shape,
            formation = ?group.formation,
            "Traits assigned"
        );
    }
    Ok(())
}
