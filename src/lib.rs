//! StarForge - deterministic procedural generation of populated stellar
//! neighborhoods
//!
//! Given a seed and a system count, the generator synthesizes a volumetric
//! cloud of stellar systems: single stars and binaries, planets and moons,
//! asteroid belts and rings, and staged civilizations on qualifying bodies.
//! The result is a tree-structured astronomical catalog for visualization
//! or simulation front-ends.

pub mod astro;
pub mod config;
pub mod consts;
pub mod error;
pub mod generators;
pub mod octree;
pub mod random;
pub mod tracks;
pub mod universe;

// Type aliases for clarity
pub type Vec3 = nalgebra::Vector3<f64>;
pub type Vec2 = nalgebra::Vector2<f64>;

// Re-export main types for convenience
pub use self::astro::{
    AsteroidCluster, BaryCenter, BodyRef, Civilization, CivilizationStage, LifePhase, Orbit,
    Planet, PlanetType, Star, StellarPhase, StellarSystem,
};
pub use self::config::GeneratorSettings;
pub use self::error::{GenerationFault, UniverseError};
pub use self::generators::{BasicProperties, OrbitalGenerator, StellarGenerator};
pub use self::octree::Octree;
pub use self::tracks::TrackLibrary;
pub use self::universe::{Catalog, Universe};
