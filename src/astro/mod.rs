// Entity model: data-only types for the generated system trees

pub mod civilization;
pub mod cluster;
pub mod planet;
pub mod star;
pub mod system;

pub use self::civilization::{Civilization, CivilizationStage, LifePhase};
pub use self::cluster::{ArtifactCluster, AsteroidCluster, ClusterComposition, ClusterForm};
pub use self::planet::{AtmosphereComposition, Planet, PlanetType};
pub use self::star::{Star, StellarPhase, StellarSpin};
pub use self::system::{BaryCenter, BodyRef, Orbit, OrbitalObject, StellarSystem};
