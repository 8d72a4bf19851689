// Asteroid and artifact cluster data types

use crate::astro::civilization::CivilizationStage;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterForm {
    /// Heliocentric belt around a star or barycenter.
    Belt,
    /// Planetary ring inside the host's Roche limit.
    Ring,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterComposition {
    Rocky,
    Icy,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AsteroidCluster {
    pub name: String,
    pub form: ClusterForm,
    pub composition: ClusterComposition,
    pub total_mass_kg: f64,
    pub inner_radius_au: f64,
    pub outer_radius_au: f64,
    pub dust_fraction: f64,
}

/// Swarm of engineered objects left behind by a post-singularity
/// civilization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactCluster {
    pub name: String,
    pub total_mass_kg: f64,
    pub progenitor_stage: CivilizationStage,
}
