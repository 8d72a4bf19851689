// Planet data type

use crate::astro::civilization::Civilization;
use crate::consts;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanetType {
    Rocky,
    SubEarth,
    Ocean,
    IceGiant,
    GasGiant,
    HotJupiter,
    RoguePlanet,
}

impl PlanetType {
    pub fn is_giant(&self) -> bool {
        matches!(
            self,
            PlanetType::IceGiant | PlanetType::GasGiant | PlanetType::HotJupiter
        )
    }

    pub fn is_terrestrial(&self) -> bool {
        matches!(
            self,
            PlanetType::Rocky | PlanetType::SubEarth | PlanetType::Ocean
        )
    }
}

/// Volume fractions of the dominant atmospheric species. Not required to sum
/// to one; the remainder is trace gases.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AtmosphereComposition {
    pub h2_he: f64,
    pub n2: f64,
    pub o2: f64,
    pub co2: f64,
    pub h2o: f64,
    pub ch4: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub planet_type: PlanetType,
    pub mass_earth: f64,
    pub radius_earth: f64,

    // Layered mineral masses, kg
    pub core_mass_kg: f64,
    pub mantle_mass_kg: f64,
    pub atmosphere_mass_kg: f64,
    pub hydrosphere_mass_kg: f64,
    pub crust_mineral_mass_kg: f64,

    pub atmosphere: AtmosphereComposition,

    /// Radiative balance temperature, K
    pub balance_temp_k: f64,
    /// Surface temperature after greenhouse correction, K
    pub surface_temp_k: f64,
    pub albedo: f64,
    pub magnetic_field_t: f64,

    pub rotation_period_s: f64,
    pub tidally_locked: bool,

    /// Indices of satellites in the owning system's planet list.
    pub moons: Vec<usize>,
    /// Index of the ring cluster in the owning system's asteroid clusters.
    pub ring: Option<usize>,

    pub civilization: Option<Civilization>,
}

impl Planet {
    pub fn new(name: impl Into<String>, planet_type: PlanetType, mass_earth: f64) -> Self {
        Self {
            name: name.into(),
            planet_type,
            mass_earth,
            radius_earth: 0.0,
            core_mass_kg: 0.0,
            mantle_mass_kg: 0.0,
            atmosphere_mass_kg: 0.0,
            hydrosphere_mass_kg: 0.0,
            crust_mineral_mass_kg: 0.0,
            atmosphere: AtmosphereComposition::default(),
            balance_temp_k: 0.0,
            surface_temp_k: 0.0,
            albedo: 0.0,
            magnetic_field_t: 0.0,
            rotation_period_s: 0.0,
            tidally_locked: false,
            moons: Vec::new(),
            ring: None,
            civilization: None,
        }
    }

    pub fn mass_kg(&self) -> f64 {
        self.mass_earth * consts::EARTH_MASS
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_earth * consts::EARTH_RADIUS
    }

    pub fn surface_gravity_mps2(&self) -> f64 {
        let r = self.radius_m();
        if r > 0.0 {
            consts::G * self.mass_kg() / (r * r)
        } else {
            0.0
        }
    }

    pub fn has_life(&self) -> bool {
        self.civilization.as_ref().map_or(false, |c| c.has_life)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earth_analog_gravity() {
        let mut planet = Planet::new("test", PlanetType::Rocky, 1.0);
        planet.radius_earth = 1.0;
        let g = planet.surface_gravity_mps2();
        assert!((g - 9.8).abs() < 0.1);
    }

    #[test]
    fn type_predicates() {
        assert!(PlanetType::GasGiant.is_giant());
        assert!(PlanetType::Ocean.is_terrestrial());
        assert!(!PlanetType::RoguePlanet.is_terrestrial());
    }
}
