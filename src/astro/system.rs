// Stellar system tree: bary center, owned bodies, and orbits

use crate::astro::cluster::{ArtifactCluster, AsteroidCluster};
use crate::astro::planet::Planet;
use crate::astro::star::Star;
use crate::consts;
use crate::error::InvariantViolation;
use crate::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Inertial origin of a system: position in parsecs, orientation normal as
/// spherical (theta, phi), and the distance-rank ordinal from the universe
/// origin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaryCenter {
    pub name: String,
    pub position_pc: Vec3,
    pub normal: Vec2,
    pub distance_rank: usize,
}

impl BaryCenter {
    pub fn new(name: impl Into<String>, position_pc: Vec3, normal: Vec2) -> Self {
        Self {
            name: name.into(),
            position_pc,
            normal,
            distance_rank: 0,
        }
    }
}

/// Tagged, non-owning reference into the owning system's per-kind vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyRef {
    BaryCenter,
    Star(usize),
    Planet(usize),
    AsteroidCluster(usize),
    ArtifactCluster(usize),
}

/// One body riding an orbit, with its starting phase. `host_offset_rad` is
/// the fixed anomaly offset from the orbit's reference phase; mirrored
/// binary companions ride at pi.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OrbitalObject {
    pub body: BodyRef,
    pub initial_true_anomaly_rad: f64,
    pub host_offset_rad: f64,
}

impl OrbitalObject {
    pub fn new(body: BodyRef, initial_true_anomaly_rad: f64) -> Self {
        Self {
            body,
            initial_true_anomaly_rad,
            host_offset_rad: 0.0,
        }
    }

    pub fn with_offset(mut self, host_offset_rad: f64) -> Self {
        self.host_offset_rad = host_offset_rad;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Orbit {
    pub parent: BodyRef,
    pub objects: Vec<OrbitalObject>,
    /// Orbital-plane normal, spherical (theta, phi)
    pub normal: Vec2,
    /// Epoch, Julian days
    pub epoch_jd: f64,
    pub period_s: f64,
    pub semi_major_axis_au: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub longitude_of_ascending_node_rad: f64,
    pub argument_of_periapsis_rad: f64,
    pub true_anomaly_rad: f64,
}

impl Orbit {
    pub fn around(parent: BodyRef) -> Self {
        Self {
            parent,
            objects: Vec::new(),
            normal: Vec2::zeros(),
            epoch_jd: 0.0,
            period_s: 0.0,
            semi_major_axis_au: 0.0,
            eccentricity: 0.0,
            inclination_rad: 0.0,
            longitude_of_ascending_node_rad: 0.0,
            argument_of_periapsis_rad: 0.0,
            true_anomaly_rad: 0.0,
        }
    }
}

/// A generated system. Bodies are owned by the per-kind vectors; orbits
/// reference them by index and never own them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StellarSystem {
    pub bary: BaryCenter,
    pub stars: Vec<Star>,
    pub planets: Vec<Planet>,
    pub asteroid_clusters: Vec<AsteroidCluster>,
    pub artifact_clusters: Vec<ArtifactCluster>,
    pub orbits: Vec<Orbit>,
}

impl StellarSystem {
    pub fn new(bary: BaryCenter) -> Self {
        Self {
            bary,
            stars: Vec::new(),
            planets: Vec::new(),
            asteroid_clusters: Vec::new(),
            artifact_clusters: Vec::new(),
            orbits: Vec::new(),
        }
    }

    pub fn push_star(&mut self, star: Star) -> usize {
        self.stars.push(star);
        self.stars.len() - 1
    }

    pub fn push_planet(&mut self, planet: Planet) -> usize {
        self.planets.push(planet);
        self.planets.len() - 1
    }

    pub fn push_asteroid_cluster(&mut self, cluster: AsteroidCluster) -> usize {
        self.asteroid_clusters.push(cluster);
        self.asteroid_clusters.len() - 1
    }

    pub fn push_artifact_cluster(&mut self, cluster: ArtifactCluster) -> usize {
        self.artifact_clusters.push(cluster);
        self.artifact_clusters.len() - 1
    }

    pub fn total_star_mass_kg(&self) -> f64 {
        self.stars.iter().map(Star::mass_kg).sum()
    }

    /// Mass of the referenced body; the bary center weighs its stars.
    pub fn body_mass_kg(&self, body: BodyRef) -> Option<f64> {
        match body {
            BodyRef::BaryCenter => Some(self.total_star_mass_kg()),
            BodyRef::Star(i) => self.stars.get(i).map(Star::mass_kg),
            BodyRef::Planet(i) => self.planets.get(i).map(Planet::mass_kg),
            BodyRef::AsteroidCluster(i) => self.asteroid_clusters.get(i).map(|c| c.total_mass_kg),
            BodyRef::ArtifactCluster(i) => self.artifact_clusters.get(i).map(|c| c.total_mass_kg),
        }
    }

    /// The orbit carrying `body`, if any.
    pub fn host_orbit_of(&self, body: BodyRef) -> Option<&Orbit> {
        self.orbits
            .iter()
            .find(|o| o.objects.iter().any(|obj| obj.body == body))
    }

    fn in_bounds(&self, body: BodyRef) -> bool {
        match body {
            BodyRef::BaryCenter => true,
            BodyRef::Star(i) => i < self.stars.len(),
            BodyRef::Planet(i) => i < self.planets.len(),
            BodyRef::AsteroidCluster(i) => i < self.asteroid_clusters.len(),
            BodyRef::ArtifactCluster(i) => i < self.artifact_clusters.len(),
        }
    }

    /// Structural and physical invariant sweep. Checks reference bounds,
    /// single orbit membership, Kepler's third law per orbit, binary mass
    /// balance, and Hill-sphere containment for moons.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let fail = |msg: String| Err(InvariantViolation(msg));

        let mut star_orbit_count = vec![0usize; self.stars.len()];
        let mut planet_orbit_count = vec![0usize; self.planets.len()];

        for (oi, orbit) in self.orbits.iter().enumerate() {
            if !self.in_bounds(orbit.parent) {
                return fail(format!("orbit {oi} parent out of bounds"));
            }
            for obj in &orbit.objects {
                if !self.in_bounds(obj.body) {
                    return fail(format!("orbit {oi} object out of bounds"));
                }
                match obj.body {
                    BodyRef::Star(i) => star_orbit_count[i] += 1,
                    BodyRef::Planet(i) => planet_orbit_count[i] += 1,
                    BodyRef::BaryCenter => {
                        return fail(format!("orbit {oi} carries the bary center"));
                    }
                    _ => {}
                }
            }

            for (name, v) in [
                ("period", orbit.period_s),
                ("semi-major axis", orbit.semi_major_axis_au),
                ("eccentricity", orbit.eccentricity),
                ("inclination", orbit.inclination_rad),
            ] {
                if !v.is_finite() {
                    return fail(format!("orbit {oi} has non-finite {name}"));
                }
            }

            // Kepler's third law against the stated parent mass. Binary
            // arms share the pair's period, which Kepler ties to the
            // combined separation; they are checked in
            // validate_binary_balance instead.
            let is_binary_arm = orbit.parent == BodyRef::BaryCenter
                && orbit
                    .objects
                    .iter()
                    .any(|obj| matches!(obj.body, BodyRef::Star(_)));
            let parent_mass = self
                .body_mass_kg(orbit.parent)
                .expect("parent bounds checked above");
            if !is_binary_arm && parent_mass > 0.0 && orbit.semi_major_axis_au > 0.0 {
                let expected = consts::orbital_period_s(
                    orbit.semi_major_axis_au * consts::AU,
                    parent_mass,
                );
                let rel = (orbit.period_s - expected).abs() / expected;
                if rel > 1e-3 {
                    return fail(format!(
                        "orbit {oi} violates Kepler's third law (relative error {rel:.2e})"
                    ));
                }
            }
        }

        for (i, n) in planet_orbit_count.iter().enumerate() {
            if *n != 1 {
                return fail(format!("planet {i} appears on {n} orbits"));
            }
        }
        if self.stars.len() == 2 {
            for (i, n) in star_orbit_count.iter().enumerate() {
                if *n != 1 {
                    return fail(format!("binary star {i} appears on {n} orbits"));
                }
            }
            self.validate_binary_balance()?;
        }

        self.validate_moons()?;
        Ok(())
    }

    fn validate_binary_balance(&self) -> Result<(), InvariantViolation> {
        let mut arms: Vec<(f64, f64, f64)> = Vec::new();
        for orbit in &self.orbits {
            if orbit.parent != BodyRef::BaryCenter {
                continue;
            }
            for obj in &orbit.objects {
                if let BodyRef::Star(i) = obj.body {
                    arms.push((
                        orbit.semi_major_axis_au,
                        self.stars[i].mass_sol,
                        orbit.period_s,
                    ));
                }
            }
        }
        if arms.len() == 2 {
            let (a1, m1, p1) = arms[0];
            let (a2, m2, p2) = arms[1];
            let rel = (a1 * m1 - a2 * m2).abs() / (a1 * m1).max(f64::MIN_POSITIVE);
            if rel > 1e-6 {
                return Err(InvariantViolation(format!(
                    "binary mass balance broken (relative error {rel:.2e})"
                )));
            }

            // The arms share one period, tied by Kepler to the combined
            // separation and total mass.
            if p1 != p2 {
                return Err(InvariantViolation(
                    "binary arms carry different periods".into(),
                ));
            }
            let expected = consts::orbital_period_s(
                (a1 + a2) * consts::AU,
                self.total_star_mass_kg(),
            );
            let rel = (p1 - expected).abs() / expected;
            if rel > 1e-3 {
                return Err(InvariantViolation(format!(
                    "binary period violates Kepler's third law (relative error {rel:.2e})"
                )));
            }
        }
        Ok(())
    }

    fn validate_moons(&self) -> Result<(), InvariantViolation> {
        let star_mass = self.total_star_mass_kg();
        for orbit in &self.orbits {
            let BodyRef::Planet(host) = orbit.parent else {
                continue;
            };
            // Moons only; a ring cluster sits inside the Roche limit and is
            // trivially inside the Hill sphere as well.
            let host_orbit = match self.host_orbit_of(BodyRef::Planet(host)) {
                Some(o) => o,
                None => continue,
            };
            let hill_au = consts::hill_radius_au(
                host_orbit.semi_major_axis_au,
                self.planets[host].mass_kg(),
                star_mass,
            );
            if orbit.semi_major_axis_au >= hill_au {
                return Err(InvariantViolation(format!(
                    "satellite orbit at {} AU escapes the Hill sphere ({} AU) of planet {}",
                    orbit.semi_major_axis_au, hill_au, host
                )));
            }
        }
        Ok(())
    }
}
