// Stellar generator: IMF sampling and evolutionary-track interpolation

use crate::astro::star::{mk_class, Star, StellarPhase, StellarSpin};
use crate::config::GeneratorSettings;
use crate::consts;
use crate::error::ConfigError;
use crate::random::{Engine, Sampler, SeedSequence};
use crate::tracks::{self, TrackLibrary, TrackPoint};
use std::sync::Arc;
use tracing::trace;

/// IMF domain bounds, solar masses.
const IMF_MIN_MASS: f64 = 0.08;
const IMF_MAX_MASS: f64 = 120.0;

/// Progenitor mass thresholds for compact remnants, solar masses.
const NEUTRON_STAR_THRESHOLD: f64 = 8.0;
const BLACK_HOLE_THRESHOLD: f64 = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StarTypeOption {
    #[default]
    Normal,
    /// Force the star onto the giant branch.
    Giant,
    /// Force a compact remnant.
    DeathStar,
    /// Merger product: doubled progenitor mass, reset age.
    MergeStar,
}

/// Caller-specified inputs; unset fields are sampled.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicProperties {
    pub age_years: Option<f64>,
    pub feh: Option<f64>,
    pub initial_mass_sol: Option<f64>,
    pub type_option: StarTypeOption,
}

impl BasicProperties {
    pub fn fixed(age_years: f64, feh: f64, initial_mass_sol: f64) -> Self {
        Self {
            age_years: Some(age_years),
            feh: Some(feh),
            initial_mass_sol: Some(initial_mass_sol),
            type_option: StarTypeOption::Normal,
        }
    }
}

/// Kroupa IMF restricted to [0.08, 120] solar masses: alpha = 1.3 below
/// 0.5 M_sun and 2.3 above it. The alpha = 0.3 brown-dwarf segment lies
/// entirely below the domain floor.
#[derive(Clone, Debug)]
struct KroupaImf {
    breaks: [f64; 3],
    exponents: [f64; 2],
    // cumulative segment weights, normalized to 1
    cumulative: [f64; 2],
}

impl KroupaImf {
    fn new() -> Self {
        let breaks = [IMF_MIN_MASS, 0.5, IMF_MAX_MASS];
        let exponents = [1.3, 2.3];

        // Piecewise continuity scale factors, then segment integrals.
        let mut scale = 1.0;
        let mut integrals = [0.0; 2];
        for i in 0..2 {
            if i > 0 {
                scale *= breaks[i].powf(exponents[i] - exponents[i - 1]);
            }
            let a = 1.0 - exponents[i];
            integrals[i] = scale * (breaks[i + 1].powf(a) - breaks[i].powf(a)) / a;
        }
        let total: f64 = integrals.iter().sum();
        let mut cumulative = [0.0; 2];
        let mut acc = 0.0;
        for i in 0..2 {
            acc += integrals[i] / total;
            cumulative[i] = acc;
        }

        Self {
            breaks,
            exponents,
            cumulative,
        }
    }

    /// Inverse-CDF sample from one uniform draw.
    fn sample(&self, u: f64) -> f64 {
        let segment = usize::from(u > self.cumulative[0]);
        let lo = if segment == 0 {
            0.0
        } else {
            self.cumulative[segment - 1]
        };
        let t = ((u - lo) / (self.cumulative[segment] - lo)).clamp(0.0, 1.0);

        let a = 1.0 - self.exponents[segment];
        let m0 = self.breaks[segment].powf(a);
        let m1 = self.breaks[segment + 1].powf(a);
        (m0 + t * (m1 - m0)).powf(1.0 / a)
    }
}

pub struct StellarGenerator {
    engine: Engine,
    imf: KroupaImf,
    age_sampler: Sampler,
    feh_sampler: Sampler,
    mass_ratio_sampler: Sampler,
    common: Sampler,
    universe_age: f64,
    tracks: Arc<TrackLibrary>,
}

impl StellarGenerator {
    pub fn new(
        seeds: &mut SeedSequence,
        settings: &GeneratorSettings,
        tracks: Arc<TrackLibrary>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            engine: seeds.next_engine(),
            imf: KroupaImf::new(),
            age_sampler: Sampler::normal(5.0e9, 4.0e9)?,
            feh_sampler: Sampler::normal(-0.12, 0.3)?,
            mass_ratio_sampler: Sampler::uniform_real(0.1, 1.0),
            common: Sampler::uniform_real(0.0, 1.0),
            universe_age: settings.universe_age,
            tracks,
        })
    }

    /// Samples the unspecified basic properties of a primary and, when the
    /// binary fraction fires, its companion. The companion mass follows a
    /// uniform ratio q in (0.1, 1).
    pub fn generate_basic_properties(&mut self) -> (BasicProperties, Option<BasicProperties>) {
        let age = self.sample_age();
        let feh = self.feh_sampler.draw(&mut self.engine).clamp(-2.0, 0.6);
        let mass = self
            .imf
            .sample(self.common.draw(&mut self.engine))
            .clamp(IMF_MIN_MASS, IMF_MAX_MASS);

        let primary = BasicProperties {
            age_years: Some(age),
            feh: Some(feh),
            initial_mass_sol: Some(mass),
            type_option: StarTypeOption::Normal,
        };

        let is_binary = self.common.draw(&mut self.engine) < binary_fraction(mass);
        let secondary = is_binary.then(|| {
            let q = self.mass_ratio_sampler.draw(&mut self.engine);
            BasicProperties {
                age_years: Some(age),
                feh: Some(feh),
                initial_mass_sol: Some((mass * q).max(IMF_MIN_MASS)),
                type_option: StarTypeOption::Normal,
            }
        });

        (primary, secondary)
    }

    fn sample_age(&mut self) -> f64 {
        // Truncated Gaussian: reject out-of-range draws, clamp as a last
        // resort so the draw count stays bounded.
        for _ in 0..16 {
            let age = self.age_sampler.draw(&mut self.engine);
            if (1.0e7..=self.universe_age).contains(&age) {
                return age;
            }
        }
        self.age_sampler
            .draw(&mut self.engine)
            .clamp(1.0e7, self.universe_age)
    }

    /// Produces a fully populated star. Missing basic properties are
    /// sampled; masses outside the IMF domain are clamped; a track miss
    /// falls back to the flagged zero-age estimate.
    pub fn generate_star(&mut self, properties: BasicProperties) -> Star {
        let mut age = properties.age_years.unwrap_or_else(|| self.sample_age());
        let feh = properties
            .feh
            .unwrap_or_else(|| self.feh_sampler.draw(&mut self.engine))
            .clamp(-2.0, 0.6);
        let mut initial_mass = properties
            .initial_mass_sol
            .unwrap_or_else(|| self.imf.sample(self.common.draw(&mut self.engine)))
            .clamp(IMF_MIN_MASS, IMF_MAX_MASS);

        match properties.type_option {
            StarTypeOption::Normal => {}
            StarTypeOption::Giant => {
                // Land the age on the giant branch of this mass.
                let lifetime = tracks::main_sequence_lifetime_years(initial_mass);
                age = lifetime * (1.0 + 0.1 * self.common.draw(&mut self.engine));
            }
            StarTypeOption::DeathStar => {
                let lifetime = tracks::main_sequence_lifetime_years(initial_mass);
                age = (lifetime * 2.0).max(1.0e8);
            }
            StarTypeOption::MergeStar => {
                initial_mass = (initial_mass * 2.0).min(IMF_MAX_MASS);
            }
        }

        let (point, fallback) = self.lookup(initial_mass, feh, age);
        let mut phase = StellarPhase::from_track_index(point.phase_index);

        // Past the end of the track the star has shed its envelope.
        let expired = point.clamped
            || phase >= StellarPhase::PostAgb
            || age > tracks::main_sequence_lifetime_years(initial_mass) * 1.3;
        if expired {
            return self.remnant(initial_mass, feh, age, fallback);
        }

        let mass_kg = point.mass_sol * consts::SOLAR_MASS;
        let radius_m = point.radius_sol * consts::SOLAR_RADIUS;
        let escape_velocity = (2.0 * consts::G * mass_kg / radius_m).sqrt();
        let surface_gravity = consts::G * mass_kg / (radius_m * radius_m);

        let rotation_period = self.sample_rotation_period(point.mass_sol, age);
        let omega = 2.0 * std::f64::consts::PI / rotation_period;
        let oblateness =
            (omega * omega * radius_m.powi(3) / (2.0 * consts::G * mass_kg)).min(0.5);

        if phase == StellarPhase::PreMainSequence && age > 1.0e8 {
            phase = StellarPhase::MainSequence;
        }

        let star = Star {
            name: String::new(),
            age_years: age,
            initial_mass_sol: initial_mass,
            mass_sol: point.mass_sol,
            feh,
            eff_temp_k: point.teff_k,
            luminosity_sol: point.luminosity_sol,
            radius_m,
            abs_magnitude: 4.74 - 2.5 * point.luminosity_sol.max(1e-12).log10(),
            spin: StellarSpin::RotationPeriodS(rotation_period),
            oblateness,
            escape_velocity_mps: escape_velocity,
            surface_gravity_mps2: surface_gravity,
            magnetic_field_t: self.sample_magnetic_field(point.teff_k),
            wind_mass_loss_rate_sol_yr: mass_loss_rate(
                point.luminosity_sol,
                point.radius_sol,
                point.mass_sol,
                point.teff_k,
            ),
            wind_speed_mps: wind_speed(escape_velocity, point.teff_k),
            phase,
            stellar_class: mk_class(point.teff_k, point.radius_sol, phase),
            is_single: true,
            track_fallback: fallback,
        };
        trace!(
            mass = star.mass_sol,
            teff = star.eff_temp_k,
            class = %star.stellar_class,
            "generated star"
        );
        star
    }

    fn lookup(&self, initial_mass: f64, feh: f64, age: f64) -> (TrackPoint, bool) {
        if let Some(table) = self.tracks.nearest(feh) {
            if let Some(point) = table.interpolate(initial_mass, age) {
                return (point, false);
            }
        }
        (tracks::zams_estimate(initial_mass), true)
    }

    fn remnant(&mut self, initial_mass: f64, feh: f64, age: f64, fallback: bool) -> Star {
        let (phase, mass_sol, radius_m, teff, spin) = if initial_mass >= BLACK_HOLE_THRESHOLD {
            let mass = (initial_mass * 0.25).max(3.0);
            let radius = 2.0 * consts::G * mass * consts::SOLAR_MASS
                / (299_792_458.0_f64 * 299_792_458.0);
            let spin = StellarSpin::Dimensionless(0.998 * self.common.draw(&mut self.engine));
            (StellarPhase::BlackHole, mass, radius, 0.0, spin)
        } else if initial_mass >= NEUTRON_STAR_THRESHOLD {
            let mass = 1.4 + 0.6 * self.common.draw(&mut self.engine);
            let period = 0.01 + 2.0 * self.common.draw(&mut self.engine);
            (
                StellarPhase::NeutronStar,
                mass,
                1.2e4,
                6.0e5,
                StellarSpin::RotationPeriodS(period),
            )
        } else {
            // Initial-final mass relation for white dwarfs.
            let mass = (0.109 * initial_mass + 0.394).min(1.44);
            let radius = 0.0126 * consts::SOLAR_RADIUS * (mass / 0.6_f64).powf(-1.0 / 3.0);
            let teff = 6.0e3 + 2.4e4 * self.common.draw(&mut self.engine);
            let period = consts::SECONDS_PER_DAY * (0.1 + 2.0 * self.common.draw(&mut self.engine));
            (
                StellarPhase::WhiteDwarf,
                mass,
                radius,
                teff,
                StellarSpin::RotationPeriodS(period),
            )
        };

        let mass_kg = mass_sol * consts::SOLAR_MASS;
        let escape_velocity = (2.0 * consts::G * mass_kg / radius_m).sqrt();
        let radius_sol = radius_m / consts::SOLAR_RADIUS;
        let luminosity = if teff > 0.0 {
            radius_sol * radius_sol * (teff / consts::SOLAR_TEFF).powi(4)
        } else {
            0.0
        };

        Star {
            name: String::new(),
            age_years: age,
            initial_mass_sol: initial_mass,
            mass_sol,
            feh,
            eff_temp_k: teff,
            luminosity_sol: luminosity,
            radius_m,
            abs_magnitude: 4.74 - 2.5 * luminosity.max(1e-12).log10(),
            spin,
            oblateness: 0.0,
            escape_velocity_mps: escape_velocity,
            surface_gravity_mps2: consts::G * mass_kg / (radius_m * radius_m),
            magnetic_field_t: match phase {
                StellarPhase::NeutronStar => 1.0e8,
                StellarPhase::WhiteDwarf => 100.0,
                _ => 0.0,
            },
            wind_mass_loss_rate_sol_yr: 0.0,
            wind_speed_mps: 0.0,
            phase,
            stellar_class: mk_class(teff, radius_sol, phase),
            is_single: true,
            track_fallback: fallback,
        }
    }

    /// Rotation period in seconds: lognormal-shaped around ~20 days for a
    /// solar mass, spinning up with mass.
    fn sample_rotation_period(&mut self, mass_sol: f64, age_years: f64) -> f64 {
        let base_days = 20.0 * mass_sol.powf(-0.6);
        // Magnetic braking: old stars rotate slower.
        let braking = (age_years / 5.0e9).max(0.1).powf(0.5);
        let jitter = 2.0_f64.powf(2.0 * self.common.draw(&mut self.engine) - 1.0);
        (base_days * braking * jitter).max(0.1) * consts::SECONDS_PER_DAY
    }

    fn sample_magnetic_field(&mut self, teff_k: f64) -> f64 {
        // Convective stars dynamo harder; radiative envelopes run fossil
        // fields.
        let base = if teff_k < 4000.0 {
            2.0e-2
        } else if teff_k < 6500.0 {
            5.0e-4
        } else {
            1.0e-2
        };
        base * 10.0_f64.powf(self.common.draw(&mut self.engine) - 0.5)
    }
}

/// Mass-dependent multiplicity fraction.
pub fn binary_fraction(mass_sol: f64) -> f64 {
    (0.45 + 0.25 * mass_sol.max(0.05).log10()).clamp(0.2, 0.85)
}

/// Reimers mass loss; Vink-style boost for hot luminous stars. Solar masses
/// per year.
fn mass_loss_rate(luminosity_sol: f64, radius_sol: f64, mass_sol: f64, teff_k: f64) -> f64 {
    let reimers = 4.0e-13 * 0.5 * luminosity_sol * radius_sol / mass_sol.max(0.08);
    if luminosity_sol > 1.0e4 && teff_k > 12_500.0 {
        let vink = 1.0e-7 * (luminosity_sol / 1.0e5).powf(2.2) * (mass_sol / 30.0).powf(-1.3);
        reimers.max(vink)
    } else {
        reimers
    }
}

fn wind_speed(escape_velocity_mps: f64, teff_k: f64) -> f64 {
    if teff_k > 12_500.0 {
        2.6 * escape_velocity_mps
    } else {
        escape_velocity_mps
    }
}
