// Star data type and Morgan-Keenan classification helpers

use crate::consts;
use serde::{Deserialize, Serialize};

/// Position on the evolutionary track, ordered by the track phase index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StellarPhase {
    PreMainSequence,
    MainSequence,
    Subgiant,
    RedGiantBranch,
    CoreHeliumBurning,
    EarlyAsymptoticGiantBranch,
    ThermallyPulsingAgb,
    PostAgb,
    WhiteDwarf,
    NeutronStar,
    BlackHole,
}

impl StellarPhase {
    /// Maps the track file's numeric phase column.
    pub fn from_track_index(index: u32) -> Self {
        match index {
            0 => StellarPhase::PreMainSequence,
            1 => StellarPhase::MainSequence,
            2 => StellarPhase::Subgiant,
            3 => StellarPhase::RedGiantBranch,
            4 => StellarPhase::CoreHeliumBurning,
            5 => StellarPhase::EarlyAsymptoticGiantBranch,
            6 => StellarPhase::ThermallyPulsingAgb,
            _ => StellarPhase::PostAgb,
        }
    }

    pub fn is_remnant(&self) -> bool {
        matches!(
            self,
            StellarPhase::WhiteDwarf | StellarPhase::NeutronStar | StellarPhase::BlackHole
        )
    }
}

/// Rotation state. Compact objects past the photon-sphere regime carry the
/// dimensionless Kerr parameter instead of a period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StellarSpin {
    RotationPeriodS(f64),
    Dimensionless(f64),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Star {
    pub name: String,
    pub age_years: f64,
    pub initial_mass_sol: f64,
    pub mass_sol: f64,
    /// Metallicity [Fe/H]
    pub feh: f64,
    pub eff_temp_k: f64,
    pub luminosity_sol: f64,
    pub radius_m: f64,
    pub abs_magnitude: f64,
    pub spin: StellarSpin,
    pub oblateness: f64,
    pub escape_velocity_mps: f64,
    pub surface_gravity_mps2: f64,
    pub magnetic_field_t: f64,
    pub wind_mass_loss_rate_sol_yr: f64,
    pub wind_speed_mps: f64,
    pub phase: StellarPhase,
    pub stellar_class: String,
    pub is_single: bool,
    /// Set when no evolutionary track covered the star and the zero-age
    /// main-sequence estimate was used instead.
    pub track_fallback: bool,
}

impl Star {
    pub fn mass_kg(&self) -> f64 {
        self.mass_sol * consts::SOLAR_MASS
    }

    pub fn luminosity_w(&self) -> f64 {
        self.luminosity_sol * consts::SOLAR_LUMINOSITY
    }
}

/// Spectral letter and subclass from the effective temperature.
pub fn spectral_type_from_teff(teff_k: f64) -> (char, u8) {
    // (letter, cold bound, hot bound) per main-sequence calibration
    const BANDS: [(char, f64, f64); 7] = [
        ('M', 2400.0, 3700.0),
        ('K', 3700.0, 5200.0),
        ('G', 5200.0, 6000.0),
        ('F', 6000.0, 7500.0),
        ('A', 7500.0, 10000.0),
        ('B', 10000.0, 30000.0),
        ('O', 30000.0, 60000.0),
    ];

    for (letter, cold, hot) in BANDS {
        if teff_k < hot || letter == 'O' {
            // Subclass 9 at the cold edge down to 0 at the hot edge.
            let frac = ((hot - teff_k) / (hot - cold)).clamp(0.0, 0.999);
            return (letter, (frac * 10.0) as u8);
        }
    }
    ('O', 0)
}

/// Luminosity class from the radius, in solar units.
pub fn luminosity_class_from_radius(radius_sol: f64) -> &'static str {
    if radius_sol < 0.05 {
        "VII"
    } else if radius_sol > 100.0 {
        "I"
    } else if radius_sol > 25.0 {
        "II"
    } else if radius_sol > 6.0 {
        "III"
    } else if radius_sol > 2.5 {
        "IV"
    } else {
        "V"
    }
}

/// Full Morgan-Keenan string, e.g. "G2V".
pub fn mk_class(teff_k: f64, radius_sol: f64, phase: StellarPhase) -> String {
    match phase {
        StellarPhase::WhiteDwarf => format!("D{}", spectral_type_from_teff(teff_k).1),
        StellarPhase::NeutronStar => "Q".to_string(),
        StellarPhase::BlackHole => "X".to_string(),
        _ => {
            let (letter, subclass) = spectral_type_from_teff(teff_k);
            format!("{}{}{}", letter, subclass, luminosity_class_from_radius(radius_sol))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sun_is_a_g2_dwarf() {
        let (letter, subclass) = spectral_type_from_teff(5772.0);
        assert_eq!(letter, 'G');
        assert!(subclass <= 3);
        assert_eq!(luminosity_class_from_radius(1.0), "V");
        assert_eq!(mk_class(5772.0, 1.0, StellarPhase::MainSequence), format!("G{}V", subclass));
    }

    #[test]
    fn hot_stars_classify_early() {
        let (letter, _) = spectral_type_from_teff(35000.0);
        assert_eq!(letter, 'O');
        let (letter, _) = spectral_type_from_teff(12000.0);
        assert_eq!(letter, 'B');
    }

    #[test]
    fn giants_get_giant_classes() {
        assert_eq!(luminosity_class_from_radius(50.0), "II");
        assert_eq!(luminosity_class_from_radius(10.0), "III");
        assert_eq!(luminosity_class_from_radius(300.0), "I");
        assert_eq!(luminosity_class_from_radius(0.01), "VII");
    }

    #[test]
    fn phase_ordering_tracks_evolution() {
        assert!(StellarPhase::MainSequence < StellarPhase::PostAgb);
        assert!(StellarPhase::from_track_index(9).is_remnant() == false);
        assert!(StellarPhase::BlackHole.is_remnant());
    }
}
