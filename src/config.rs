// Generator configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Enumerated knobs of the generation pipeline. `validate` refuses
/// out-of-range values at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Age of the universe in years; upper bound for sampled stellar ages.
    pub universe_age: f64,
    /// Mean of the binary orbital period distribution, log10(days).
    pub binary_period_mean: f64,
    /// Sigma of the binary orbital period distribution, log10(days).
    pub binary_period_sigma: f64,
    /// Upper mass limit for a single asteroid belt, kg.
    pub asteroid_upper_limit: f64,
    /// Bernoulli probability that life emerges on a habitable terrestrial.
    pub life_occurrence_probability: f64,
    /// Intersect the habitable zone with the ultraviolet habitable band.
    pub contain_ultraviolet_habitable_zone: bool,
    /// Allow the ASI filter branch for Cenozoic-phase planets.
    pub enable_asi_filter: bool,
    /// Bernoulli probability that an established civilization is flagged as
    /// destroyed by disaster.
    pub destroyed_by_disaster_probability: f64,
    /// Planet slot migration probability (hot-Jupiter promotion).
    pub migration_probability: f64,
    /// Planet scattering probability (ejection to a distant orbit).
    pub scattering_probability: f64,
    /// Walk-in probability (neighbouring slots swap).
    pub walk_in_probability: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            universe_age: 1.38e10,
            binary_period_mean: 5.03,
            binary_period_sigma: 2.28,
            asteroid_upper_limit: 1e21,
            life_occurrence_probability: 0.011_451_4,
            contain_ultraviolet_habitable_zone: false,
            enable_asi_filter: true,
            destroyed_by_disaster_probability: 1e-3,
            migration_probability: 0.1,
            scattering_probability: 0.05,
            walk_in_probability: 0.1,
        }
    }
}

impl GeneratorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("universe_age", self.universe_age),
            ("binary_period_sigma", self.binary_period_sigma),
            ("asteroid_upper_limit", self.asteroid_upper_limit),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name });
            }
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if !self.binary_period_mean.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "binary_period_mean",
            });
        }

        for (name, value) in [
            (
                "life_occurrence_probability",
                self.life_occurrence_probability,
            ),
            (
                "destroyed_by_disaster_probability",
                self.destroyed_by_disaster_probability,
            ),
            ("migration_probability", self.migration_probability),
            ("scattering_probability", self.scattering_probability),
            ("walk_in_probability", self.walk_in_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::NotAProbability { name, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GeneratorSettings::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_probability() {
        let mut settings = GeneratorSettings::default();
        settings.life_occurrence_probability = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::NotAProbability { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_age() {
        let mut settings = GeneratorSettings::default();
        settings.universe_age = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::NonPositive { .. })
        ));
    }
}
