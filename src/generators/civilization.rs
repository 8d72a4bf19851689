// Civilization generator: life phases layered onto habitable planets

use crate::astro::civilization::{Civilization, LifePhase};
use crate::astro::planet::Planet;
use crate::config::GeneratorSettings;
use crate::error::ConfigError;
use crate::random::{Engine, Sampler, SeedSequence};
use tracing::trace;

// Stage advance tables, cumulative-scanned against one uniform draw.
const CENOZOIC_STAGE_TABLE: [f64; 7] = [0.02, 0.005, 1e-4, 1e-6, 5e-7, 4e-7, 1e-6];
const ASI_STAGE_TABLE: [f64; 7] = [0.2, 0.05, 1e-3, 1e-5, 1e-4, 1e-4, 1e-4];

/// Phase rung duration, years.
const PHASE_STEP_YEARS: f64 = 5.0e8;

pub struct CivilizationGenerator {
    engine: Engine,
    life_occurrence: Sampler,
    asi_filter: Sampler,
    disaster: Sampler,
    common: Sampler,
}

impl CivilizationGenerator {
    pub fn new(
        seeds: &mut SeedSequence,
        settings: &GeneratorSettings,
    ) -> Result<Self, ConfigError> {
        let asi_probability = if settings.enable_asi_filter { 0.2 } else { 0.0 };
        Ok(Self {
            engine: seeds.next_engine(),
            life_occurrence: Sampler::bernoulli(settings.life_occurrence_probability)?,
            asi_filter: Sampler::bernoulli(asi_probability)?,
            disaster: Sampler::bernoulli(settings.destroyed_by_disaster_probability)?,
            common: Sampler::uniform_real(0.0, 1.0),
        })
    }

    /// Rolls life for one habitable terrestrial planet and, on success,
    /// attaches its civilization record. The draw order is fixed: life
    /// gate, age multiplier, mineral bonus + ASI filter, stage walk, stage
    /// fraction, disaster.
    pub fn generate_civilization(&mut self, star_age_years: f64, planet: &mut Planet) {
        if !self.life_occurrence.occurs(&mut self.engine) {
            return;
        }

        let multiplier = 2.0 + self.common.draw(&mut self.engine);
        let age_index = (multiplier * star_age_years / PHASE_STEP_YEARS) as i64;
        let mut phase = LifePhase::from_age_index(age_index.clamp(1, 4));

        let mut asi_filtered = false;
        if phase == LifePhase::CenozoicEra {
            let mineral_bonus = 1.0 + self.common.draw(&mut self.engine) * 999.0;
            if self.asi_filter.occurs(&mut self.engine) {
                phase = LifePhase::SatTeeTouyByAsi;
                asi_filtered = true;
                planet.crust_mineral_mass_kg += mineral_bonus * 1e16;
            } else {
                planet.crust_mineral_mass_kg += mineral_bonus * 1e15;
            }
        }

        let table = match phase {
            LifePhase::CenozoicEra => Some(&CENOZOIC_STAGE_TABLE),
            LifePhase::SatTeeTouyByAsi => Some(&ASI_STAGE_TABLE),
            _ => None,
        };

        let mut progress = 0.0;
        if let Some(table) = table {
            let roll = self.common.draw(&mut self.engine);
            let mut stage = 0;
            let mut cumulative = 0.0;
            for (i, p) in table.iter().enumerate() {
                cumulative += p;
                if roll < cumulative {
                    stage = i + 1;
                    break;
                }
            }

            // Running off the end of the table promotes the branch.
            if stage >= 7 {
                phase = match phase {
                    LifePhase::CenozoicEra => LifePhase::SatTeeTouy,
                    LifePhase::SatTeeTouyByAsi => LifePhase::NewCivilization,
                    other => other,
                };
            }

            progress = stage as f64 + self.common.draw(&mut self.engine);
        }

        let destroyed = self.disaster.occurs(&mut self.engine);

        trace!(?phase, progress, destroyed, "life emerged");
        planet.civilization = Some(Civilization {
            life_phase: phase,
            progress,
            has_life: true,
            destroyed_by_disaster: destroyed,
            asi_filtered,
        });
    }
}
