// Civilization data: life phases and the developmental stage ladder

use serde::{Deserialize, Serialize};

/// Biological/civilizational phase of a living planet. The age model walks
/// the first four rungs; the post-singularity branches are reached through
/// the stage tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifePhase {
    None,
    Microbial,
    Multicellular,
    Vertebrate,
    CenozoicEra,
    /// Post-singularity civilization.
    SatTeeTouy,
    /// Post-singularity reached through the ASI filter: the biological
    /// substrate did not survive.
    SatTeeTouyByAsi,
    NewCivilization,
}

impl LifePhase {
    pub fn from_age_index(index: i64) -> Self {
        match index {
            1 => LifePhase::Microbial,
            2 => LifePhase::Multicellular,
            3 => LifePhase::Vertebrate,
            4 => LifePhase::CenozoicEra,
            _ => LifePhase::None,
        }
    }

    /// Phases whose planets may carry a non-zero civilization progress.
    pub fn supports_civilization(&self) -> bool {
        matches!(
            self,
            LifePhase::CenozoicEra
                | LifePhase::SatTeeTouy
                | LifePhase::SatTeeTouyByAsi
                | LifePhase::NewCivilization
        )
    }
}

/// Developmental stage; the integer part of the civilization progress float.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CivilizationStage {
    None,
    CarbonBasedIntelligence,
    PrimitiveSociety,
    PreIndustrial,
    SteamAge,
    ElectricAge,
    AtomicAge,
    DigitalAge,
    PreAsi,
}

impl CivilizationStage {
    pub fn from_progress(progress: f64) -> Self {
        match progress as i64 {
            i if i <= 0 => CivilizationStage::None,
            1 => CivilizationStage::CarbonBasedIntelligence,
            2 => CivilizationStage::PrimitiveSociety,
            3 => CivilizationStage::PreIndustrial,
            4 => CivilizationStage::SteamAge,
            5 => CivilizationStage::ElectricAge,
            6 => CivilizationStage::AtomicAge,
            7 => CivilizationStage::DigitalAge,
            _ => CivilizationStage::PreAsi,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Civilization {
    pub life_phase: LifePhase,
    /// Integer part: developmental stage; fractional part: progression
    /// within the stage.
    pub progress: f64,
    pub has_life: bool,
    pub destroyed_by_disaster: bool,
    pub asi_filtered: bool,
}

impl Civilization {
    pub fn lifeless() -> Self {
        Self {
            life_phase: LifePhase::None,
            progress: 0.0,
            has_life: false,
            destroyed_by_disaster: false,
            asi_filtered: false,
        }
    }

    pub fn stage(&self) -> CivilizationStage {
        CivilizationStage::from_progress(self.progress)
    }
}
