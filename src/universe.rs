// Universe driver: parallel system synthesis over a shared octree

use crate::astro::system::{BaryCenter, StellarSystem};
use crate::config::GeneratorSettings;
use crate::error::{FaultReason, GenerationFault, UniverseError};
use crate::generators::{OrbitalGenerator, StellarGenerator};
use crate::octree::Octree;
use crate::random::{self, SeedSequence};
use crate::tracks::TrackLibrary;
use crate::{Vec2, Vec3};
use rand::Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Minimum separation between system bary centers, parsecs.
const MIN_SEPARATION_PC: f64 = 0.5;

/// Placement rejection attempts per system.
const PLACEMENT_ATTEMPTS: usize = 128;

/// Per-system rebuild budget.
const DEFAULT_RETRY_BUDGET: u64 = 8;

/// Finished catalog: the flat list of generated system trees plus the
/// aggregate bookkeeping the driver kept along the way.
#[derive(Debug, Serialize)]
pub struct Catalog {
    pub seed: u64,
    pub systems: Vec<StellarSystem>,
    pub skipped: usize,
    /// Star counts keyed by spectral letter.
    pub class_counts: BTreeMap<String, usize>,
}

pub struct Universe {
    seed: u64,
    system_count: usize,
    settings: GeneratorSettings,
    tracks: Arc<TrackLibrary>,
    retry_budget: u64,
    thread_count: usize,
    octree: Mutex<Octree>,
    catalog: Mutex<Vec<Option<StellarSystem>>>,
    skipped: AtomicUsize,
    cancelled: AtomicBool,
}

impl Universe {
    pub fn new(
        seed: u64,
        system_count: usize,
        settings: GeneratorSettings,
        tracks: Arc<TrackLibrary>,
    ) -> Result<Self, UniverseError> {
        settings.validate()?;
        let half_width = cube_half_width_pc(system_count);
        Ok(Self {
            seed,
            system_count,
            settings,
            tracks,
            retry_budget: DEFAULT_RETRY_BUDGET,
            thread_count: num_cpus::get_physical().max(1),
            octree: Mutex::new(Octree::new(Vec3::zeros(), half_width)),
            catalog: Mutex::new(Vec::new()),
            skipped: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Requests cancellation; checked at task entry, in-flight builds run
    /// to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Generates all systems. Placement runs in a deterministic pass in
    /// system order; the heavy synthesis fans out over the worker pool.
    pub fn fill(&self) -> Result<(), UniverseError> {
        let placements = self.place_systems();
        {
            let mut catalog = self.catalog.lock().unwrap();
            catalog.clear();
            catalog.resize_with(self.system_count, || None);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.thread_count)
            .build()
            .map_err(|e| UniverseError::Pool(e.to_string()))?;

        info!(
            count = self.system_count,
            threads = self.thread_count,
            seed = self.seed,
            "filling universe"
        );

        let fatal: Mutex<Option<UniverseError>> = Mutex::new(None);
        pool.install(|| {
            placements
                .par_iter()
                .enumerate()
                .for_each(|(index, placement)| {
                    let Some(placement) = placement else {
                        return;
                    };
                    if self.cancelled.load(Ordering::SeqCst) {
                        return;
                    }
                    match self.build_system(index, placement) {
                        Ok(system) => {
                            let mut catalog = self.catalog.lock().unwrap();
                            catalog[index] = Some(system);
                        }
                        Err(BuildFailure::Exhausted(fault)) => {
                            warn!(index, %fault, "system skipped after retry budget");
                            self.skipped.fetch_add(1, Ordering::SeqCst);
                            self.octree.lock().unwrap().remove(&placement.position_pc);
                        }
                        Err(BuildFailure::Fatal(error)) => {
                            let mut slot = fatal.lock().unwrap();
                            if slot.is_none() {
                                *slot = Some(error);
                            }
                            self.cancel();
                        }
                    }
                });
        });

        if let Some(error) = fatal.into_inner().unwrap() {
            return Err(error);
        }
        Ok(())
    }

    /// Deterministic placement pass: one rejection-sampled location per
    /// system, drawn from that system's own seed stream and registered in
    /// the shared octree.
    fn place_systems(&self) -> Vec<Option<Placement>> {
        let half_width = {
            let octree = self.octree.lock().unwrap();
            octree.half_width()
        };

        let mut placements = Vec::with_capacity(self.system_count);
        let mut octree = self.octree.lock().unwrap();
        let mut ranked: Vec<(usize, f64)> = Vec::with_capacity(self.system_count);

        for index in 0..self.system_count {
            let system_seed = random::child_seed(self.seed, index as u64);
            let mut engine = random::engine_from_seed(random::child_seed(system_seed, 0));

            let mut found = None;
            for _ in 0..PLACEMENT_ATTEMPTS {
                let limit = half_width * 0.98;
                let position = Vec3::new(
                    engine.gen_range(-limit..limit),
                    engine.gen_range(-limit..limit),
                    engine.gen_range(-limit..limit),
                );
                if octree.occupied_within(&position, MIN_SEPARATION_PC) {
                    continue;
                }
                octree.insert(position);
                let normal = Vec2::new(
                    engine.gen_range(0.0..std::f64::consts::PI),
                    engine.gen_range(0.0..std::f64::consts::TAU),
                );
                found = Some(Placement {
                    system_seed,
                    position_pc: position,
                    normal,
                    distance_rank: 0,
                });
                break;
            }

            match found {
                Some(placement) => {
                    ranked.push((index, placement.position_pc.norm()));
                    placements.push(Some(placement));
                }
                None => {
                    warn!(
                        index,
                        fault = %GenerationFault {
                            seed: system_seed,
                            reason: FaultReason::Crowded,
                        },
                        "placement failed"
                    );
                    self.skipped.fetch_add(1, Ordering::SeqCst);
                    placements.push(None);
                }
            }
        }
        drop(octree);

        // Distance-rank ordinals from the origin ordering.
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (rank, (index, _)) in ranked.into_iter().enumerate() {
            if let Some(placement) = placements[index].as_mut() {
                placement.distance_rank = rank;
            }
        }

        placements
    }

    /// One system build with the per-task retry loop. Every attempt derives
    /// a fresh seed from the system's stream, so a retry is reproducible.
    fn build_system(
        &self,
        index: usize,
        placement: &Placement,
    ) -> Result<StellarSystem, BuildFailure> {
        let mut last_fault = GenerationFault {
            seed: placement.system_seed,
            reason: FaultReason::EmptyOrbitSet,
        };

        for attempt in 0..self.retry_budget {
            let attempt_seed =
                random::child_seed(random::child_seed(placement.system_seed, 1), attempt);

            let mut bary = BaryCenter::new(
                format!("System-{}", index),
                placement.position_pc,
                placement.normal,
            );
            bary.distance_rank = placement.distance_rank;
            let mut system = StellarSystem::new(bary);

            let mut seeds = SeedSequence::new(attempt_seed);
            let mut stellar =
                StellarGenerator::new(&mut seeds, &self.settings, Arc::clone(&self.tracks))
                    .map_err(|e| BuildFailure::Fatal(e.into()))?;

            let (primary, secondary) = stellar.generate_basic_properties();
            system.push_star(stellar.generate_star(primary));
            if let Some(secondary) = secondary {
                system.push_star(stellar.generate_star(secondary));
            }

            let mut orbital = OrbitalGenerator::new(seeds.next_seed(), self.settings.clone())
                .map_err(|e| BuildFailure::Fatal(e.into()))?;
            match orbital.generate_orbitals(&mut system) {
                Ok(()) => {
                    system
                        .validate()
                        .map_err(|e| BuildFailure::Fatal(e.into()))?;
                    return Ok(system);
                }
                Err(fault) => {
                    last_fault = fault;
                }
            }
        }

        Err(BuildFailure::Exhausted(last_fault))
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Star counts by spectral letter across the accepted systems.
    pub fn count_stars(&self) -> BTreeMap<String, usize> {
        let catalog = self.catalog.lock().unwrap();
        let mut counts = BTreeMap::new();
        for system in catalog.iter().flatten() {
            for star in &system.stars {
                let letter = star
                    .stellar_class
                    .chars()
                    .next()
                    .unwrap_or('?')
                    .to_string();
                *counts.entry(letter).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Consumes the driver and publishes the finished catalog.
    pub fn into_catalog(self) -> Catalog {
        let class_counts = self.count_stars();
        let systems = self
            .catalog
            .into_inner()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        Catalog {
            seed: self.seed,
            systems,
            skipped: self.skipped.into_inner(),
            class_counts,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Placement {
    system_seed: u64,
    position_pc: Vec3,
    normal: Vec2,
    distance_rank: usize,
}

enum BuildFailure {
    /// Retry budget exhausted; the system is reported skipped.
    Exhausted(GenerationFault),
    /// Configuration or invariant fault; aborts the run.
    Fatal(UniverseError),
}

/// Root cube half-width scaled so the target density leaves room for the
/// minimum separation.
fn cube_half_width_pc(system_count: usize) -> f64 {
    (2.0 * (system_count.max(1) as f64).cbrt()).max(8.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_catalog(seed: u64, count: usize, settings: GeneratorSettings) -> Catalog {
        let universe =
            Universe::new(seed, count, settings, Arc::new(TrackLibrary::empty())).unwrap();
        universe.fill().unwrap();
        universe.into_catalog()
    }

    #[test]
    fn fills_and_publishes_systems() {
        let catalog = build_catalog(42, 6, GeneratorSettings::default());
        assert!(!catalog.systems.is_empty());
        assert_eq!(catalog.systems.len() + catalog.skipped, 6);
        for system in &catalog.systems {
            system.validate().expect("published system invariants");
            assert!(!system.stars.is_empty());
        }
        let counted: usize = catalog.class_counts.values().sum();
        let total: usize = catalog.systems.iter().map(|s| s.stars.len()).sum();
        assert_eq!(counted, total);
    }

    #[test]
    fn runs_are_bit_identical() {
        let a = build_catalog(1234, 5, GeneratorSettings::default());
        let b = build_catalog(1234, 5, GeneratorSettings::default());
        let a_json = serde_json::to_string(&a).unwrap();
        let b_json = serde_json::to_string(&b).unwrap();
        assert_eq!(a_json, b_json);
    }

    #[test]
    fn different_seeds_differ() {
        let a = build_catalog(1, 4, GeneratorSettings::default());
        let b = build_catalog(2, 4, GeneratorSettings::default());
        let a_json = serde_json::to_string(&a).unwrap();
        let b_json = serde_json::to_string(&b).unwrap();
        assert_ne!(a_json, b_json);
    }

    #[test]
    fn placements_respect_minimum_separation() {
        let universe = Universe::new(
            9,
            32,
            GeneratorSettings::default(),
            Arc::new(TrackLibrary::empty()),
        )
        .unwrap();
        let placements = universe.place_systems();
        let positions: Vec<Vec3> = placements
            .iter()
            .flatten()
            .map(|p| p.position_pc)
            .collect();
        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                assert!((a - b).norm() >= MIN_SEPARATION_PC);
            }
        }
        // Ranks are a permutation ordered by distance.
        let mut ranked: Vec<(usize, f64)> = placements
            .iter()
            .flatten()
            .map(|p| (p.distance_rank, p.position_pc.norm()))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        for pair in ranked.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn cancellation_stops_new_builds() {
        let universe = Universe::new(
            5,
            8,
            GeneratorSettings::default(),
            Arc::new(TrackLibrary::empty()),
        )
        .unwrap();
        universe.cancel();
        universe.fill().unwrap();
        let catalog = universe.into_catalog();
        assert!(catalog.systems.is_empty());
    }

    #[test]
    fn bary_names_and_ranks_are_assigned() {
        let catalog = build_catalog(77, 4, GeneratorSettings::default());
        for system in &catalog.systems {
            assert!(system.bary.name.starts_with("System-"));
        }
        let mut ranks: Vec<usize> = catalog.systems.iter().map(|s| s.bary.distance_rank).collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), catalog.systems.len());
    }
}
