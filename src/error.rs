// Error taxonomy for the generation pipeline

use thiserror::Error;

/// Out-of-range or inconsistent configuration, refused at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be a probability in [0, 1], got {value}")]
    NotAProbability { name: &'static str, value: f64 },

    #[error("{name} is not finite")]
    NotFinite { name: &'static str },
}

/// Missing or malformed track data; fatal to the stellar generator.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read track file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed track file {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("track file {path} has no usable rows")]
    Empty { path: String },

    #[error("track file name {path} does not encode a metallicity")]
    BadFileName { path: String },
}

/// Single-system failure, retryable with a fresh seed. Carries the seed the
/// failed attempt ran with so the driver can report it.
#[derive(Debug, Clone, Error)]
#[error("system generation failed with seed {seed}: {reason}")]
pub struct GenerationFault {
    pub seed: u64,
    pub reason: FaultReason,
}

#[derive(Debug, Clone, Error)]
pub enum FaultReason {
    #[error("no planet slot survived the forbidden zones")]
    EmptyOrbitSet,

    #[error("parent mass {mass_sol} M_sun is below the generator minimum")]
    ParentMassTooLow { mass_sol: f64 },

    #[error("non-finite value in {context}")]
    NonFinite { context: &'static str },

    #[error("no placement satisfied the minimum separation")]
    Crowded,
}

/// Assertion failure inside the octree or entity model; fatal.
#[derive(Debug, Error)]
#[error("invariant violation: {0}")]
pub struct InvariantViolation(pub String);

/// Top-level error for the universe driver.
#[derive(Debug, Error)]
pub enum UniverseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("worker pool initialization failed: {0}")]
    Pool(String),
}
