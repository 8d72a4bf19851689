// Stellar evolutionary track tables

use crate::consts;
use crate::error::DataError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One row of a track CSV. Extra columns in the file are ignored.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TrackRow {
    pub initial_mass: f64,
    pub log_age: f64,
    pub mass: f64,
    #[serde(rename = "log_L")]
    pub log_l: f64,
    #[serde(rename = "log_Teff")]
    pub log_teff: f64,
    #[serde(rename = "log_R")]
    pub log_r: f64,
    pub phase: u32,
}

/// Interpolated present-day state of a star.
#[derive(Clone, Copy, Debug)]
pub struct TrackPoint {
    pub mass_sol: f64,
    pub luminosity_sol: f64,
    pub teff_k: f64,
    pub radius_sol: f64,
    pub phase_index: u32,
    /// True when the requested age ran off the grid and the sample was
    /// clamped to the track edge.
    pub clamped: bool,
}

/// All tracks for one metallicity grid point, organized as per-initial-mass
/// columns sorted by log age.
#[derive(Clone, Debug)]
pub struct TrackTable {
    pub feh: f64,
    columns: Vec<MassColumn>,
}

#[derive(Clone, Debug)]
struct MassColumn {
    initial_mass: f64,
    rows: Vec<TrackRow>,
}

impl TrackTable {
    pub fn from_rows(feh: f64, mut rows: Vec<TrackRow>) -> Self {
        rows.sort_by(|a, b| {
            a.initial_mass
                .total_cmp(&b.initial_mass)
                .then(a.log_age.total_cmp(&b.log_age))
        });

        let mut columns: Vec<MassColumn> = Vec::new();
        for row in rows {
            match columns.last_mut() {
                Some(col) if col.initial_mass == row.initial_mass => col.rows.push(row),
                _ => columns.push(MassColumn {
                    initial_mass: row.initial_mass,
                    rows: vec![row],
                }),
            }
        }
        Self { feh, columns }
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let feh = feh_from_file_name(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    DataError::Io {
                        path: path.display().to_string(),
                        source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                    }
                } else {
                    DataError::Malformed {
                        path: path.display().to_string(),
                        source: e,
                    }
                }
            })?;

        let mut rows = Vec::new();
        for record in reader.deserialize::<TrackRow>() {
            let row = record.map_err(|e| DataError::Malformed {
                path: path.display().to_string(),
                source: e,
            })?;
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(DataError::Empty {
                path: path.display().to_string(),
            });
        }

        debug!(path = %path.display(), feh, rows = rows.len(), "loaded track table");
        Ok(Self::from_rows(feh, rows))
    }

    pub fn mass_range(&self) -> Option<(f64, f64)> {
        match (self.columns.first(), self.columns.last()) {
            (Some(lo), Some(hi)) => Some((lo.initial_mass, hi.initial_mass)),
            _ => None,
        }
    }

    /// Bilinear interpolation in (initial mass, log age). Returns None when
    /// the initial mass falls outside the grid; ages off the ends of a
    /// column clamp to its edge and mark the sample.
    pub fn interpolate(&self, initial_mass_sol: f64, age_years: f64) -> Option<TrackPoint> {
        let (lo, hi) = self.mass_range()?;
        if initial_mass_sol < lo || initial_mass_sol > hi {
            return None;
        }
        let log_age = age_years.max(1.0).log10();

        let upper = self
            .columns
            .partition_point(|c| c.initial_mass < initial_mass_sol)
            .min(self.columns.len() - 1);
        let lower = upper.saturating_sub(1);
        let (c0, c1) = (&self.columns[lower], &self.columns[upper]);

        let (s0, clamped0) = sample_column(c0, log_age);
        let (s1, clamped1) = sample_column(c1, log_age);

        let t = if c1.initial_mass > c0.initial_mass {
            (initial_mass_sol - c0.initial_mass) / (c1.initial_mass - c0.initial_mass)
        } else {
            0.0
        };

        let lerp = |a: f64, b: f64| a + (b - a) * t;
        Some(TrackPoint {
            mass_sol: lerp(s0.mass, s1.mass),
            luminosity_sol: 10f64.powf(lerp(s0.log_l, s1.log_l)),
            teff_k: 10f64.powf(lerp(s0.log_teff, s1.log_teff)),
            radius_sol: 10f64.powf(lerp(s0.log_r, s1.log_r)),
            phase_index: if t < 0.5 { s0.phase } else { s1.phase },
            clamped: clamped0 || clamped1,
        })
    }
}

/// Linear interpolation along one mass column; clamps off-grid ages.
fn sample_column(column: &MassColumn, log_age: f64) -> (TrackRow, bool) {
    let rows = &column.rows;
    if log_age <= rows[0].log_age {
        return (rows[0], log_age < rows[0].log_age);
    }
    let last = rows[rows.len() - 1];
    if log_age >= last.log_age {
        return (last, log_age > last.log_age);
    }

    let hi = rows.partition_point(|r| r.log_age < log_age);
    let (r0, r1) = (rows[hi - 1], rows[hi]);
    let t = (log_age - r0.log_age) / (r1.log_age - r0.log_age);
    let lerp = |a: f64, b: f64| a + (b - a) * t;
    (
        TrackRow {
            initial_mass: r0.initial_mass,
            log_age,
            mass: lerp(r0.mass, r1.mass),
            log_l: lerp(r0.log_l, r1.log_l),
            log_teff: lerp(r0.log_teff, r1.log_teff),
            log_r: lerp(r0.log_r, r1.log_r),
            phase: if t < 0.5 { r0.phase } else { r1.phase },
        },
        false,
    )
}

/// Parses the metallicity out of names like `feh_-0.50.csv` / `feh_+0.00.csv`.
fn feh_from_file_name(path: &Path) -> Result<f64, DataError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    stem.strip_prefix("feh_")
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| DataError::BadFileName {
            path: path.display().to_string(),
        })
}

/// The full set of metallicity grid points, loaded once and shared
/// read-only.
#[derive(Clone, Debug, Default)]
pub struct TrackLibrary {
    tables: Vec<TrackTable>,
}

impl TrackLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Vec<TrackTable>) -> Self {
        Self { tables }
    }

    /// Discovers `feh_*.csv` grids under `dir`. An absent directory yields
    /// an empty library (the generator falls back to zero-age estimates); a
    /// present-but-malformed file is fatal.
    pub fn discover(dir: &Path) -> Result<Self, DataError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "no track directory; using ZAMS fallback only");
                return Ok(Self::empty());
            }
            Err(e) => {
                return Err(DataError::Io {
                    path: dir.display().to_string(),
                    source: e,
                })
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "csv"))
            .collect();
        paths.sort();

        let mut tables = Vec::new();
        for path in paths {
            tables.push(TrackTable::load(&path)?);
        }
        tables.sort_by(|a, b| a.feh.total_cmp(&b.feh));
        info!(dir = %dir.display(), grids = tables.len(), "track library ready");
        Ok(Self { tables })
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Grid point with the nearest [Fe/H].
    pub fn nearest(&self, feh: f64) -> Option<&TrackTable> {
        self.tables
            .iter()
            .min_by(|a, b| (a.feh - feh).abs().total_cmp(&(b.feh - feh).abs()))
    }
}

/// Base asset directory: `./Assets` in debug builds, `../Assets` in release.
pub fn default_asset_base() -> PathBuf {
    if cfg!(debug_assertions) {
        PathBuf::from("./Assets")
    } else {
        PathBuf::from("../Assets")
    }
}

/// Directory holding the track grids.
pub fn data_table_dir(asset_base: &Path) -> PathBuf {
    asset_base.join("DataTables")
}

/// Zero-age main-sequence estimate used when no track covers a star.
pub fn zams_estimate(initial_mass_sol: f64) -> TrackPoint {
    let m = initial_mass_sol;
    let luminosity = if m < 0.43 {
        0.23 * m.powf(2.3)
    } else if m < 2.0 {
        m.powf(4.0)
    } else if m < 55.0 {
        1.4 * m.powf(3.5)
    } else {
        32000.0 * m
    };
    let radius = if m < 1.0 { m.powf(0.8) } else { m.powf(0.57) };
    // L = 4 pi R^2 sigma T^4 in solar units
    let teff = consts::SOLAR_TEFF * (luminosity / (radius * radius)).powf(0.25);
    TrackPoint {
        mass_sol: m,
        luminosity_sol: luminosity,
        teff_k: teff,
        radius_sol: radius,
        phase_index: 1,
        clamped: false,
    }
}

/// Rough main-sequence lifetime in years.
pub fn main_sequence_lifetime_years(initial_mass_sol: f64) -> f64 {
    1.0e10 * initial_mass_sol.powf(-2.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("starforge_{}_{}", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn sample_rows() -> Vec<TrackRow> {
        // Two mass columns, two ages each; luminosity doubles with age.
        let mk = |initial_mass: f64, log_age: f64, log_l: f64| TrackRow {
            initial_mass,
            log_age,
            mass: initial_mass * 0.99,
            log_l,
            log_teff: 3.76,
            log_r: 0.0,
            phase: 1,
        };
        vec![
            mk(0.8, 8.0, -0.4),
            mk(0.8, 10.0, -0.2),
            mk(1.2, 8.0, 0.2),
            mk(1.2, 10.0, 0.4),
        ]
    }

    #[test]
    fn interpolates_between_grid_points() {
        let table = TrackTable::from_rows(0.0, sample_rows());
        let point = table.interpolate(1.0, 1e9).unwrap();
        // Midpoint in mass and age: log_l mean of the four corners = 0.0.
        assert!((point.luminosity_sol - 1.0).abs() < 1e-9);
        assert!(!point.clamped);
        assert!((point.mass_sol - 0.99).abs() < 1e-9);
    }

    #[test]
    fn clamps_ages_off_the_grid() {
        let table = TrackTable::from_rows(0.0, sample_rows());
        let point = table.interpolate(0.8, 1e12).unwrap();
        assert!(point.clamped);
        assert!((point.luminosity_sol - 10f64.powf(-0.2)).abs() < 1e-9);
    }

    #[test]
    fn rejects_masses_off_the_grid() {
        let table = TrackTable::from_rows(0.0, sample_rows());
        assert!(table.interpolate(5.0, 1e9).is_none());
        assert!(table.interpolate(0.1, 1e9).is_none());
    }

    #[test]
    fn loads_and_ignores_extra_columns() {
        let path = write_temp_csv(
            "ok_feh.csv",
            "initial_mass,log_age,mass,log_L,log_Teff,log_R,phase,extra\n\
             1.0,9.0,0.99,0.0,3.76,0.0,1,junk\n\
             1.0,9.5,0.98,0.05,3.75,0.02,2,junk\n",
        );
        let renamed = path.with_file_name("feh_+0.00.csv");
        std::fs::rename(&path, &renamed).unwrap();
        let table = TrackTable::load(&renamed).unwrap();
        assert_eq!(table.feh, 0.0);
        assert!(table.interpolate(1.0, 2e9).is_some());
        std::fs::remove_file(&renamed).unwrap();
    }

    #[test]
    fn malformed_file_is_a_data_error() {
        let path = write_temp_csv(
            "bad.csv",
            "initial_mass,log_age,mass,log_L,log_Teff,log_R,phase\n\
             1.0,not_a_number,0.99,0.0,3.76,0.0,1\n",
        );
        let renamed = path.with_file_name("feh_-0.50.csv");
        std::fs::rename(&path, &renamed).unwrap();
        assert!(matches!(
            TrackTable::load(&renamed),
            Err(DataError::Malformed { .. })
        ));
        std::fs::remove_file(&renamed).unwrap();
    }

    #[test]
    fn bad_file_name_is_rejected() {
        assert!(matches!(
            feh_from_file_name(Path::new("tracks.csv")),
            Err(DataError::BadFileName { .. })
        ));
        assert_eq!(feh_from_file_name(Path::new("feh_-1.00.csv")).unwrap(), -1.0);
        assert_eq!(feh_from_file_name(Path::new("feh_+0.40.csv")).unwrap(), 0.4);
    }

    #[test]
    fn nearest_metallicity_wins() {
        let library = TrackLibrary::from_tables(vec![
            TrackTable::from_rows(-1.0, sample_rows()),
            TrackTable::from_rows(0.0, sample_rows()),
            TrackTable::from_rows(0.4, sample_rows()),
        ]);
        assert_eq!(library.nearest(-0.7).unwrap().feh, -1.0);
        assert_eq!(library.nearest(0.1).unwrap().feh, 0.0);
        assert_eq!(library.nearest(2.0).unwrap().feh, 0.4);
    }

    #[test]
    fn missing_directory_yields_empty_library() {
        let library =
            TrackLibrary::discover(Path::new("/definitely/not/a/real/dir")).unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn zams_sun_is_sun_like() {
        let point = zams_estimate(1.0);
        assert!((point.luminosity_sol - 1.0).abs() < 0.5);
        assert!(point.teff_k > 5000.0 && point.teff_k < 6500.0);
        assert!((point.radius_sol - 1.0).abs() < 0.2);
    }
}
