// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Raw track records, CSV loading and the seeded synthetic catalogue

use crate::error::{EvalError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns every input table must provide, in canonical order
pub const REQUIRED_COLUMNS: [&str; 19] = [
    "id",
    "artists",
    "name",
    "release_date",
    "year",
    "acousticness",
    "danceability",
    "duration_ms",
    "energy",
    "instrumentalness",
    "liveness",
    "loudness",
    "speechiness",
    "tempo",
    "valence",
    "mode",
    "key",
    "explicit",
    "popularity",
];

/// A single track as it appears in the source catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier
    pub id: String,
    /// Free-text artist credit, e.g. `['Artist A', 'Artist B']`
    pub artists: String,
    /// Track title
    pub name: String,
    /// Raw release date in one of `YYYY-MM-DD`, `YYYY-MM` or `YYYY`
    pub release_date: String,
    pub year: i32,
    pub acousticness: f64,
    pub danceability: f64,
    pub duration_ms: u64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    /// Loudness in dB (usually negative)
    pub loudness: f64,
    pub speechiness: f64,
    /// Tempo in BPM
    pub tempo: f64,
    pub valence: f64,
    /// 0 = minor, 1 = major
    pub mode: u8,
    /// Pitch class 0..=11
    pub key: u8,
    /// 0 = clean, 1 = explicit
    pub explicit: u8,
    /// Popularity score 0..=100
    pub popularity: u8,
}

impl Track {
    /// Render the track back into its raw string fields, in `REQUIRED_COLUMNS` order
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.artists.clone(),
            self.name.clone(),
            self.release_date.clone(),
            self.year.to_string(),
            self.acousticness.to_string(),
            self.danceability.to_string(),
            self.duration_ms.to_string(),
            self.energy.to_string(),
            self.instrumentalness.to_string(),
            self.liveness.to_string(),
            self.loudness.to_string(),
            self.speechiness.to_string(),
            self.tempo.to_string(),
            self.valence.to_string(),
            self.mode.to_string(),
            self.key.to_string(),
            self.explicit.to_string(),
            self.popularity.to_string(),
        ]
    }
}

/// Untyped table as read from disk: headers plus string cells.
///
/// Nothing is validated here; `FeatureDeriver` owns schema checks.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { headers, records }
    }

    /// Load a headed CSV file
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { headers, records })
    }

    pub fn from_tracks(tracks: &[Track]) -> Self {
        Self {
            headers: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: tracks.iter().map(Track::to_record).collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a named column, or a schema error naming it
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EvalError::schema(name, "required column is missing"))
    }

    /// Write the table as CSV
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Generating parameters for the synthetic catalogue
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyntheticSpec {
    /// Popularity at year 1921
    pub intercept: f64,
    /// Popularity gained per year after 1921
    pub year_slope: f64,
    /// Standard deviation of the Gaussian popularity noise
    pub noise_sd: f64,
}

impl SyntheticSpec {
    pub fn validate(&self) -> Result<()> {
        if !self.noise_sd.is_finite() || self.noise_sd < 0.0 {
            return Err(EvalError::range(
                "noise_sd",
                format!("{} is not a finite non-negative deviation", self.noise_sd),
            ));
        }
        if !self.intercept.is_finite() || !self.year_slope.is_finite() {
            return Err(EvalError::range("synthetic", "intercept and year_slope must be finite"));
        }
        Ok(())
    }
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            intercept: 15.0,
            year_slope: 0.5,
            noise_sd: 2.0,
        }
    }
}

const ARTIST_POOL: [&str; 12] = [
    "Ella Vance",
    "The Low Tides",
    "Marco Petri",
    "Juniper",
    "Okafor & Sons",
    "Nadia Brel",
    "Static Bloom",
    "K. Osei",
    "Lumen Choir",
    "Dusty Rhodes Trio",
    "Mira Sato",
    "Hollow Pines",
];

/// Generate a seeded synthetic catalogue.
///
/// Popularity is `intercept + year_slope * (year - 1921)` plus Gaussian noise,
/// rounded and kept within 0..=100. The explicit flag follows a logistic model
/// driven by speechiness and year, so both targets carry learnable signal.
pub fn synthetic_tracks(size: usize, seed: u64, spec: &SyntheticSpec) -> Result<Vec<Track>> {
    spec.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, spec.noise_sd)
        .map_err(|e| EvalError::range("noise_sd", format!("{} ({})", spec.noise_sd, e)))?;

    let tracks = (0..size)
        .map(|i| {
            let year: i32 = rng.gen_range(1921..=2020);
            let n_artists = rng.gen_range(1..=3);
            let credited: Vec<String> = (0..n_artists)
                .map(|_| format!("'{}'", ARTIST_POOL[rng.gen_range(0..ARTIST_POOL.len())]))
                .collect();

            let release_date = match rng.gen_range(0..3) {
                0 => format!("{}-{:02}-{:02}", year, rng.gen_range(1..=12), rng.gen_range(1..=28)),
                1 => format!("{}-{:02}", year, rng.gen_range(1..=12)),
                _ => year.to_string(),
            };

            let speechiness: f64 = rng.gen_range(0.0..0.6);
            let era = (year - 1990) as f64 / 30.0;
            let logit = -3.0 + 7.0 * speechiness + 1.5 * era;
            let explicit = u8::from(rng.gen_bool(sigmoid(logit)));

            let raw_pop = spec.intercept
                + spec.year_slope * (year - 1921) as f64
                + noise.sample(&mut rng);
            let popularity = raw_pop.round().clamp(0.0, 100.0) as u8;

            Track {
                id: format!("synthetic_{:05}", i),
                artists: format!("[{}]", credited.join(", ")),
                name: format!("Track {}", i),
                release_date,
                year,
                acousticness: rng.gen_range(0.0..1.0),
                danceability: rng.gen_range(0.0..1.0),
                duration_ms: rng.gen_range(90_000..420_000),
                energy: rng.gen_range(0.0..1.0),
                instrumentalness: rng.gen_range(0.0..1.0),
                liveness: rng.gen_range(0.0..1.0),
                loudness: rng.gen_range(-30.0..0.0),
                speechiness,
                tempo: rng.gen_range(60.0..200.0),
                valence: rng.gen_range(0.0..1.0),
                mode: u8::from(rng.gen_bool(0.6)),
                key: rng.gen_range(0..12),
                explicit,
                popularity,
            }
        })
        .collect();

    Ok(tracks)
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_is_seeded() {
        let spec = SyntheticSpec::default();
        let a = synthetic_tracks(50, 7, &spec).unwrap();
        let b = synthetic_tracks(50, 7, &spec).unwrap();
        let c = synthetic_tracks(50, 8, &spec).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_synthetic_ranges() {
        let tracks = synthetic_tracks(500, 42, &SyntheticSpec::default()).unwrap();

        assert_eq!(tracks.len(), 500);
        for t in &tracks {
            assert!((1921..=2020).contains(&t.year));
            assert!(t.popularity <= 100);
            assert!(t.key < 12);
            assert!(t.mode <= 1 && t.explicit <= 1);
            assert!(t.artists.starts_with('[') && t.artists.ends_with(']'));
        }

        let explicit = tracks.iter().filter(|t| t.explicit == 1).count();
        assert!(explicit > 0 && explicit < tracks.len());
    }

    #[test]
    fn test_negative_noise_rejected() {
        let spec = SyntheticSpec {
            noise_sd: -1.0,
            ..SyntheticSpec::default()
        };
        assert!(matches!(
            synthetic_tracks(10, 1, &spec),
            Err(EvalError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_csv_roundtrip_through_reader() {
        let tracks = synthetic_tracks(5, 1, &SyntheticSpec::default()).unwrap();
        let table = RawTable::from_tracks(&tracks);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracks.csv");
        table.write_csv(&path).expect("write");

        let loaded = RawTable::from_csv_path(&path).expect("load");
        assert_eq!(loaded.headers(), table.headers());
        assert_eq!(loaded.records(), table.records());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let csv = "id,artists\nx,['A']\n";
        let table = RawTable::from_reader(csv.as_bytes()).expect("parse");

        match table.column_index("popularity") {
            Err(EvalError::Schema { column, .. }) => assert_eq!(column, "popularity"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }
}
