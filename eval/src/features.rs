// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Feature derivation: raw catalogue rows to the fixed model-ready table
//!
//! - Typed parsing of the raw string table with schema checks
//! - `num_artists` from the free-text artist credit
//! - Decade buckets (validated, then left out of the model table)
//! - Categorical tagging for `mode`, `key` and `explicit`
//!
//! `release_date` is never parsed into a date: it arrives as `YYYY-MM-DD`,
//! `YYYY-MM` or `YYYY`, and `year` is the canonical temporal feature.

use crate::datasets::{RawTable, Track, REQUIRED_COLUMNS};
use crate::error::{EvalError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const FIRST_YEAR: i32 = 1921;
/// Exclusive upper bound of the covered year range
pub const END_YEAR: i32 = 2021;

/// Columns of the model table, in storage order
pub const MODEL_COLUMNS: [&str; 16] = [
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
    "num_artists",
    "mode",
    "key",
    "explicit",
    "popularity",
];

/// One of the ten fixed ten-year buckets spanning 1921-2020
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Decade(u8);

impl Decade {
    pub const COUNT: usize = 10;

    /// Half-open lookup: `[1921 + 10k, 1931 + 10k)` maps to bucket `k`
    pub fn from_year(year: i32) -> Result<Self> {
        if !(FIRST_YEAR..END_YEAR).contains(&year) {
            return Err(EvalError::range(
                "year",
                format!("{} is outside [{}, {})", year, FIRST_YEAR, END_YEAR),
            ));
        }
        Ok(Self(((year - FIRST_YEAR) / 10) as u8))
    }

    pub fn all() -> impl Iterator<Item = Decade> {
        (0..Self::COUNT as u8).map(Decade)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn first_year(&self) -> i32 {
        FIRST_YEAR + 10 * self.0 as i32
    }

    pub fn last_year(&self) -> i32 {
        self.first_year() + 9
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.first_year(), self.last_year())
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Count credited artists in a free-text credit such as `['A', 'B']`.
///
/// Enclosing brackets are stripped, the rest is split on commas and
/// non-empty tokens are counted. Never returns less than 1.
pub fn num_artists(credit: &str) -> usize {
    let inner = credit
        .trim()
        .trim_start_matches(['[', '(', '{'])
        .trim_end_matches([']', ')', '}']);

    let count = inner
        .split(',')
        .map(|token| token.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|token| !token.is_empty())
        .count();

    count.max(1)
}

/// Shape of a raw release-date string. Diagnostic only, never used as a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatePrecision {
    Day,
    Month,
    Year,
    Unrecognized,
}

impl DatePrecision {
    pub fn classify(raw: &str) -> Self {
        fn digits(s: &str, n: usize) -> bool {
            s.len() == n && s.bytes().all(|b| b.is_ascii_digit())
        }

        let parts: Vec<&str> = raw.trim().split('-').collect();

        match parts.as_slice() {
            [y] if digits(y, 4) => DatePrecision::Year,
            [y, m] if digits(y, 4) && digits(m, 2) => DatePrecision::Month,
            [y, m, d] if digits(y, 4) && digits(m, 2) && digits(d, 2) => DatePrecision::Day,
            _ => DatePrecision::Unrecognized,
        }
    }
}

/// How a model column should be interpreted by adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Continuous,
    /// Integer-coded category with a closed set of levels
    Categorical { levels: Vec<u8> },
}

impl ColumnKind {
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnKind::Categorical { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub(crate) fn continuous(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Continuous,
        }
    }

    pub(crate) fn categorical(name: &str, levels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnKind::Categorical {
                levels: levels.into_iter().collect(),
            },
        }
    }
}

/// Schema of the model table, aligned with `MODEL_COLUMNS`
pub fn model_schema() -> Vec<ColumnSpec> {
    MODEL_COLUMNS
        .iter()
        .map(|&name| match name {
            "mode" | "explicit" => ColumnSpec::categorical(name, 0..=1),
            "key" => ColumnSpec::categorical(name, 0..=11),
            _ => ColumnSpec::continuous(name),
        })
        .collect()
}

/// Per-row derived values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedFeatures {
    pub num_artists: usize,
    pub decade: Decade,
}

impl DerivedFeatures {
    pub fn from_track(track: &Track) -> Result<Self> {
        let decade = Decade::from_year(track.year).map_err(|_| {
            EvalError::range(
                "year",
                format!(
                    "track '{}' has year {} outside [{}, {})",
                    track.id, track.year, FIRST_YEAR, END_YEAR
                ),
            )
        })?;

        Ok(Self {
            num_artists: num_artists(&track.artists),
            decade,
        })
    }
}

/// Immutable numeric table handed to every adapter.
///
/// Free-text columns and `decade` are not present. Row selection always
/// produces a new table.
#[derive(Debug, Clone)]
pub struct ModelDataset {
    ids: Vec<String>,
    columns: Vec<ColumnSpec>,
    data: Array2<f64>,
}

impl ModelDataset {
    pub fn new(ids: Vec<String>, columns: Vec<ColumnSpec>, data: Array2<f64>) -> Result<Self> {
        if data.ncols() != columns.len() {
            return Err(EvalError::schema(
                "*",
                format!("{} columns declared but data has {}", columns.len(), data.ncols()),
            ));
        }
        if data.nrows() != ids.len() {
            return Err(EvalError::schema(
                "id",
                format!("{} ids for {} rows", ids.len(), data.nrows()),
            ));
        }
        Ok(Self { ids, columns, data })
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_spec(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.data.column(i))
    }

    /// Every column except `target`
    pub fn predictors(&self, target: &str) -> Vec<&ColumnSpec> {
        self.columns.iter().filter(|c| c.name != target).collect()
    }

    /// New table holding the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            columns: self.columns.clone(),
            data: self.data.select(Axis(0), indices),
        }
    }
}

/// Summary of the derived table used in reports
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub decade_distribution: BTreeMap<String, usize>,
    pub release_date_precision: BTreeMap<String, usize>,
    pub explicit_rate: f64,
    pub mean_popularity: f64,
    pub mean_num_artists: f64,
}

/// Turns raw catalogue rows into a `ModelDataset`
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Parse and derive in one step; the usual entry point
    pub fn derive(raw: &RawTable) -> Result<ModelDataset> {
        let tracks = Self::parse_tracks(raw)?;
        Self::derive_tracks(&tracks)
    }

    /// Typed parse of every required column with domain checks
    pub fn parse_tracks(raw: &RawTable) -> Result<Vec<Track>> {
        let mut idx = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS.iter()) {
            *slot = raw.column_index(name)?;
        }

        let mut seen_ids = HashSet::with_capacity(raw.len());
        let mut tracks = Vec::with_capacity(raw.len());

        for (row, record) in raw.records().iter().enumerate() {
            let cell = |col: usize| cell_at(record, idx[col], REQUIRED_COLUMNS[col], row);

            let track = Track {
                id: cell(0)?.to_string(),
                artists: cell(1)?.to_string(),
                name: cell(2)?.to_string(),
                release_date: cell(3)?.to_string(),
                year: parse_integer(cell(4)?, REQUIRED_COLUMNS[4], row)?,
                acousticness: parse_cell(cell(5)?, REQUIRED_COLUMNS[5], row)?,
                danceability: parse_cell(cell(6)?, REQUIRED_COLUMNS[6], row)?,
                duration_ms: parse_integer(cell(7)?, REQUIRED_COLUMNS[7], row)?,
                energy: parse_cell(cell(8)?, REQUIRED_COLUMNS[8], row)?,
                instrumentalness: parse_cell(cell(9)?, REQUIRED_COLUMNS[9], row)?,
                liveness: parse_cell(cell(10)?, REQUIRED_COLUMNS[10], row)?,
                loudness: parse_cell(cell(11)?, REQUIRED_COLUMNS[11], row)?,
                speechiness: parse_cell(cell(12)?, REQUIRED_COLUMNS[12], row)?,
                tempo: parse_cell(cell(13)?, REQUIRED_COLUMNS[13], row)?,
                valence: parse_cell(cell(14)?, REQUIRED_COLUMNS[14], row)?,
                mode: parse_level(cell(15)?, REQUIRED_COLUMNS[15], row, 1)?,
                key: parse_level(cell(16)?, REQUIRED_COLUMNS[16], row, 11)?,
                explicit: parse_level(cell(17)?, REQUIRED_COLUMNS[17], row, 1)?,
                popularity: parse_level(cell(18)?, REQUIRED_COLUMNS[18], row, 100)?,
            };

            if track.id.is_empty() {
                return Err(EvalError::schema("id", format!("row {} has an empty id", row)));
            }
            if !seen_ids.insert(track.id.clone()) {
                return Err(EvalError::schema("id", format!("duplicate id '{}'", track.id)));
            }

            tracks.push(track);
        }

        Ok(tracks)
    }

    /// Build the model table from typed tracks.
    ///
    /// Fails on the first year outside the decade range.
    pub fn derive_tracks(tracks: &[Track]) -> Result<ModelDataset> {
        let mut data = Array2::<f64>::zeros((tracks.len(), MODEL_COLUMNS.len()));

        for (i, track) in tracks.iter().enumerate() {
            let derived = DerivedFeatures::from_track(track)?;
            let row = [
                track.year as f64,
                track.acousticness,
                track.danceability,
                track.duration_ms as f64,
                track.energy,
                track.instrumentalness,
                track.liveness,
                track.loudness,
                track.speechiness,
                track.tempo,
                track.valence,
                derived.num_artists as f64,
                track.mode as f64,
                track.key as f64,
                track.explicit as f64,
                track.popularity as f64,
            ];
            for (j, value) in row.into_iter().enumerate() {
                data[[i, j]] = value;
            }
        }

        let ids = tracks.iter().map(|t| t.id.clone()).collect();
        ModelDataset::new(ids, model_schema(), data)
    }

    /// Distribution summaries for reporting
    pub fn profile(tracks: &[Track]) -> Result<DatasetProfile> {
        let mut decade_distribution: BTreeMap<String, usize> =
            Decade::all().map(|d| (d.label(), 0)).collect();
        let mut release_date_precision = BTreeMap::new();
        let mut explicit = 0usize;
        let mut popularity = 0.0;
        let mut artists = 0.0;

        for track in tracks {
            let derived = DerivedFeatures::from_track(track)?;
            *decade_distribution.entry(derived.decade.label()).or_insert(0) += 1;
            *release_date_precision
                .entry(format!("{:?}", DatePrecision::classify(&track.release_date)))
                .or_insert(0) += 1;
            explicit += track.explicit as usize;
            popularity += track.popularity as f64;
            artists += derived.num_artists as f64;
        }

        let n = tracks.len().max(1) as f64;
        Ok(DatasetProfile {
            rows: tracks.len(),
            decade_distribution,
            release_date_precision,
            explicit_rate: explicit as f64 / n,
            mean_popularity: popularity / n,
            mean_num_artists: artists / n,
        })
    }
}

fn cell_at<'a>(record: &'a [String], index: usize, column: &str, row: usize) -> Result<&'a str> {
    record
        .get(index)
        .map(|s| s.trim())
        .ok_or_else(|| EvalError::schema(column, format!("row {} is truncated", row)))
}

fn parse_cell<T: FromStr>(raw: &str, column: &str, row: usize) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        EvalError::schema(
            column,
            format!("row {}: cannot parse '{}' as {}", row, raw, std::any::type_name::<T>()),
        )
    })
}

/// Integers sometimes arrive as `123.0`; accept those, reject real fractions
fn parse_integer<T: TryFrom<i64> + FromStr>(raw: &str, column: &str, row: usize) -> Result<T> {
    if let Ok(v) = raw.parse::<T>() {
        return Ok(v);
    }
    let value: f64 = parse_cell(raw, column, row)?;
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(EvalError::schema(
            column,
            format!("row {}: '{}' is not an integer", row, raw),
        ));
    }
    T::try_from(value as i64).map_err(|_| {
        EvalError::schema(column, format!("row {}: '{}' is out of range", row, raw))
    })
}

fn parse_level(raw: &str, column: &str, row: usize, max: u8) -> Result<u8> {
    let value: u8 = parse_integer(raw, column, row)?;
    if value > max {
        return Err(EvalError::schema(
            column,
            format!("row {}: level {} exceeds {}", row, value, max),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{synthetic_tracks, SyntheticSpec};
    use proptest::prelude::*;

    #[test]
    fn test_decade_boundaries() {
        assert_eq!(Decade::from_year(1921).unwrap().label(), "1921-1930");
        assert_eq!(Decade::from_year(1930).unwrap().label(), "1921-1930");
        assert_eq!(Decade::from_year(1931).unwrap().label(), "1931-1940");
        assert_eq!(Decade::from_year(2011).unwrap().label(), "2011-2020");
        assert_eq!(Decade::from_year(2020).unwrap().label(), "2011-2020");
    }

    #[test]
    fn test_decade_out_of_range_fails() {
        assert!(matches!(Decade::from_year(1920), Err(EvalError::InvalidRange { .. })));
        assert!(matches!(Decade::from_year(2021), Err(EvalError::InvalidRange { .. })));
    }

    #[test]
    fn test_ten_decades() {
        let labels: Vec<String> = Decade::all().map(|d| d.label()).collect();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels.first().map(String::as_str), Some("1921-1930"));
        assert_eq!(labels.last().map(String::as_str), Some("2011-2020"));
    }

    #[test]
    fn test_num_artists() {
        assert_eq!(num_artists("['Frank Sinatra']"), 1);
        assert_eq!(num_artists("Frank Sinatra"), 1);
        assert_eq!(num_artists("['A', 'B', 'C']"), 3);
        assert_eq!(num_artists("[\"A\", \"B\"]"), 2);
        assert_eq!(num_artists("[]"), 1);
        assert_eq!(num_artists(""), 1);
    }

    #[test]
    fn test_date_precision() {
        assert_eq!(DatePrecision::classify("1999-04-12"), DatePrecision::Day);
        assert_eq!(DatePrecision::classify("1999-04"), DatePrecision::Month);
        assert_eq!(DatePrecision::classify("1999"), DatePrecision::Year);
        assert_eq!(DatePrecision::classify("04/12/1999"), DatePrecision::Unrecognized);
    }

    #[test]
    fn test_derive_shape_and_tags() {
        let tracks = synthetic_tracks(40, 3, &SyntheticSpec::default()).unwrap();
        let dataset = FeatureDeriver::derive(&RawTable::from_tracks(&tracks)).unwrap();

        assert_eq!(dataset.n_rows(), 40);
        assert_eq!(dataset.columns().len(), 16);
        assert_eq!(dataset.predictors("popularity").len(), 15);
        assert_eq!(dataset.predictors("explicit").len(), 15);
        assert!(dataset.column("decade").is_none());
        assert!(dataset.column("artists").is_none());

        for name in ["mode", "key", "explicit"] {
            assert!(dataset.column_spec(name).unwrap().kind.is_categorical());
        }
        assert!(!dataset.column_spec("year").unwrap().kind.is_categorical());

        let counts = dataset.column("num_artists").unwrap();
        for (value, track) in counts.iter().zip(&tracks) {
            assert_eq!(*value as usize, num_artists(&track.artists));
        }
    }

    #[test]
    fn test_missing_column_names_it() {
        let tracks = synthetic_tracks(3, 3, &SyntheticSpec::default()).unwrap();
        let full = RawTable::from_tracks(&tracks);
        let keep: Vec<usize> = (0..full.headers().len())
            .filter(|&i| full.headers()[i] != "tempo")
            .collect();
        let table = RawTable::new(
            keep.iter().map(|&i| full.headers()[i].clone()).collect(),
            full.records()
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        );

        match FeatureDeriver::derive(&table) {
            Err(EvalError::Schema { column, .. }) => assert_eq!(column, "tempo"),
            other => panic!("expected schema error, got {:?}", other.map(|d| d.n_rows())),
        }
    }

    #[test]
    fn test_wrong_type_is_schema_error() {
        let tracks = synthetic_tracks(2, 3, &SyntheticSpec::default()).unwrap();
        let mut table = RawTable::from_tracks(&tracks);
        let energy = table.column_index("energy").unwrap();
        let mut records = table.records().to_vec();
        records[1][energy] = "loud".to_string();
        table = RawTable::new(table.headers().to_vec(), records);

        match FeatureDeriver::derive(&table) {
            Err(EvalError::Schema { column, reason }) => {
                assert_eq!(column, "energy");
                assert!(reason.contains("row 1"));
            }
            other => panic!("expected schema error, got {:?}", other.map(|d| d.n_rows())),
        }
    }

    #[test]
    fn test_key_level_out_of_domain() {
        let tracks = synthetic_tracks(1, 3, &SyntheticSpec::default()).unwrap();
        let table = RawTable::from_tracks(&tracks);
        let key = table.column_index("key").unwrap();
        let mut records = table.records().to_vec();
        records[0][key] = "12".to_string();
        let table = RawTable::new(table.headers().to_vec(), records);

        assert!(matches!(
            FeatureDeriver::derive(&table),
            Err(EvalError::Schema { ref column, .. }) if column == "key"
        ));
    }

    #[test]
    fn test_out_of_range_year_aborts_derive() {
        let mut tracks = synthetic_tracks(5, 3, &SyntheticSpec::default()).unwrap();
        tracks[2].year = 1919;

        match FeatureDeriver::derive_tracks(&tracks) {
            Err(EvalError::InvalidRange { name, reason }) => {
                assert_eq!(name, "year");
                assert!(reason.contains(&tracks[2].id));
            }
            other => panic!("expected range error, got {:?}", other.map(|d| d.n_rows())),
        }
    }

    #[test]
    fn test_float_encoded_integers_accepted() {
        let tracks = synthetic_tracks(1, 3, &SyntheticSpec::default()).unwrap();
        let table = RawTable::from_tracks(&tracks);
        let dur = table.column_index("duration_ms").unwrap();
        let mut records = table.records().to_vec();
        records[0][dur] = "215000.0".to_string();
        let table = RawTable::new(table.headers().to_vec(), records);

        let parsed = FeatureDeriver::parse_tracks(&table).unwrap();
        assert_eq!(parsed[0].duration_ms, 215_000);
    }

    #[test]
    fn test_select_rows_is_a_copy() {
        let tracks = synthetic_tracks(10, 3, &SyntheticSpec::default()).unwrap();
        let dataset = FeatureDeriver::derive_tracks(&tracks).unwrap();
        let subset = dataset.select_rows(&[4, 1]);

        assert_eq!(subset.n_rows(), 2);
        assert_eq!(subset.ids()[0], dataset.ids()[4]);
        assert_eq!(subset.data().row(1), dataset.data().row(1));
        assert_eq!(dataset.n_rows(), 10);
    }

    #[test]
    fn test_profile_counts() {
        let tracks = synthetic_tracks(200, 9, &SyntheticSpec::default()).unwrap();
        let profile = FeatureDeriver::profile(&tracks).unwrap();

        assert_eq!(profile.rows, 200);
        assert_eq!(profile.decade_distribution.len(), 10);
        assert_eq!(profile.decade_distribution.values().sum::<usize>(), 200);
        assert_eq!(profile.release_date_precision.values().sum::<usize>(), 200);
        assert!(profile.mean_num_artists >= 1.0);
    }

    proptest! {
        #[test]
        fn prop_every_valid_year_has_one_bucket(year in FIRST_YEAR..END_YEAR) {
            let decade = Decade::from_year(year).unwrap();
            prop_assert!(decade.first_year() <= year && year <= decade.last_year());
            let containing = Decade::all()
                .filter(|d| d.first_year() <= year && year <= d.last_year())
                .count();
            prop_assert_eq!(containing, 1);
        }

        #[test]
        fn prop_num_artists_matches_token_count(names in prop::collection::vec("[A-Za-z][A-Za-z ]{0,12}", 1..6)) {
            let credit = format!(
                "[{}]",
                names.iter().map(|n| format!("'{}'", n)).collect::<Vec<_>>().join(", ")
            );
            prop_assert_eq!(num_artists(&credit), names.len());
        }

        #[test]
        fn prop_num_artists_at_least_one(credit in ".{0,40}") {
            prop_assert!(num_artists(&credit) >= 1);
        }
    }
}
