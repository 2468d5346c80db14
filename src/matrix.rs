use std::fmt;

use serde::{
    de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer,
};

use crate::{error::LoadError, source::ArtifactSource};

/// Dense pairwise similarity scores, row `i` aligned with catalog index `i`
///
/// Rows are kept as loaded. Squareness and alignment with the catalog are checked
/// by the consumer, so a ragged artifact still loads and fails per query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Loads and normalizes a similarity artifact
    ///
    /// Accepts a bare array of rows or a frame object carrying its rows under `data`
    /// or `values`. Every cell is coerced to a number, see [`Score`].
    pub fn load(source: &dyn ArtifactSource) -> Result<Self, LoadError> {
        let MatrixArtifact(rows) = crate::source::read_json(source)?;

        tracing::debug!(artifact = %source.name(), rows = rows.len(), "Similarity matrix loaded");
        Ok(Self { rows })
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First row whose length differs from the row count, if any
    pub fn first_ragged_row(&self) -> Option<(usize, usize)> {
        let width = self.rows.len();
        self.rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != width)
            .map(|(index, row)| (index, row.len()))
    }
}

/// Rows of a similarity artifact, read straight from the input
///
/// A bare array is the rows themselves. An object is a frame whose rows sit under
/// `data` or `values`; every other key is skipped.
struct MatrixArtifact(Vec<Vec<f64>>);

impl<'de> Deserialize<'de> for MatrixArtifact {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MatrixVisitor)
    }
}

struct MatrixVisitor;

impl<'de> Visitor<'de> for MatrixVisitor {
    type Value = MatrixArtifact;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of rows or an object with `data` or `values` rows")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<MatrixArtifact, A::Error> {
        RowsVisitor.visit_seq(seq).map(MatrixArtifact)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<MatrixArtifact, A::Error> {
        let mut rows: Option<Vec<Vec<f64>>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "data" | "values" => {
                    if rows.is_some() {
                        return Err(de::Error::custom(
                            "frame carries rows under both `data` and `values`",
                        ));
                    }
                    let Rows(found) = map.next_value()?;
                    rows = Some(found);
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        rows.map(MatrixArtifact)
            .ok_or_else(|| de::Error::missing_field("data"))
    }
}

struct Rows(Vec<Vec<f64>>);

impl<'de> Deserialize<'de> for Rows {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(RowsVisitor).map(Rows)
    }
}

struct RowsVisitor;

impl<'de> Visitor<'de> for RowsVisitor {
    type Value = Vec<Vec<f64>>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of rows")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Vec<f64>>, A::Error> {
        let mut rows = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Row(row)) = seq.next_element()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

struct Row(Vec<f64>);

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(RowVisitor).map(Row)
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Vec<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a row of scores")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<f64>, A::Error> {
        let mut row = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Score(score)) = seq.next_element()? {
            row.push(score);
        }
        Ok(row)
    }
}

/// A single matrix cell coerced to a number
///
/// Numbers pass through, booleans become `1.0`/`0.0`, strings are parsed after
/// trimming. Anything else, and NaN, is `0.0`. Deserializing a `Score` never fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(pub f64);

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScoreVisitor)
    }
}

struct ScoreVisitor;

impl<'de> Visitor<'de> for ScoreVisitor {
    type Value = Score;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Score, E> {
        Ok(Score(if v { 1.0 } else { 0.0 }))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Score, E> {
        Ok(Score(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Score, E> {
        Ok(Score(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Score, E> {
        Ok(Score(finite_or_zero(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Score, E> {
        Ok(Score(coerce_str(v)))
    }

    fn visit_bytes<E: de::Error>(self, _: &[u8]) -> Result<Score, E> {
        Ok(Score(0.0))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Score, E> {
        Ok(Score(0.0))
    }

    fn visit_none<E: de::Error>(self) -> Result<Score, E> {
        Ok(Score(0.0))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Score, D::Error> {
        Score::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Score, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Score(0.0))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Score, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Score(0.0))
    }
}

/// Parses a textual cell, falling back to `0.0`
///
/// Single underscores between digits are accepted as separators (`"1_000"`).
pub fn coerce_str(text: &str) -> f64 {
    let text = text.trim();
    let parsed = if text.contains('_') {
        strip_digit_separators(text).and_then(|digits| digits.parse::<f64>().ok())
    } else {
        text.parse::<f64>().ok()
    };
    parsed.map(finite_or_zero).unwrap_or(0.0)
}

fn strip_digit_separators(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let separated = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    separated.then(|| text.replace('_', ""))
}

// NaN has no place in a descending sort
fn finite_or_zero(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn load(json: &str) -> Result<SimilarityMatrix, LoadError> {
        SimilarityMatrix::load(&MemorySource::new("similarity.json", json))
    }

    #[test]
    fn test_load_plain_rows() {
        let matrix = load("[[1.0, 0.25], [0.25, 1]]").unwrap();
        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.row(1), Some(&[0.25, 1.0][..]));
        assert_eq!(matrix.first_ragged_row(), None);
    }

    #[test]
    fn test_load_split_frame() {
        let matrix = load(
            r#"{"index": [0, 1], "columns": [0, 1], "data": [[1.0, 0.5], [0.5, 1.0]]}"#,
        )
        .unwrap();
        assert_eq!(matrix, SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5, 1.0]]));
    }

    #[test]
    fn test_load_values_frame() {
        let matrix = load(r#"{"values": [[1.0]]}"#).unwrap();
        assert_eq!(matrix.row(0), Some(&[1.0][..]));
    }

    #[test]
    fn test_corrupted_cells_become_zero() {
        let matrix = load(r#"[[1.0, "abc", null, "0.75", true, [1, 2], {"x": 1}, " 2.5 ", "NaN", false]]"#)
            .unwrap();
        assert_eq!(
            matrix.row(0).unwrap(),
            &[1.0, 0.0, 0.0, 0.75, 1.0, 0.0, 0.0, 2.5, 0.0, 0.0]
        );
    }

    #[test]
    fn test_ragged_rows_still_load() {
        let matrix = load("[[1.0, 0.2, 0.1], [0.2, 1.0], [0.1, 0.3, 1.0]]").unwrap();
        assert_eq!(matrix.first_ragged_row(), Some((1, 2)));
    }

    #[test]
    fn test_unrecognized_shape_is_load_error() {
        assert!(matches!(load(r#"{"rows": [[1.0]]}"#), Err(LoadError::Malformed { .. })));
        assert!(matches!(load("[1.0, 2.0]"), Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn test_frame_keys_in_any_order() {
        let matrix = load(r#"{"data": [[1.0, 0.5], [0.5, 1.0]], "columns": ["a", "b"], "index": {"x": [1]}}"#)
            .unwrap();
        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.row(0), Some(&[1.0, 0.5][..]));
    }

    #[test]
    fn test_frame_with_both_row_keys_is_load_error() {
        let err = load(r#"{"data": [[1.0]], "values": [[1.0]]}"#).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn test_large_matrix_loads_row_by_row() {
        let size = 300;
        let row = vec!["0.5"; size].join(",");
        let json = format!("[{}]", vec![format!("[{row}]"); size].join(","));

        let matrix = load(&json).unwrap();
        assert_eq!(matrix.row_count(), size);
        assert_eq!(matrix.first_ragged_row(), None);
        assert_eq!(matrix.row(size - 1).unwrap()[size - 1], 0.5);
    }

    #[test]
    fn test_coerce_str_digit_separators() {
        assert_eq!(coerce_str("1_000"), 1000.0);
        assert_eq!(coerce_str("0.000_5"), 0.0005);
        assert_eq!(coerce_str("1__000"), 0.0);
        assert_eq!(coerce_str("_1"), 0.0);
        assert_eq!(coerce_str("1_"), 0.0);
        assert_eq!(coerce_str("1_.5"), 0.0);
    }

    #[test]
    fn test_coerce_str() {
        assert_eq!(coerce_str("0.5"), 0.5);
        assert_eq!(coerce_str("1e-3"), 0.001);
        assert_eq!(coerce_str("n/a"), 0.0);
        assert_eq!(coerce_str(""), 0.0);
    }
}
