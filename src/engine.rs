use std::cmp::Ordering;

use serde::Serialize;

use crate::matrix::SimilarityMatrix;

/// How many neighbours a query returns unless configured otherwise
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 5;

/// A ranked candidate and its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub index: usize,
    pub score: f64,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("query index {index} is out of range for a catalog of {catalog_size} movies")]
    InvalidQuery { index: usize, catalog_size: usize },

    #[error("{0}")]
    DataIntegrity(String),
}

/// Indices of the `k` movies most similar to `query_index`
///
/// See [`rank`] for the ordering and exclusion rules.
pub fn recommend(
    query_index: usize,
    matrix: &SimilarityMatrix,
    catalog_size: usize,
    k: usize,
) -> Result<Vec<usize>, EngineError> {
    Ok(rank(query_index, matrix, catalog_size, k)?
        .into_iter()
        .map(|neighbor| neighbor.index)
        .collect())
}

/// Ranks row `query_index` and returns the top `k` entries after the first
///
/// The row is sorted by score, descending, with a stable sort so tied scores keep
/// ascending index order. The first entry of that order is dropped by position: on
/// clean data it is the query itself, but when another movie ties or outranks the
/// query, that movie is the one dropped and the query may appear in the result.
pub fn rank(
    query_index: usize,
    matrix: &SimilarityMatrix,
    catalog_size: usize,
    k: usize,
) -> Result<Vec<Neighbor>, EngineError> {
    if matrix.row_count() != catalog_size {
        return Err(EngineError::DataIntegrity(format!(
            "similarity matrix has {} rows but the catalog has {catalog_size} movies",
            matrix.row_count()
        )));
    }

    let row = matrix.row(query_index).ok_or(EngineError::InvalidQuery {
        index: query_index,
        catalog_size,
    })?;

    if row.len() != catalog_size {
        return Err(EngineError::DataIntegrity(format!(
            "similarity row {query_index} has {} columns but the catalog has {catalog_size} movies",
            row.len()
        )));
    }

    let mut ranked: Vec<Neighbor> = row
        .iter()
        .enumerate()
        .map(|(index, &score)| Neighbor { index, score })
        .collect();

    // slice::sort_by is stable
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    Ok(ranked.into_iter().skip(1).take(k).collect())
}
