use std::time::Instant;

use serde::Serialize;

use crate::{
    catalog::Catalog,
    config::Config,
    engine,
    error::{AppError, AppResult},
    matrix::SimilarityMatrix,
    source::{ArtifactSource, FileSource},
};

/// A recommended movie as shown to the caller
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    /// 1-based position in the result list
    pub rank: usize,
    pub title: String,
    /// Upstream database id, for clients that look up posters or details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<u64>,
    pub score: f64,
}

/// Loaded catalog and similarity matrix, queried read-only
///
/// Built once at startup. Everything after construction takes `&self`, so one
/// instance can serve concurrent queries without locking.
#[derive(Debug)]
pub struct Recommender {
    catalog: Catalog,
    matrix: SimilarityMatrix,
    count: usize,
}

impl Recommender {
    /// Pairs a catalog with its similarity matrix
    ///
    /// The matrix must have one row per movie. Row widths are checked per query.
    pub fn new(catalog: Catalog, matrix: SimilarityMatrix, count: usize) -> AppResult<Self> {
        if matrix.row_count() != catalog.len() {
            return Err(AppError::DataIntegrity(format!(
                "similarity matrix has {} rows but the catalog has {} movies",
                matrix.row_count(),
                catalog.len()
            )));
        }

        if let Some((row, width)) = matrix.first_ragged_row() {
            tracing::warn!(
                row,
                width,
                movies = catalog.len(),
                "Similarity matrix is not square; affected queries will fail"
            );
        }

        Ok(Self {
            catalog,
            matrix,
            count,
        })
    }

    /// Loads both artifacts from the paths in `config`
    pub fn load(config: &Config) -> AppResult<Self> {
        Self::from_sources(
            &FileSource::new(&config.movies_path),
            &FileSource::new(&config.similarity_path),
            config.recommendation_count,
        )
    }

    pub fn from_sources(
        catalog_source: &dyn ArtifactSource,
        matrix_source: &dyn ArtifactSource,
        count: usize,
    ) -> AppResult<Self> {
        let started = Instant::now();
        let catalog = Catalog::load(catalog_source)?;
        let matrix = SimilarityMatrix::load(matrix_source)?;
        let recommender = Self::new(catalog, matrix, count)?;

        tracing::info!(
            movies = recommender.catalog.len(),
            catalog = %catalog_source.name(),
            similarity = %matrix_source.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recommendation data loaded"
        );

        Ok(recommender)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Every known title, in catalog order
    pub fn movie_titles(&self) -> Vec<&str> {
        self.catalog.titles().collect()
    }

    /// Movies most similar to `title`
    ///
    /// Fails with `NotFound` for an unknown title and `DataIntegrity` when the
    /// matrix row does not line up with the catalog.
    pub fn recommend(&self, title: &str) -> AppResult<Vec<Recommendation>> {
        let index = self
            .catalog
            .index_of(title)
            .ok_or_else(|| AppError::NotFound(title.to_string()))?;

        let neighbors = engine::rank(index, &self.matrix, self.catalog.len(), self.count)?;

        neighbors
            .into_iter()
            .enumerate()
            .map(|(position, neighbor)| {
                let movie = self.catalog.get(neighbor.index).ok_or_else(|| {
                    AppError::Internal(format!("ranked index {} has no movie", neighbor.index))
                })?;
                Ok(Recommendation {
                    rank: position + 1,
                    title: movie.title.clone(),
                    movie_id: movie.movie_id,
                    score: neighbor.score,
                })
            })
            .collect()
    }

    /// Like [`Recommender::recommend`], but never fails
    ///
    /// Errors are logged and turned into an empty list.
    pub fn scored_recommendations(&self, title: &str) -> Vec<Recommendation> {
        match self.recommend(title) {
            Ok(recommendations) => recommendations,
            Err(AppError::NotFound(_)) => {
                tracing::info!(title = %title, "Recommendation requested for unknown title");
                Vec::new()
            }
            Err(AppError::DataIntegrity(reason)) => {
                tracing::error!(title = %title, reason = %reason, "Similarity data does not match catalog");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(title = %title, error = %e, "Recommendation failed");
                Vec::new()
            }
        }
    }

    /// Titles of the movies most similar to `title`, empty when none can be found
    pub fn recommendations(&self, title: &str) -> Vec<String> {
        self.scored_recommendations(title)
            .into_iter()
            .map(|recommendation| recommendation.title)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Movie;
    use crate::source::MemorySource;

    fn movie(title: &str) -> Movie {
        Movie {
            title: title.to_string(),
            movie_id: None,
        }
    }

    fn recommender() -> Recommender {
        let catalog = Catalog::new(
            ["Avatar", "Aliens", "Titanic", "Terminator 2", "The Abyss", "True Lies"]
                .into_iter()
                .map(movie)
                .collect(),
        );
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.8, 0.3, 0.6, 0.7, 0.2],
            vec![0.8, 1.0, 0.1, 0.7, 0.6, 0.3],
            vec![0.3, 0.1, 1.0, 0.2, 0.4, 0.3],
            vec![0.6, 0.7, 0.2, 1.0, 0.3, 0.5],
            vec![0.7, 0.6, 0.4, 0.3, 1.0, 0.1],
            vec![0.2, 0.3, 0.3, 0.5, 0.1, 1.0],
        ]);
        Recommender::new(catalog, matrix, 3).unwrap()
    }

    #[test]
    fn test_recommendations_by_title() {
        assert_eq!(
            recommender().recommendations("Avatar"),
            vec!["Aliens", "The Abyss", "Terminator 2"]
        );
    }

    #[test]
    fn test_recommend_reports_rank_and_score() {
        let result = recommender().recommend("Titanic").unwrap();
        assert_eq!(
            result[0],
            Recommendation {
                rank: 1,
                title: "The Abyss".to_string(),
                movie_id: None,
                score: 0.4
            }
        );
        // 0.3 ties between Avatar and True Lies keep catalog order
        assert_eq!(result[1].title, "Avatar");
        assert_eq!(result[2].title, "True Lies");
        assert_eq!(result[2].rank, 3);
    }

    #[test]
    fn test_unknown_title_is_empty_not_error() {
        let recommender = recommender();
        assert!(recommender.recommendations("Nonexistent Film Title").is_empty());
        assert!(matches!(
            recommender.recommend("Nonexistent Film Title"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_titles_in_catalog_order() {
        let recommender = recommender();
        assert_eq!(recommender.movie_titles().len(), 6);
        assert_eq!(recommender.movie_titles()[3], "Terminator 2");
    }

    #[test]
    fn test_row_count_mismatch_rejected() {
        let catalog = Catalog::new(vec![movie("Avatar"), movie("Aliens")]);
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0]]);
        assert!(matches!(
            Recommender::new(catalog, matrix, 5),
            Err(AppError::DataIntegrity(_))
        ));
    }

    #[test]
    fn test_ragged_row_fails_only_that_query() {
        let catalog = Catalog::new(vec![movie("Avatar"), movie("Aliens"), movie("Titanic")]);
        let matrix = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.5, 0.2],
            vec![0.5, 1.0],
            vec![0.2, 0.4, 1.0],
        ]);
        let recommender = Recommender::new(catalog, matrix, 5).unwrap();

        assert_eq!(recommender.recommendations("Avatar"), vec!["Aliens", "Titanic"]);
        assert!(matches!(recommender.recommend("Aliens"), Err(AppError::DataIntegrity(_))));
        assert!(recommender.recommendations("Aliens").is_empty());
    }

    #[test]
    fn test_from_sources_with_corrupted_cells() {
        let catalog = MemorySource::new(
            "movie_dict.json",
            r#"{"movie_id": {"0": 1, "1": 2, "2": 3}, "title": {"0": "Heat", "1": "Ronin", "2": "Collateral"}}"#,
        );
        let matrix = MemorySource::new(
            "similarity.json",
            r#"{"data": [[1.0, "bad", 0.4], [0.2, 1.0, 0.3], [0.4, 0.3, 1.0]]}"#,
        );
        let recommender = Recommender::from_sources(&catalog, &matrix, 5).unwrap();

        assert_eq!(recommender.recommendations("Heat"), vec!["Collateral", "Ronin"]);

        let scored = recommender.recommend("Heat").unwrap();
        assert_eq!(scored[0].movie_id, Some(3));
        assert_eq!(scored[1].score, 0.0);
    }

    #[test]
    fn test_from_sources_propagates_load_error() {
        let catalog = MemorySource::new("movie_dict.json", r#"[{"name": "Heat"}]"#);
        let matrix = MemorySource::new("similarity.json", "[[1.0]]");
        assert!(matches!(
            Recommender::from_sources(&catalog, &matrix, 5),
            Err(AppError::Load(_))
        ));
    }
}
