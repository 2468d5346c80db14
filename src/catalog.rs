use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{error::LoadError, source::ArtifactSource};

const TITLE_FIELD: &str = "title";
const MOVIE_ID_FIELD: &str = "movie_id";

/// A single movie known to the recommender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    /// Display title, also the lookup key
    pub title: String,
    /// Upstream database id, when the artifact carries one
    pub movie_id: Option<u64>,
}

/// Ordered collection of movies
///
/// A movie's position is its index into the similarity matrix and stays stable for
/// the lifetime of the loaded catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    movies: Vec<Movie>,
}

impl Catalog {
    pub fn new(movies: Vec<Movie>) -> Self {
        Self { movies }
    }

    /// Loads a catalog from a JSON artifact
    ///
    /// Accepts either a list of records (`[{"title": ...}, ...]`) or a
    /// dictionary-of-columns table (`{"title": {"0": ...}, "movie_id": {"0": ...}}`).
    pub fn load(source: &dyn ArtifactSource) -> Result<Self, LoadError> {
        let artifact = source.name();
        let value: Value = crate::source::read_json(source)?;

        let movies = match value {
            Value::Array(records) => movies_from_records(&artifact, records)?,
            Value::Object(columns) => movies_from_columns(&artifact, columns)?,
            other => {
                return Err(LoadError::Invalid {
                    artifact,
                    reason: format!("expected a list of records or a column table, found {}", kind(&other)),
                })
            }
        };

        tracing::debug!(artifact = %artifact, movies = movies.len(), "Catalog loaded");
        Ok(Self { movies })
    }

    /// Position of the first movie whose title matches exactly
    pub fn index_of(&self, title: &str) -> Option<usize> {
        self.movies.iter().position(|movie| movie.title == title)
    }

    /// Title of the movie at `index`
    pub fn title_at(&self, index: usize) -> Option<&str> {
        self.movies.get(index).map(|movie| movie.title.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&Movie> {
        self.movies.get(index)
    }

    /// All titles in catalog order
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.movies.iter().map(|movie| movie.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

fn movies_from_records(artifact: &str, records: Vec<Value>) -> Result<Vec<Movie>, LoadError> {
    records
        .into_iter()
        .enumerate()
        .map(|(position, record)| {
            let Value::Object(mut fields) = record else {
                return Err(LoadError::Invalid {
                    artifact: artifact.to_string(),
                    reason: format!("record {position} is not an object"),
                });
            };

            let title = fields.remove(TITLE_FIELD).ok_or_else(|| LoadError::MissingField {
                artifact: artifact.to_string(),
                field: TITLE_FIELD.to_string(),
            })?;

            Ok(Movie {
                title: expect_title(artifact, position, title)?,
                movie_id: fields.get(MOVIE_ID_FIELD).and_then(Value::as_u64),
            })
        })
        .collect()
}

fn movies_from_columns(artifact: &str, mut columns: Map<String, Value>) -> Result<Vec<Movie>, LoadError> {
    let titles = columns.remove(TITLE_FIELD).ok_or_else(|| LoadError::MissingField {
        artifact: artifact.to_string(),
        field: TITLE_FIELD.to_string(),
    })?;
    let titles = column_rows(artifact, TITLE_FIELD, titles)?;

    let ids: BTreeMap<usize, u64> = match columns.remove(MOVIE_ID_FIELD) {
        Some(column) => column_rows(artifact, MOVIE_ID_FIELD, column)?
            .into_iter()
            .filter_map(|(label, id)| id.as_u64().map(|id| (label, id)))
            .collect(),
        None => BTreeMap::new(),
    };

    if let Some((position, (label, _))) = titles
        .iter()
        .enumerate()
        .find(|(position, (label, _))| position != label)
    {
        tracing::warn!(
            artifact = %artifact,
            position,
            label,
            movies = titles.len(),
            "Catalog row labels have gaps; movies are indexed by position"
        );
    }

    titles
        .into_iter()
        .enumerate()
        .map(|(position, (label, title))| {
            Ok(Movie {
                title: expect_title(artifact, position, title)?,
                movie_id: ids.get(&label).copied(),
            })
        })
        .collect()
}

/// Labelled rows of one column, in ascending label order
///
/// Columns are either plain arrays, labelled by position, or maps keyed by integer
/// row label. Labels may have gaps but must not repeat.
fn column_rows(artifact: &str, name: &str, column: Value) -> Result<Vec<(usize, Value)>, LoadError> {
    let labelled = match column {
        Value::Array(values) => return Ok(values.into_iter().enumerate().collect()),
        Value::Object(labelled) => labelled,
        other => {
            return Err(LoadError::Invalid {
                artifact: artifact.to_string(),
                reason: format!("`{name}` column is {}, expected an array or object", kind(&other)),
            })
        }
    };

    let mut rows = labelled
        .into_iter()
        .map(|(label, value)| {
            label
                .trim()
                .parse::<usize>()
                .map(|position| (position, value))
                .map_err(|_| LoadError::Invalid {
                    artifact: artifact.to_string(),
                    reason: format!("`{name}` column has non-integer row label {label:?}"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    rows.sort_by_key(|(label, _)| *label);

    if let Some(pair) = rows.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(LoadError::Invalid {
            artifact: artifact.to_string(),
            reason: format!("`{name}` column repeats row label {}", pair[0].0),
        });
    }

    Ok(rows)
}

fn expect_title(artifact: &str, position: usize, value: Value) -> Result<String, LoadError> {
    match value {
        Value::String(title) => Ok(title),
        other => Err(LoadError::Invalid {
            artifact: artifact.to_string(),
            reason: format!("title of row {position} is {}, expected a string", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
