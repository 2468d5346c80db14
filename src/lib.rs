pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod middleware;
pub mod recommender;
pub mod source;

pub use catalog::{Catalog, Movie};
pub use config::Config;
pub use engine::{recommend, Neighbor};
pub use error::{AppError, AppResult, LoadError};
pub use matrix::SimilarityMatrix;
pub use recommender::{Recommendation, Recommender};
