use serde::Deserialize;

use crate::engine::DEFAULT_RECOMMENDATION_COUNT;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Path to the movie catalog artifact
    #[serde(default = "default_movies_path")]
    pub movies_path: String,

    /// Path to the similarity matrix artifact
    #[serde(default = "default_similarity_path")]
    pub similarity_path: String,

    /// Number of recommendations returned per query
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_movies_path() -> String {
    "movie_dict.json".to_string()
}

fn default_similarity_path() -> String {
    "similarity.json".to_string()
}

fn default_recommendation_count() -> usize {
    DEFAULT_RECOMMENDATION_COUNT
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            movies_path: default_movies_path(),
            similarity_path: default_similarity_path(),
            recommendation_count: default_recommendation_count(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.recommendation_count == 0 {
            anyhow::bail!("Failed to load config: RECOMMENDATION_COUNT must be at least 1");
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
