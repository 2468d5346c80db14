use std::path::PathBuf;

use crate::error::LoadError;

/// Where a startup artifact comes from
///
/// The catalog and the similarity matrix are both produced offline; loaders only
/// need their raw bytes and a name to put in error messages.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactSource: Send + Sync {
    /// Human-readable name used in logs and errors
    fn name(&self) -> String;

    /// Reads the full artifact
    fn read(&self) -> std::io::Result<Vec<u8>>;
}

/// Artifact stored on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArtifactSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// Artifact already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl ArtifactSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Reads an artifact and deserializes it as JSON
pub(crate) fn read_json<T>(source: &dyn ArtifactSource) -> Result<T, LoadError>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = source.read().map_err(|error| LoadError::Io {
        artifact: source.name(),
        error,
    })?;

    serde_json::from_slice(&bytes).map_err(|error| LoadError::Malformed {
        artifact: source.name(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_reports_io_failure() {
        let mut source = MockArtifactSource::new();
        source.expect_name().return_const("movies.json".to_string());
        source
            .expect_read()
            .returning(|| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")));

        let err = read_json::<serde_json::Value>(&source).unwrap_err();
        assert!(matches!(err, LoadError::Io { ref artifact, .. } if artifact == "movies.json"));
    }

    #[test]
    fn test_read_json_reports_malformed_json() {
        let source = MemorySource::new("broken.json", "[1, 2");
        let err = read_json::<serde_json::Value>(&source).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("missing.json"));
        let err = read_json::<serde_json::Value>(&source).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
