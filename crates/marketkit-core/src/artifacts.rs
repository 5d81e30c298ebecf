//! Persisted deploy artifacts, one `.boc` file per target.

use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Extension of persisted deploy artifacts.
pub const ARTIFACT_EXTENSION: &str = "boc";

/// Serialized deploy function cell of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployArtifact {
    pub target: String,
    pub bytes: Vec<u8>,
}

impl DeployArtifact {
    /// Decode a hex BoC reported by the sandbox.
    pub fn from_hex(target: &str, payload: &str) -> Result<Self> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(Error::Payload(format!("empty payload for {}", target)));
        }
        let bytes = hex::decode(payload)
            .map_err(|e| Error::Payload(format!("{} for {}", e, target)))?;

        Ok(Self {
            target: target.to_string(),
            bytes,
        })
    }
}

/// Directory of persisted artifacts.
#[derive(Debug, Clone)]
pub struct DeployArtifacts {
    dir: PathBuf,
}

impl DeployArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, target: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", target, ARTIFACT_EXTENSION))
    }

    /// Write an artifact, creating the directory if needed.
    pub fn persist(&self, artifact: &DeployArtifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::write(&self.dir, e))?;

        let path = self.path_for(&artifact.target);
        fs::write(&path, &artifact.bytes).map_err(|e| Error::write(&path, e))?;
        Ok(path)
    }

    /// Read a previously persisted artifact.
    pub fn load(&self, target: &str) -> Result<DeployArtifact> {
        let path = self.path_for(target);
        let bytes = fs::read(&path).map_err(|e| Error::read(&path, e))?;
        Ok(DeployArtifact {
            target: target.to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_hex() {
        let artifact = DeployArtifact::from_hex("TonSimpleSale", " b5ee9c72\n").unwrap();
        assert_eq!(artifact.bytes, vec![0xb5, 0xee, 0x9c, 0x72]);

        assert!(matches!(
            DeployArtifact::from_hex("TonSimpleSale", "xyz"),
            Err(Error::Payload(_))
        ));
        assert!(matches!(
            DeployArtifact::from_hex("TonSimpleSale", ""),
            Err(Error::Payload(_))
        ));
    }

    #[test]
    fn test_persist_creates_dir_and_loads_back() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let store = DeployArtifacts::new(temp.path().join("deploy_functions_compiled"));
        let artifact = DeployArtifact::from_hex("MultipleOffer", "b5ee9c7241").unwrap();

        let path = store.persist(&artifact).unwrap();

        assert!(path.ends_with("deploy_functions_compiled/MultipleOffer.boc"));
        assert_eq!(store.load("MultipleOffer").unwrap(), artifact);
        assert!(matches!(store.load("Other"), Err(Error::Read { .. })));
    }
}
