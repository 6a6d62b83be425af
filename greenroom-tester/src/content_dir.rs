//! Filesystem-backed content source: `manifest.json` plus one
//! `scenes/<id>.json` per scene.

use greenroom_engine::ContentSource;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirSourceError {
    #[error("scene id '{id}' is not a plain file name")]
    InvalidId { id: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Content source over an on-disk content directory.
#[derive(Debug, Clone)]
pub struct DirContentSource {
    root: PathBuf,
}

impl DirContentSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_json(path: &Path) -> Result<Value, DirSourceError> {
        let text = fs::read_to_string(path).map_err(|source| DirSourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DirSourceError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

impl ContentSource for DirContentSource {
    type Error = DirSourceError;

    fn load_manifest(&self) -> Result<Value, Self::Error> {
        Self::read_json(&self.root.join("manifest.json"))
    }

    fn load_scene(&self, scene_id: &str) -> Result<Value, Self::Error> {
        // Scene ids come from content; never let one escape the directory.
        if scene_id.contains(['/', '\\']) || scene_id.contains("..") {
            return Err(DirSourceError::InvalidId {
                id: scene_id.to_string(),
            });
        }
        Self::read_json(&self.root.join("scenes").join(format!("{scene_id}.json")))
    }
}
