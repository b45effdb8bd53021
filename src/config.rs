use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

use crate::error::TagbaseError;

/// Default file name looked up in a document root.
pub const CONFIG_FILE_NAME: &str = "tagbase.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagbaseConfig {
    /// Directory holding the documents.
    pub root: PathBuf,
    /// Which files under `root` are documents, matched against the path relative to `root`.
    pub glob: String,
    /// Quiet period before a burst of file changes is delivered.
    pub debounce_ms: u64,
    /// Skip files and directories whose name starts with `.`.
    pub ignore_hidden: bool,
    /// Inserted before each linked document appended to an expanded body.
    pub link_separator: String,
}

impl Default for TagbaseConfig {
    fn default() -> Self {
        TagbaseConfig {
            root: PathBuf::from("."),
            glob: "**/*.md".to_string(),
            debounce_ms: 500,
            ignore_hidden: true,
            link_separator: "\n\n---\n\n".to_string(),
        }
    }
}

impl TagbaseConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<TagbaseConfig, TagbaseError> {
        tracing::debug!("Attempting to read config from: {:?}", path);
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(TagbaseConfig::default());
        }
        let content = read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TagbaseError::Config(format!("{path:?} is not a valid config: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), TagbaseError> {
        tracing::debug!("Attempting to write config to: {:?}", path);
        let toml_string = toml::to_string(self)?;
        write(path, toml_string)?;
        Ok(())
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}
