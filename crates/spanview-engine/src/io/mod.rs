use std::fs;
use std::path::{Path, PathBuf};

use crate::model::ModelTree;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid model file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read a model tree from a JSON file.
pub fn load_model(path: &Path) -> Result<ModelTree, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(IoError::Io)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a model tree to a JSON file, creating parent directories as needed.
pub fn save_model(path: &Path, model: &ModelTree) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }
    let content = serde_json::to_string_pretty(model)?;
    fs::write(path, content).map_err(IoError::Io)
}
