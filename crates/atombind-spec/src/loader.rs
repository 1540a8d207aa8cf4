//! Locating and reading the serialized specification blob.
//!
//! The blob is searched for at an ordered list of candidate locations: the
//! directory holding the running executable first (the package-adjacent
//! location), then the current working directory. The first readable file
//! wins; absence at every candidate is a fatal startup error.

use std::path::{Path, PathBuf};

use log::debug;

use crate::descriptors::BindingSpec;
use crate::SpecError;

/// File name of the specification blob.
pub const SPEC_FILE_NAME: &str = "atombind.spec.json";

/// The ordered candidate locations for the specification file.
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(SPEC_FILE_NAME));
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(SPEC_FILE_NAME));
    }
    candidates
}

/// Load the specification from the default candidate locations.
pub fn load_specification() -> Result<BindingSpec, SpecError> {
    load_from_candidates(&default_candidates())
}

/// Load the specification from an explicit ordered candidate list.
/// The first candidate that can be read wins.
pub fn load_from_candidates(candidates: &[PathBuf]) -> Result<BindingSpec, SpecError> {
    for path in candidates {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!("loading specification from {}", path.display());
                return parse_spec(&content, path);
            }
            Err(_) => continue,
        }
    }
    Err(SpecError::Missing { candidates: candidates.to_vec() })
}

fn parse_spec(content: &str, path: &Path) -> Result<BindingSpec, SpecError> {
    serde_json::from_str(content).map_err(|e| SpecError::Invalid {
        reason: format!("{}: {}", path.display(), e),
    })
}
