//! Locating unit scripts in the search path.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::consts::{UNIT_FILE_NAME, UNIT_FILE_SUFFIX, UNIT_NAME_KEY};
use crate::util::metadata::Metadata;

/// Returns true for `*.creator` files (`.creator` itself included) and files
/// named `Creator`.
pub fn is_unit_file(path: &Path) -> bool {
  match path.file_name().and_then(|name| name.to_str()) {
    Some(UNIT_FILE_NAME) => true,
    Some(name) => name.ends_with(UNIT_FILE_SUFFIX),
    None => false,
  }
}

/// Unit scripts in `dir` and its direct subdirectories, in file name order.
///
/// Missing or unreadable directories yield nothing.
pub fn scan_dir(dir: &Path) -> Vec<PathBuf> {
  let files: Vec<PathBuf> = WalkDir::new(dir)
    .min_depth(1)
    .max_depth(2)
    .sort_by_file_name()
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file() && is_unit_file(e.path()))
    .map(|e| e.into_path())
    .collect();
  debug!(dir = ?dir, count = files.len(), "scanned for unit files");
  files
}

/// Identifier declared by the unit file at `path`.
///
/// Taken from the `@creator.unit.name` metadata key, else from the file stem.
/// Files named `Creator` or `.creator` have no usable stem and must carry
/// the key.
pub fn unit_identifier(path: &Path, metadata: &Metadata) -> Option<String> {
  if let Some(name) = metadata.get(UNIT_NAME_KEY)
    && !name.is_empty()
  {
    return Some(name.clone());
  }

  let file_name = path.file_name()?.to_str()?;
  let stem = file_name.strip_suffix(UNIT_FILE_SUFFIX).filter(|stem| !stem.is_empty())?;
  warn!(path = ?path, "unit file has no @{UNIT_NAME_KEY}, using '{stem}'");
  Some(stem.to_string())
}
