//! Lexical path normalization.

use std::path::{Component, Path, PathBuf};

/// Normalize `path` without touching the filesystem.
///
/// Removes `.` components and folds `..` into the preceding normal component.
/// Leading `..` components of a relative path are kept. An empty result
/// becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  let mut depth = 0usize;

  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if depth > 0 {
          normalized.pop();
          depth -= 1;
        } else if !normalized.has_root() {
          normalized.push("..");
        }
      }
      Component::Normal(part) => {
        normalized.push(part);
        depth += 1;
      }
      Component::RootDir | Component::Prefix(_) => normalized.push(component),
    }
  }

  if normalized.as_os_str().is_empty() {
    normalized.push(".");
  }
  normalized
}

/// String form of [`normalize`], used for paths taken from macro results.
pub fn normpath(path: &str) -> String {
  normalize(Path::new(path)).to_string_lossy().into_owned()
}
