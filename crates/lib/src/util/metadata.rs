//! Key-value metadata embedded in the comment header of unit scripts.
//!
//! ```text
//! -- @creator.unit.name cpp.gcc
//! -- @creator.description = GCC toolchain
//! ```
//!
//! Lines starting with `--` or `#` are scanned until the first line that is
//! neither blank nor a comment. Within a comment, `@key` may be followed by
//! whitespace, `=` or `:` and then the value.

use std::collections::BTreeMap;
use std::path::Path;

pub type Metadata = BTreeMap<String, String>;

/// Parse the metadata header of `content`.
pub fn parse_metadata(content: &str) -> Metadata {
  let mut metadata = Metadata::new();

  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let Some(comment) = line.strip_prefix("--").or_else(|| line.strip_prefix('#')) else {
      break;
    };
    let Some(entry) = comment.trim_start_matches('-').trim().strip_prefix('@') else {
      continue;
    };

    let key_end = entry
      .find(|c: char| c.is_whitespace() || c == '=' || c == ':')
      .unwrap_or(entry.len());
    let (key, rest) = entry.split_at(key_end);
    if key.is_empty() {
      continue;
    }
    let value = rest.trim_start();
    let value = value
      .strip_prefix('=')
      .or_else(|| value.strip_prefix(':'))
      .unwrap_or(value)
      .trim();
    metadata.insert(key.to_string(), value.to_string());
  }

  metadata
}

/// Read and parse the metadata header of the file at `path`.
pub fn read_metadata(path: &Path) -> std::io::Result<Metadata> {
  let content = std::fs::read_to_string(path)?;
  Ok(parse_metadata(&content))
}
