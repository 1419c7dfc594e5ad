//! Implementation of the `creator clean` command.
//!
//! Removes the output files of the given targets (all targets when none are
//! given), optionally including everything they depend on.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use creator_lib::target::dependency_order;

use super::session::{Session, SessionOptions};
use crate::output::{plural, print_success};

pub fn cmd_clean(options: &SessionOptions, targets: &[String], with_deps: bool) -> Result<()> {
  let session = Session::open(options)?;
  session.setup()?;

  let roots = if targets.is_empty() {
    session.workspace.all_targets()
  } else {
    session.resolve(targets)?
  };
  let decls = if with_deps { dependency_order(&roots) } else { roots };

  let outputs: BTreeSet<String> = decls
    .iter()
    .filter(|decl| decl.is_target())
    .flat_map(|decl| decl.outputs())
    .collect();

  let mut removed = 0;
  for output in &outputs {
    let path = Path::new(output);
    if path.is_file() {
      std::fs::remove_file(path).with_context(|| format!("Failed to remove {output}"))?;
      debug!(path = %output, "removed");
      removed += 1;
    }
  }

  print_success(&format!("Removed {}", plural(removed, "file")));
  Ok(())
}
