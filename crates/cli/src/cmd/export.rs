//! Implementation of the `creator export` command.
//!
//! Loads the main unit, sets up every target and writes the ninja file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use creator_lib::consts::NINJA_OUT_VAR;
use creator_lib::ninja;

use super::session::{Session, SessionOptions};
use crate::output::{plural, print_info, print_success};

const DEFAULT_NINJA_FILE: &str = "build.ninja";

pub fn cmd_export(options: &SessionOptions, targets: &[String], output: Option<PathBuf>) -> Result<()> {
  let session = Session::open(options)?;
  session.setup()?;
  let selected = session.resolve(targets)?;

  let output = match output {
    Some(path) => path,
    None if session.main.defined(NINJA_OUT_VAR) => PathBuf::from(
      session
        .main
        .eval(&format!("${{{NINJA_OUT_VAR}}}"))
        .with_context(|| format!("Failed to evaluate {NINJA_OUT_VAR}"))?,
    ),
    None => PathBuf::from(DEFAULT_NINJA_FILE),
  };

  let file = File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?;
  let mut writer = BufWriter::new(file);
  let subset = (!selected.is_empty()).then_some(selected.as_slice());
  ninja::export(&mut writer, &session.workspace, Some(session.main.as_ref()), subset)
    .with_context(|| format!("Failed to export {}", output.display()))?;
  writer
    .flush()
    .with_context(|| format!("Failed to write {}", output.display()))?;

  let count = if selected.is_empty() {
    session.workspace.all_targets().iter().filter(|decl| decl.is_target()).count()
  } else {
    selected.len()
  };
  print_success(&format!("Exported {} to {}", plural(count, "target"), output.display()));
  print_info(&format!("Run: ninja -f {}", output.display()));
  Ok(())
}
