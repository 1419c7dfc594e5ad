//! Workspace and main-unit loading shared by the commands.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context as _, Result, anyhow, bail};
use tracing::debug;

use creator_lib::consts::{UNIT_FILE_SUFFIX, UNIT_NAME_KEY};
use creator_lib::context::Context;
use creator_lib::lua::LuaHost;
use creator_lib::macros::Expr;
use creator_lib::target::DeclRef;
use creator_lib::unit::Unit;
use creator_lib::util::metadata::read_metadata;
use creator_lib::workspace::discover::{is_unit_file, unit_identifier};
use creator_lib::workspace::{Workspace, WorkspaceConfig};

/// Global options that shape the session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
  /// `KEY=VALUE` pairs bound as literals.
  pub defines: Vec<String>,
  /// `KEY=VALUE` pairs whose value is parsed as macro text.
  pub macros: Vec<String>,
  pub unit_path: Vec<PathBuf>,
  pub unit: Option<String>,
}

/// A workspace with its main unit loaded.
pub struct Session {
  pub workspace: Rc<Workspace>,
  pub main: Rc<Unit>,
}

impl Session {
  /// Open the workspace and load the main unit.
  pub fn open(options: &SessionOptions) -> Result<Self> {
    let workspace = open_workspace(options)?;
    let identifier = match &options.unit {
      Some(identifier) => identifier.clone(),
      None => {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        detect_main_unit(&cwd)?
      }
    };
    debug!(unit = %identifier, "main unit");

    let main = workspace
      .load_unit(&identifier)
      .with_context(|| format!("Failed to load unit '{identifier}'"))?;
    Ok(Self { workspace, main })
  }

  /// Set up every concrete target and task.
  pub fn setup(&self) -> Result<()> {
    self.workspace.setup_targets().context("Failed to set up targets")
  }

  /// Resolve `names` relative to the main unit.
  pub fn resolve(&self, names: &[String]) -> Result<Vec<DeclRef>> {
    names
      .iter()
      .map(|name| {
        self
          .workspace
          .get_target(name, Some(self.main.as_ref()))
          .with_context(|| format!("Unknown target '{name}'"))
      })
      .collect()
  }
}

/// Create the workspace: search path from the environment plus `-I`, the home
/// profile, then `-D`/`-M` bindings, which override the home profile.
///
/// Directory `.creator_profile` scripts run later, when the first unit of
/// their directory loads, and can still override command line bindings.
pub fn open_workspace(options: &SessionOptions) -> Result<Rc<Workspace>> {
  let host = LuaHost::new()
    .map_err(|e| anyhow!("{e}"))
    .context("Failed to create Lua runtime")?;
  let workspace = Workspace::new(WorkspaceConfig::from_env(), Rc::new(host));
  for dir in &options.unit_path {
    workspace.add_search_path(dir.clone());
  }

  workspace.run_home_profile().context("Failed to run home profile")?;

  for define in &options.defines {
    let (key, value) = split_assignment(define)?;
    workspace.context().set(key, Expr::raw(value));
  }
  for assignment in &options.macros {
    let (key, value) = split_assignment(assignment)?;
    let expr = workspace.context().parse(value);
    workspace.context().set(key, expr);
  }
  Ok(workspace)
}

fn split_assignment(text: &str) -> Result<(&str, &str)> {
  match text.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key, value)),
    _ => Err(anyhow!("Expected KEY=VALUE, got '{text}'")),
  }
}

/// The unit declared in `dir`: the first unit file carrying
/// `@creator.unit.name`, `.creator` before the others, else the only unit
/// file present.
pub fn detect_main_unit(dir: &Path) -> Result<String> {
  let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
    .with_context(|| format!("Failed to read {}", dir.display()))?
    .filter_map(|entry| entry.ok())
    .map(|entry| entry.path())
    .filter(|path| path.is_file() && is_unit_file(path))
    .collect();
  candidates.sort_by_key(|path| (path.file_name() != Some(OsStr::new(UNIT_FILE_SUFFIX)), path.clone()));

  for path in &candidates {
    let metadata = read_metadata(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if let Some(name) = metadata.get(UNIT_NAME_KEY)
      && !name.is_empty()
    {
      return Ok(name.clone());
    }
  }

  match candidates.as_slice() {
    [] => bail!("No unit file in {}; pass --unit", dir.display()),
    [single] => {
      let metadata = read_metadata(single).with_context(|| format!("Failed to read {}", single.display()))?;
      unit_identifier(single, &metadata)
        .ok_or_else(|| anyhow!("Cannot name the unit in {}; pass --unit", single.display()))
    }
    _ => bail!(
      "Several unit files in {} and none sets @{UNIT_NAME_KEY}; pass --unit",
      dir.display()
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn metadata_names_the_main_unit() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.creator"), "define('X', '1')\n").unwrap();
    std::fs::write(temp.path().join("b.creator"), "-- @creator.unit.name app\n").unwrap();
    assert_eq!(detect_main_unit(temp.path()).unwrap(), "app");
  }

  #[test]
  fn dot_creator_is_the_main_unit() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(".creator"), "-- @creator.unit.name app\n").unwrap();
    assert_eq!(detect_main_unit(temp.path()).unwrap(), "app");
  }

  #[test]
  fn dot_creator_wins_over_other_named_units() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("Creator"), "-- @creator.unit.name other\n").unwrap();
    std::fs::write(temp.path().join(".creator"), "-- @creator.unit.name app\n").unwrap();
    assert_eq!(detect_main_unit(temp.path()).unwrap(), "app");
  }

  #[test]
  fn unnamed_dot_creator_is_rejected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(".creator"), "define('X', '1')\n").unwrap();
    let err = detect_main_unit(temp.path()).unwrap_err();
    assert!(err.to_string().contains("Cannot name the unit"), "{err}");
  }

  #[test]
  fn single_file_uses_its_stem() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("hello.creator"), "").unwrap();
    assert_eq!(detect_main_unit(temp.path()).unwrap(), "hello");
  }

  #[test]
  fn ambiguous_or_missing() {
    let temp = TempDir::new().unwrap();
    assert!(detect_main_unit(temp.path()).is_err());

    std::fs::write(temp.path().join("a.creator"), "").unwrap();
    std::fs::write(temp.path().join("b.creator"), "").unwrap();
    assert!(detect_main_unit(temp.path()).is_err());
  }

  #[test]
  fn assignments() {
    assert_eq!(split_assignment("CC=clang").unwrap(), ("CC", "clang"));
    assert_eq!(split_assignment("Flags=-O2 -g").unwrap(), ("Flags", "-O2 -g"));
    assert_eq!(split_assignment("Empty=").unwrap(), ("Empty", ""));
    assert!(split_assignment("=x").is_err());
    assert!(split_assignment("novalue").is_err());
  }
}
