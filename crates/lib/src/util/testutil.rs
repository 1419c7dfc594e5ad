//! Test helpers: a scratch directory holding unit files, and a script host
//! whose "scripts" are Rust closures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tempfile::TempDir;

use crate::consts::{PROFILE_FILE_NAME, UNIT_FILE_SUFFIX, UNIT_NAME_KEY};
use crate::host::{HostError, ScriptHost};
use crate::unit::Unit;
use crate::workspace::{Workspace, WorkspaceConfig};

type Script = Box<dyn Fn(&Rc<Unit>) -> Result<(), HostError>>;

/// Runs the closure registered for a file's name. Files without one are empty
/// scripts.
#[derive(Default)]
pub struct FnHost {
  scripts: RefCell<HashMap<String, Rc<Script>>>,
}

impl FnHost {
  pub fn register(&self, file_name: &str, script: impl Fn(&Rc<Unit>) -> Result<(), HostError> + 'static) {
    self
      .scripts
      .borrow_mut()
      .insert(file_name.to_string(), Rc::new(Box::new(script)));
  }
}

impl ScriptHost for FnHost {
  fn execute(&self, unit: &Rc<Unit>, path: &Path) -> Result<(), HostError> {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let script = self.scripts.borrow().get(&file_name).cloned();
    match script {
      Some(script) => script(unit),
      None => Ok(()),
    }
  }
}

/// A workspace searching only a fresh temporary directory.
pub struct TestWorkspace {
  dir: TempDir,
  host: Rc<FnHost>,
  workspace: Rc<Workspace>,
}

impl TestWorkspace {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let host = Rc::new(FnHost::default());
    let config = WorkspaceConfig {
      search_path: vec![dir.path().to_path_buf()],
    };
    let workspace = Workspace::new(config, host.clone());
    Self { dir, host, workspace }
  }

  pub fn root(&self) -> &Path {
    self.dir.path()
  }

  pub fn workspace(&self) -> &Rc<Workspace> {
    &self.workspace
  }

  /// Write `content` to `relative` below the root, creating directories.
  pub fn write_file(&self, relative: &str, content: &str) {
    let path = self.dir.path().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  /// Add unit `identifier` whose script is `script`.
  pub fn add_unit(&self, identifier: &str, script: impl Fn(&Rc<Unit>) -> Result<(), HostError> + 'static) {
    let file_name = format!("{identifier}{UNIT_FILE_SUFFIX}");
    self.write_file(&file_name, &format!("-- @{UNIT_NAME_KEY} {identifier}\n"));
    self.host.register(&file_name, script);
  }

  /// Add a `.creator_profile` in the root directory.
  pub fn add_profile(&self, script: impl Fn(&Rc<Unit>) -> Result<(), HostError> + 'static) {
    self.write_file(PROFILE_FILE_NAME, "");
    self.host.register(PROFILE_FILE_NAME, script);
  }

  /// Add and load a unit with an empty script.
  pub fn bare_unit(&self, identifier: &str) -> Rc<Unit> {
    self.add_unit(identifier, |_| Ok(()));
    self.workspace.load_unit(identifier).unwrap()
  }
}
