//! A scratch project whose units are real Lua scripts.

use std::path::Path;
use std::rc::Rc;

use creator_lib::lua::LuaHost;
use creator_lib::ninja;
use creator_lib::workspace::{Workspace, WorkspaceConfig};
use tempfile::TempDir;

pub struct Project {
  dir: TempDir,
  pub workspace: Rc<Workspace>,
}

impl Project {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let config = WorkspaceConfig {
      search_path: vec![dir.path().to_path_buf()],
    };
    let host = LuaHost::new().unwrap();
    let workspace = Workspace::new(config, Rc::new(host));
    Self { dir, workspace }
  }

  pub fn root(&self) -> &Path {
    self.dir.path()
  }

  pub fn write(&self, relative: &str, content: &str) {
    let path = self.dir.path().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  /// Write unit `identifier` as `<dir>/<identifier>.creator`.
  pub fn unit_in(&self, dir: &str, identifier: &str, body: &str) {
    let relative = if dir.is_empty() {
      format!("{identifier}.creator")
    } else {
      format!("{dir}/{identifier}.creator")
    };
    self.write(&relative, &format!("-- @creator.unit.name {identifier}\n{body}"));
  }

  pub fn unit(&self, identifier: &str, body: &str) {
    self.unit_in("", identifier, body);
  }

  /// Load `main`, set up every target and render the ninja file.
  pub fn export(&self, main: &str) -> String {
    let unit = self.workspace.load_unit(main).unwrap();
    self.workspace.setup_targets().unwrap();
    let mut out = Vec::new();
    ninja::export(&mut out, &self.workspace, Some(unit.as_ref()), None).unwrap();
    String::from_utf8(out).unwrap()
  }
}
