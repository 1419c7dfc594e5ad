//! Session state: the search path, the global context and the unit registry.
//!
//! A [`Workspace`] lives for one session. Units are discovered by scanning the
//! search path for unit files, loaded on first use and cached by identifier.
//! Profile scripts (`.creator_profile`) run at most once, keyed by their
//! normalized path.

pub mod discover;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{PROFILE_FILE_NAME, SEARCH_PATH_ENV, STATIC_UNIT_PREFIX};
use crate::context::GlobalContext;
use crate::host::{HostError, ScriptHost};
use crate::macros::MacroError;
use crate::platform::paths::{builtins_dir, home_dir};
use crate::target::{DeclError, DeclRef};
use crate::unit::Unit;
use crate::util::ident::{split_var, validate_identifier};
use crate::util::metadata::{Metadata, read_metadata};
use crate::util::path::normalize;

/// A unit outlived the workspace it was loaded into.
#[derive(Debug, Clone, Copy, Error)]
#[error("workspace was dropped while its units were still in use")]
pub struct Detached;

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("unit '{0}' not found in the search path")]
  UnitNotFound(String),

  #[error("no unit '{0}' is loaded")]
  NoSuchUnit(String),

  #[error("invalid unit identifier: '{0}'")]
  InvalidIdentifier(String),

  #[error("failed to execute '{}'", path.display())]
  Script {
    path: PathBuf,
    #[source]
    source: HostError,
  },

  #[error("I/O error on '{}'", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Detached(#[from] Detached),

  #[error(transparent)]
  Macro(#[from] MacroError),
}

/// Where units are searched for.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
  pub search_path: Vec<PathBuf>,
}

impl WorkspaceConfig {
  /// The default search path: the current directory, the built-in scripts
  /// directory, then every entry of `CREATORPATH`.
  pub fn from_env() -> Self {
    let mut search_path = vec![PathBuf::from(".")];
    if let Some(dir) = builtins_dir() {
      search_path.push(dir);
    }
    if let Some(paths) = std::env::var_os(SEARCH_PATH_ENV) {
      search_path.extend(std::env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
    }
    Self { search_path }
  }
}

pub struct Workspace {
  this: Weak<Workspace>,
  search_path: RefCell<Vec<PathBuf>>,
  context: GlobalContext,
  units: RefCell<BTreeMap<String, Rc<Unit>>>,
  statics: RefCell<BTreeMap<PathBuf, Rc<Unit>>>,
  ident_cache: RefCell<BTreeMap<String, PathBuf>>,
  metadata_cache: RefCell<HashMap<PathBuf, Metadata>>,
  host: Rc<dyn ScriptHost>,
}

impl fmt::Debug for Workspace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Workspace")
      .field("search_path", &self.search_path.borrow())
      .field("units", &self.units.borrow().keys().collect::<Vec<_>>())
      .finish_non_exhaustive()
  }
}

impl Workspace {
  pub fn new(config: WorkspaceConfig, host: Rc<dyn ScriptHost>) -> Rc<Self> {
    Rc::new_cyclic(|this| Self {
      this: this.clone(),
      search_path: RefCell::new(config.search_path),
      context: GlobalContext::new(),
      units: RefCell::new(BTreeMap::new()),
      statics: RefCell::new(BTreeMap::new()),
      ident_cache: RefCell::new(BTreeMap::new()),
      metadata_cache: RefCell::new(HashMap::new()),
      host,
    })
  }

  pub fn context(&self) -> &GlobalContext {
    &self.context
  }

  pub fn search_path(&self) -> Vec<PathBuf> {
    self.search_path.borrow().clone()
  }

  pub fn add_search_path(&self, path: impl Into<PathBuf>) {
    self.search_path.borrow_mut().push(path.into());
  }

  /// Metadata header of the file at `path`, read once per session.
  pub fn metadata(&self, path: &Path) -> Result<Metadata, WorkspaceError> {
    if let Some(metadata) = self.metadata_cache.borrow().get(path) {
      return Ok(metadata.clone());
    }
    let metadata = read_metadata(path).map_err(|source| WorkspaceError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    self
      .metadata_cache
      .borrow_mut()
      .insert(path.to_path_buf(), metadata.clone());
    Ok(metadata)
  }

  /// Rebuild the identifier cache from the search path.
  ///
  /// When two files declare the same identifier the first one found wins.
  pub fn rescan(&self) {
    let mut found = BTreeMap::new();
    for dir in self.search_path() {
      for path in discover::scan_dir(&dir) {
        let Ok(metadata) = self.metadata(&path) else {
          continue;
        };
        if let Some(identifier) = discover::unit_identifier(&path, &metadata) {
          found.entry(identifier).or_insert(path);
        }
      }
    }
    debug!(count = found.len(), "rescanned search path");
    *self.ident_cache.borrow_mut() = found;
  }

  /// Path of the unit file declaring `identifier`.
  ///
  /// A cache miss triggers exactly one rescan of the search path.
  pub fn find_unit(&self, identifier: &str) -> Result<PathBuf, WorkspaceError> {
    if let Some(path) = self.ident_cache.borrow().get(identifier) {
      return Ok(path.clone());
    }
    self.rescan();
    self
      .ident_cache
      .borrow()
      .get(identifier)
      .cloned()
      .ok_or_else(|| WorkspaceError::UnitNotFound(identifier.to_string()))
  }

  /// Identifiers of every unit file in the search path.
  pub fn available_units(&self) -> BTreeMap<String, PathBuf> {
    self.rescan();
    self.ident_cache.borrow().clone()
  }

  /// Returns the loaded unit `identifier`, loading it first if needed.
  ///
  /// The unit is registered before its script runs and removed again if the
  /// script fails. A `.creator_profile` next to the unit file runs first.
  pub fn load_unit(&self, identifier: &str) -> Result<Rc<Unit>, WorkspaceError> {
    if let Some(unit) = self.get_unit(identifier) {
      return Ok(unit);
    }
    if !validate_identifier(identifier) {
      return Err(WorkspaceError::InvalidIdentifier(identifier.to_string()));
    }

    let path = self.find_unit(identifier)?;
    let path = dunce::canonicalize(&path).map_err(|source| WorkspaceError::Io {
      path: path.clone(),
      source,
    })?;
    let project_path = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let profile = project_path.join(PROFILE_FILE_NAME);
    if profile.is_file() {
      self.run_static_unit(&profile)?;
    }

    let unit = Unit::new(identifier, project_path, self.this.clone(), false)?;
    self.units.borrow_mut().insert(identifier.to_string(), unit.clone());

    info!(unit = %identifier, path = ?path, "loading unit");
    if let Err(source) = self.host.execute(&unit, &path) {
      self.units.borrow_mut().remove(identifier);
      return Err(WorkspaceError::Script { path, source });
    }
    Ok(unit)
  }

  /// Run the script at `path` as a static unit, at most once per session.
  ///
  /// Static units write their unqualified definitions to the global context.
  pub fn run_static_unit(&self, path: &Path) -> Result<Rc<Unit>, WorkspaceError> {
    let key = dunce::canonicalize(path).unwrap_or_else(|_| normalize(path));
    if let Some(unit) = self.statics.borrow().get(&key) {
      return Ok(unit.clone());
    }

    let identifier = format!("{STATIC_UNIT_PREFIX}{}", key.display());
    let project_path = key.parent().map(Path::to_path_buf).unwrap_or_default();
    let unit = Unit::new(&identifier, project_path, self.this.clone(), true)?;
    self.statics.borrow_mut().insert(key.clone(), unit.clone());

    info!(path = ?key, "running profile");
    if let Err(source) = self.host.execute(&unit, &key) {
      self.statics.borrow_mut().remove(&key);
      return Err(WorkspaceError::Script { path: key, source });
    }
    Ok(unit)
  }

  /// Run `~/.creator_profile` if it exists.
  pub fn run_home_profile(&self) -> Result<Option<Rc<Unit>>, WorkspaceError> {
    let Some(home) = home_dir() else {
      return Ok(None);
    };
    let profile = home.join(PROFILE_FILE_NAME);
    if !profile.is_file() {
      return Ok(None);
    }
    self.run_static_unit(&profile).map(Some)
  }

  pub fn get_unit(&self, identifier: &str) -> Option<Rc<Unit>> {
    self.units.borrow().get(identifier).cloned()
  }

  /// Any unit whose context owns `namespace`, static units included.
  pub fn scope_unit(&self, namespace: &str) -> Option<Rc<Unit>> {
    if let Some(unit) = self.get_unit(namespace) {
      return Some(unit);
    }
    if !namespace.starts_with(STATIC_UNIT_PREFIX) {
      return None;
    }
    self
      .statics
      .borrow()
      .values()
      .find(|unit| unit.identifier() == namespace)
      .cloned()
  }

  /// Loaded units in identifier order.
  pub fn units(&self) -> Vec<Rc<Unit>> {
    self.units.borrow().values().cloned().collect()
  }

  /// Static units in path order.
  pub fn static_units(&self) -> Vec<Rc<Unit>> {
    self.statics.borrow().values().cloned().collect()
  }

  /// Look up a declaration by identifier.
  ///
  /// `unit:name` names a declaration of a loaded unit; with `relative_to` the
  /// namespace may also be one of that unit's aliases, and a bare `name`
  /// refers to one of its own declarations.
  pub fn get_target(&self, identifier: &str, relative_to: Option<&Unit>) -> Result<DeclRef, DeclError> {
    if let Some(unit) = relative_to {
      return unit.get_target(identifier);
    }
    match split_var(identifier) {
      (Some(ns), name) if !ns.is_empty() => {
        let unit = self
          .get_unit(ns)
          .ok_or_else(|| WorkspaceError::NoSuchUnit(ns.to_string()))?;
        unit.get_target(name)
      }
      _ => Err(DeclError::RelativeIdentifier(identifier.to_string())),
    }
  }

  /// Set up every concrete declaration that is not set up yet.
  ///
  /// Units are visited in identifier order, declarations in name order.
  pub fn setup_targets(&self) -> Result<(), DeclError> {
    for unit in self.units() {
      for decl in unit.targets() {
        if !decl.is_abstract() && !decl.is_setup() {
          decl.do_setup()?;
        }
      }
    }
    Ok(())
  }

  /// Every concrete declaration of every loaded unit, sorted by identifier.
  pub fn all_targets(&self) -> Vec<DeclRef> {
    let mut targets: Vec<DeclRef> = self
      .units()
      .iter()
      .flat_map(|unit| unit.targets())
      .filter(|decl| !decl.is_abstract())
      .collect();
    targets.sort_by_key(|decl| decl.identifier());
    targets
  }
}
