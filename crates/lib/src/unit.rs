//! Units: one loaded unit script with its context and declarations.
//!
//! This is the API unit scripts program against. Script hosts forward their
//! calls here one to one.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{PROJECT_PATH_VAR, SELF_VAR};
use crate::context::{ChainContext, Context, MutableContext, UnitContext};
use crate::macros::{Expr, MacroError};
use crate::target::{BuildSpec, DeclError, DeclRef, Declaration, Requirement, TaskProc};
use crate::util::ident::{split_var, validate_identifier};
use crate::workspace::{Detached, Workspace, WorkspaceError};

/// Value passed to [`Unit::define`]: macro text to parse, or a ready
/// expression (for example a [`Expr::raw`] literal).
#[derive(Debug, Clone)]
pub enum MacroSource {
  Text(String),
  Expr(Expr),
}

impl From<&str> for MacroSource {
  fn from(text: &str) -> Self {
    Self::Text(text.to_string())
  }
}

impl From<String> for MacroSource {
  fn from(text: String) -> Self {
    Self::Text(text)
  }
}

impl From<Expr> for MacroSource {
  fn from(expr: Expr) -> Self {
    Self::Expr(expr)
  }
}

#[derive(Debug, Error)]
pub enum ShellError {
  #[error("failed to run '{command}'")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("'{command}' exited with {}", .code.map_or("a signal".to_string(), |code| format!("code {code}")))]
  Failed { command: String, code: Option<i32> },

  #[error(transparent)]
  Macro(#[from] MacroError),
}

/// `sh -c` on Unix, `cmd /C` on Windows.
fn shell_command(command: &str) -> Command {
  let (shell, flag) = if cfg!(windows) {
    ("cmd.exe", "/C")
  } else {
    ("/bin/sh", "-c")
  };
  let mut process = Command::new(shell);
  process.arg(flag).arg(command);
  process
}

/// Arguments of [`Unit::target`].
#[derive(Clone)]
pub struct TargetDecl {
  pub name: String,
  pub inputs: String,
  pub outputs: String,
  pub command: String,
  pub requires: Vec<Requirement>,
  pub each: bool,
  pub is_abstract: bool,
}

impl TargetDecl {
  pub fn new(
    name: impl Into<String>,
    inputs: impl Into<String>,
    outputs: impl Into<String>,
    command: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      inputs: inputs.into(),
      outputs: outputs.into(),
      command: command.into(),
      requires: Vec::new(),
      each: false,
      is_abstract: false,
    }
  }

  pub fn with_requires<R: Into<Requirement>>(mut self, requires: impl IntoIterator<Item = R>) -> Self {
    self.requires.extend(requires.into_iter().map(Into::into));
    self
  }

  pub fn with_each(mut self, each: bool) -> Self {
    self.each = each;
    self
  }

  pub fn with_abstract(mut self, is_abstract: bool) -> Self {
    self.is_abstract = is_abstract;
    self
  }
}

/// Arguments of [`Unit::task`], minus the procedure.
#[derive(Clone)]
pub struct TaskDecl {
  pub name: String,
  pub requires: Vec<Requirement>,
  pub is_abstract: bool,
}

impl TaskDecl {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      requires: Vec::new(),
      is_abstract: false,
    }
  }

  pub fn with_requires<R: Into<Requirement>>(mut self, requires: impl IntoIterator<Item = R>) -> Self {
    self.requires.extend(requires.into_iter().map(Into::into));
    self
  }

  pub fn with_abstract(mut self, is_abstract: bool) -> Self {
    self.is_abstract = is_abstract;
    self
  }
}

pub struct Unit {
  identifier: Rc<str>,
  project_path: PathBuf,
  workspace: Weak<Workspace>,
  context: UnitContext,
  targets: RefCell<BTreeMap<String, DeclRef>>,
}

impl fmt::Debug for Unit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Unit")
      .field("identifier", &self.identifier)
      .field("project_path", &self.project_path)
      .finish_non_exhaustive()
  }
}

impl Unit {
  /// Create a unit. Binds `self` (as variable and alias) and `ProjectPath`.
  ///
  /// Static units skip identifier validation.
  pub(crate) fn new(
    identifier: &str,
    project_path: PathBuf,
    workspace: Weak<Workspace>,
    is_static: bool,
  ) -> Result<Rc<Self>, WorkspaceError> {
    if !is_static && !validate_identifier(identifier) {
      return Err(WorkspaceError::InvalidIdentifier(identifier.to_string()));
    }

    let identifier: Rc<str> = Rc::from(identifier);
    let context = UnitContext::new(identifier.clone(), is_static);
    context.alias(SELF_VAR, &identifier);
    context.set_local(SELF_VAR, Expr::raw(identifier.clone()));
    context.set_local(PROJECT_PATH_VAR, Expr::raw(project_path.to_string_lossy().as_ref()));

    Ok(Rc::new(Self {
      identifier,
      project_path,
      workspace,
      context,
      targets: RefCell::new(BTreeMap::new()),
    }))
  }

  pub fn identifier(&self) -> &str {
    &self.identifier
  }

  pub fn project_path(&self) -> &Path {
    &self.project_path
  }

  pub fn is_static(&self) -> bool {
    self.context.is_static()
  }

  pub fn context(&self) -> &UnitContext {
    &self.context
  }

  pub fn workspace(&self) -> Result<Rc<Workspace>, Detached> {
    self.workspace.upgrade().ok_or(Detached)
  }

  pub fn aliases(&self) -> BTreeMap<String, String> {
    self.context.aliases()
  }

  /// Declarations of this unit in name order.
  pub fn targets(&self) -> Vec<DeclRef> {
    self.targets.borrow().values().cloned().collect()
  }

  pub fn find_local(&self, name: &str) -> Option<DeclRef> {
    self.targets.borrow().get(name).cloned()
  }

  /// Resolve a declaration identifier relative to this unit.
  ///
  /// A bare `name` is one of this unit's declarations; `ns:name` goes through
  /// the alias table to another loaded unit.
  pub fn get_target(&self, identifier: &str) -> Result<DeclRef, DeclError> {
    let (namespace, name) = split_var(identifier);
    let namespace = match namespace {
      None => return self.find_local(name).ok_or_else(|| DeclError::NoSuchTarget(identifier.to_string())),
      Some("") => return Err(DeclError::NoSuchTarget(identifier.to_string())),
      Some(ns) => self.context.resolve_namespace(ns),
    };

    if *namespace == *self.identifier {
      return self.find_local(name).ok_or_else(|| DeclError::NoSuchTarget(identifier.to_string()));
    }
    let unit = self
      .workspace()?
      .get_unit(&namespace)
      .ok_or_else(|| WorkspaceError::NoSuchUnit(namespace.clone()))?;
    unit
      .find_local(name)
      .ok_or_else(|| DeclError::NoSuchTarget(format!("{namespace}:{name}")))
  }

  /// Bind `name` in this unit's context (or the namespace it names).
  pub fn define(&self, name: &str, value: impl Into<MacroSource>) -> Result<(), MacroError> {
    let ws = self.workspace()?;
    let expr = self.to_expr(value.into());
    self.context.define(&ws, name, expr)
  }

  /// Whether `name` resolves from this unit, globals and environment included.
  pub fn defined(&self, name: &str) -> bool {
    match self.workspace() {
      Ok(ws) => self.context.lookup(&ws, name).is_some(),
      Err(_) => false,
    }
  }

  /// Extend the current value of `name` with `value`.
  ///
  /// The current binding is captured as it is now, so the new value never
  /// refers to itself. An undefined `name` is simply defined.
  pub fn append(&self, name: &str, value: impl Into<MacroSource>) -> Result<(), MacroError> {
    let ws = self.workspace()?;
    let addition = self.to_expr(value.into());
    let expr = match self.context.lookup(&ws, name) {
      Some(binding) => binding.expr.concat(addition),
      None => addition,
    };
    self.context.define(&ws, name, expr)
  }

  /// Evaluate macro `text` in this unit's context.
  pub fn eval(&self, text: &str) -> Result<String, MacroError> {
    let ws = self.workspace()?;
    self.context.eval_text(&ws, text)
  }

  /// Evaluate macro `text` with `overlay` consulted before this unit.
  pub fn eval_with(&self, text: &str, overlay: &MutableContext) -> Result<String, MacroError> {
    let ws = self.workspace()?;
    let chain = ChainContext::new(vec![overlay as &dyn Context, &self.context]);
    chain.eval_text(&ws, text)
  }

  fn to_expr(&self, value: MacroSource) -> Expr {
    match value {
      MacroSource::Text(text) => self.context.parse(&text),
      MacroSource::Expr(expr) => expr,
    }
  }

  /// Load another unit, optionally making it reachable under `alias`.
  pub fn load(&self, identifier: &str, alias: Option<&str>) -> Result<Rc<Unit>, WorkspaceError> {
    let unit = self.workspace()?.load_unit(identifier)?;
    if let Some(alias) = alias {
      self.context.alias(alias, identifier);
    }
    Ok(unit)
  }

  /// Inherit from unit `identifier`.
  ///
  /// Copies its variables (except `self` and `ProjectPath`) rebound to this
  /// unit, merges its aliases without touching `self`, and when
  /// `inherit_targets` is set clones all of its declarations as concrete
  /// declarations of this unit. Dependencies between the clones follow the
  /// clones; inherited declarations replace same-named ones.
  pub fn extends(self: &Rc<Self>, identifier: &str, inherit_targets: bool) -> Result<Rc<Unit>, WorkspaceError> {
    let source = self.load(identifier, None)?;
    let scope = self.context.scope();

    for (name, expr) in source.context.items() {
      if name == SELF_VAR || name == PROJECT_PATH_VAR {
        continue;
      }
      self.context.set_local(&name, expr.rebind(&scope));
    }
    for (alias, target) in source.context.aliases() {
      if alias != SELF_VAR {
        self.context.alias(&alias, &target);
      }
    }

    if inherit_targets {
      let clones: Vec<(DeclRef, DeclRef)> = source
        .targets()
        .into_iter()
        .map(|decl| {
          let clone = decl.inherit_into(self);
          (decl, clone)
        })
        .collect();

      for (_, clone) in &clones {
        clone.rewrite_dependencies(|dep| {
          if !dep.is_abstract() {
            return None;
          }
          clones
            .iter()
            .find(|(original, _)| Rc::ptr_eq(original, dep))
            .map(|(_, clone)| clone.clone())
        });
        self.targets.borrow_mut().insert(clone.name().to_string(), clone.clone());
      }
    }

    info!(unit = %self.identifier, base = %identifier, "extended unit");
    Ok(source)
  }

  fn check_name(&self, name: &str) -> Result<(), DeclError> {
    if !validate_identifier(name) {
      return Err(DeclError::InvalidName(name.to_string()));
    }
    if self.targets.borrow().contains_key(name) {
      return Err(DeclError::Duplicate(format!("{}:{name}", self.identifier)));
    }
    Ok(())
  }

  /// Declare a target with one initial build specification.
  pub fn target(self: &Rc<Self>, decl: TargetDecl) -> Result<DeclRef, DeclError> {
    self.check_name(&decl.name)?;
    let target = Declaration::new_target(self, &decl.name, decl.is_abstract);
    target.build(BuildSpec {
      inputs: decl.inputs,
      outputs: decl.outputs,
      command: decl.command,
      each: decl.each,
      auxiliary: Vec::new(),
    })?;
    for requirement in decl.requires {
      target.requires(requirement)?;
    }
    self.targets.borrow_mut().insert(decl.name, target.clone());
    Ok(target)
  }

  /// Declare a task running `proc`.
  pub fn task(self: &Rc<Self>, decl: TaskDecl, proc: Rc<dyn TaskProc>) -> Result<DeclRef, DeclError> {
    self.check_name(&decl.name)?;
    let task = Declaration::new_task(self, &decl.name, decl.is_abstract, proc);
    for requirement in decl.requires {
      task.requires(requirement)?;
    }
    self.targets.borrow_mut().insert(decl.name, task.clone());
    Ok(task)
  }

  /// Run the task `identifier` (resolved relative to this unit).
  pub fn run_task(&self, identifier: &str) -> Result<(), DeclError> {
    self.get_target(identifier)?.run()
  }

  /// Expand `command` and run it in the shell, attached to the terminal.
  ///
  /// Returns the exit code, or -1 when the process was killed by a signal.
  pub fn shell(&self, command: &str) -> Result<i32, ShellError> {
    let command = self.eval(command)?;
    debug!(unit = %self.identifier, command = %command, "running shell command");
    let status = shell_command(&command)
      .status()
      .map_err(|source| ShellError::Spawn { command, source })?;
    Ok(status.code().unwrap_or(-1))
  }

  /// Expand `command`, run it in the shell and return its trimmed standard
  /// output. A non-zero exit is an error.
  pub fn shell_get(&self, command: &str) -> Result<String, ShellError> {
    let command = self.eval(command)?;
    debug!(unit = %self.identifier, command = %command, "capturing shell command");
    let output = match shell_command(&command).output() {
      Ok(output) => output,
      Err(source) => return Err(ShellError::Spawn { command, source }),
    };
    if !output.status.success() {
      return Err(ShellError::Failed {
        command,
        code: output.status.code(),
      });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Whether `left` and `right` evaluate to the same text.
  pub fn eq(&self, left: &str, right: &str) -> Result<bool, MacroError> {
    Ok(self.eval(left)? == self.eval(right)?)
  }

  pub fn ne(&self, left: &str, right: &str) -> Result<bool, MacroError> {
    self.eq(left, right).map(|equal| !equal)
  }

  /// Log `text`, evaluated as a macro, at info level.
  pub fn info(&self, text: &str) -> Result<String, MacroError> {
    let message = self.eval(text)?;
    info!(unit = %self.identifier, "{message}");
    Ok(message)
  }

  /// Log `text`, evaluated as a macro, at warn level.
  pub fn warn(&self, text: &str) -> Result<String, MacroError> {
    let message = self.eval(text)?;
    warn!(unit = %self.identifier, "{message}");
    Ok(message)
  }
}
