//! Declarations: targets that produce command entries and tasks that run
//! procedures.
//!
//! Declarations are created by their unit and shared as [`DeclRef`]s.
//! Dependencies are strong references; the back reference to the owning unit
//! is weak. Every declaration is set up exactly once. Setting up a target
//! evaluates its specifications into [`CommandEntry`]s.

mod setup;

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::context::Context;
use crate::macros::{Expr, MacroError, Scope, parse};
use crate::unit::Unit;
use crate::util::ident::create_var;
use crate::workspace::{Detached, WorkspaceError};

pub type DeclRef = Rc<Declaration>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DeclError {
  #[error("invalid declaration name: '{0}'")]
  InvalidName(String),

  #[error("'{0}' is already declared")]
  Duplicate(String),

  #[error("'{dependent}' is not abstract and cannot depend on abstract '{dependency}'")]
  AbstractDependency { dependent: String, dependency: String },

  #[error("abstract '{dependent}' cannot depend on abstract '{dependency}' of another unit")]
  AbstractCrossUnit { dependent: String, dependency: String },

  #[error("target '{dependent}' can only depend on targets, '{dependency}' is a task")]
  KindMismatch { dependent: String, dependency: String },

  #[error("'{0}' cannot depend on itself")]
  SelfDependency(String),

  #[error("'{0}' is already set up")]
  AlreadySetUp(String),

  #[error("dependency cycle while setting up '{0}'")]
  Cyclic(String),

  #[error("'{identifier}' pairs inputs with outputs but has {inputs} inputs and {outputs} outputs")]
  CountMismatch {
    identifier: String,
    inputs: usize,
    outputs: usize,
  },

  #[error("'{0}' produces no outputs")]
  NoOutputs(String),

  #[error("no target '{0}'")]
  NoSuchTarget(String),

  #[error("'{0}' is not qualified with a unit identifier")]
  RelativeIdentifier(String),

  #[error("'{0}' is not a task")]
  NotATask(String),

  #[error("'{0}' is not a target")]
  NotATarget(String),

  #[error("task '{identifier}' failed")]
  Task {
    identifier: String,
    #[source]
    source: BoxError,
  },

  #[error("listener of '{identifier}' failed")]
  Listener {
    identifier: String,
    #[source]
    source: BoxError,
  },

  #[error("'{0}' belongs to a unit that no longer exists")]
  Orphaned(String),

  #[error(transparent)]
  Macro(#[from] MacroError),

  #[error(transparent)]
  Workspace(#[from] WorkspaceError),

  #[error(transparent)]
  Detached(#[from] Detached),
}

/// A procedure run by a task. Receives the unit that owns the task, which for
/// inherited tasks is the inheriting unit.
pub trait TaskProc {
  fn run(&self, unit: &Rc<Unit>) -> Result<(), BoxError>;
}

impl<F> TaskProc for F
where
  F: Fn(&Rc<Unit>) -> Result<(), BoxError>,
{
  fn run(&self, unit: &Rc<Unit>) -> Result<(), BoxError> {
    self(unit)
  }
}

/// Raw text of one build specification, as seen by `build` listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSpec {
  pub inputs: String,
  pub outputs: String,
  pub command: String,
  pub each: bool,
  /// Extra files the commands depend on without consuming them as `$<`.
  pub auxiliary: Vec<String>,
}

pub enum TargetEvent<'a> {
  /// Fired once, before the declaration performs its setup.
  Setup,
  /// Fired for every specification added with `build`, before it is parsed.
  Build(&'a mut BuildSpec),
}

impl TargetEvent<'_> {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Setup => "setup",
      Self::Build(_) => "build",
    }
  }
}

pub type Listener = Rc<dyn Fn(&DeclRef, TargetEvent<'_>) -> Result<(), BoxError>>;

/// One concrete command produced by setting up a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandEntry {
  pub inputs: Vec<String>,
  pub outputs: Vec<String>,
  pub command: String,
  pub auxiliary: Vec<String>,
}

/// A parsed build specification.
#[derive(Debug, Clone)]
struct TargetSpec {
  inputs: Expr,
  outputs: Expr,
  command: Expr,
  each: bool,
  auxiliary: Vec<Expr>,
}

impl TargetSpec {
  fn parse(spec: &BuildSpec, scope: &Scope) -> Self {
    Self {
      inputs: parse(&spec.inputs, scope),
      outputs: parse(&spec.outputs, scope),
      command: parse(&spec.command, scope),
      each: spec.each,
      auxiliary: spec.auxiliary.iter().map(|text| parse(text, scope)).collect(),
    }
  }

  fn rebind(&self, scope: &Scope) -> Self {
    Self {
      inputs: self.inputs.rebind(scope),
      outputs: self.outputs.rebind(scope),
      command: self.command.rebind(scope),
      each: self.each,
      auxiliary: self.auxiliary.iter().map(|expr| expr.rebind(scope)).collect(),
    }
  }
}

#[derive(Debug, Default)]
pub struct TargetData {
  specs: RefCell<Vec<TargetSpec>>,
  entries: RefCell<Vec<CommandEntry>>,
}

pub enum DeclKind {
  Target(TargetData),
  Task(Rc<dyn TaskProc>),
}

/// Something a declaration can depend on: a declaration, or an identifier
/// resolved against the dependent's unit (aliases included).
#[derive(Clone)]
pub enum Requirement {
  Decl(DeclRef),
  Name(String),
}

impl From<DeclRef> for Requirement {
  fn from(decl: DeclRef) -> Self {
    Self::Decl(decl)
  }
}

impl From<&DeclRef> for Requirement {
  fn from(decl: &DeclRef) -> Self {
    Self::Decl(decl.clone())
  }
}

impl From<&str> for Requirement {
  fn from(name: &str) -> Self {
    Self::Name(name.to_string())
  }
}

impl From<String> for Requirement {
  fn from(name: String) -> Self {
    Self::Name(name)
  }
}

pub struct Declaration {
  unit: Weak<Unit>,
  unit_id: Rc<str>,
  name: String,
  is_abstract: Cell<bool>,
  is_setup: Cell<bool>,
  setting_up: Cell<bool>,
  dependencies: RefCell<Vec<DeclRef>>,
  listeners: RefCell<Vec<Listener>>,
  kind: DeclKind,
}

impl fmt::Debug for Declaration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Declaration")
      .field("identifier", &self.identifier())
      .field("kind", &self.kind_name())
      .field("abstract", &self.is_abstract())
      .field("setup", &self.is_setup())
      .finish_non_exhaustive()
  }
}

impl Declaration {
  fn new(unit: &Rc<Unit>, name: &str, is_abstract: bool, kind: DeclKind) -> DeclRef {
    Rc::new(Self {
      unit: Rc::downgrade(unit),
      unit_id: Rc::from(unit.identifier()),
      name: name.to_string(),
      is_abstract: Cell::new(is_abstract),
      is_setup: Cell::new(false),
      setting_up: Cell::new(false),
      dependencies: RefCell::new(Vec::new()),
      listeners: RefCell::new(Vec::new()),
      kind,
    })
  }

  pub(crate) fn new_target(unit: &Rc<Unit>, name: &str, is_abstract: bool) -> DeclRef {
    Self::new(unit, name, is_abstract, DeclKind::Target(TargetData::default()))
  }

  pub(crate) fn new_task(unit: &Rc<Unit>, name: &str, is_abstract: bool, proc: Rc<dyn TaskProc>) -> DeclRef {
    Self::new(unit, name, is_abstract, DeclKind::Task(proc))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn unit_id(&self) -> &str {
    &self.unit_id
  }

  /// `unit:name`
  pub fn identifier(&self) -> String {
    create_var(Some(&self.unit_id), &self.name)
  }

  pub fn unit(&self) -> Result<Rc<Unit>, DeclError> {
    self.unit.upgrade().ok_or_else(|| DeclError::Orphaned(self.identifier()))
  }

  pub fn kind(&self) -> &DeclKind {
    &self.kind
  }

  pub fn kind_name(&self) -> &'static str {
    match self.kind {
      DeclKind::Target(_) => "target",
      DeclKind::Task(_) => "task",
    }
  }

  pub fn is_target(&self) -> bool {
    matches!(self.kind, DeclKind::Target(_))
  }

  pub fn is_task(&self) -> bool {
    matches!(self.kind, DeclKind::Task(_))
  }

  pub fn is_abstract(&self) -> bool {
    self.is_abstract.get()
  }

  pub fn is_setup(&self) -> bool {
    self.is_setup.get()
  }

  pub fn dependencies(&self) -> Vec<DeclRef> {
    self.dependencies.borrow().clone()
  }

  /// Command entries produced by setup. Empty for tasks and before setup.
  pub fn entries(&self) -> Vec<CommandEntry> {
    match &self.kind {
      DeclKind::Target(data) => data.entries.borrow().clone(),
      DeclKind::Task(_) => Vec::new(),
    }
  }

  /// Outputs of every command entry, in entry order.
  pub fn outputs(&self) -> Vec<String> {
    self.entries().into_iter().flat_map(|entry| entry.outputs).collect()
  }

  pub fn listen(&self, listener: Listener) {
    self.listeners.borrow_mut().push(listener);
  }

  /// Record a dependency on `requirement`.
  ///
  /// Abstract declarations may only be required by abstract declarations of
  /// the same unit, and targets may only require targets. A concrete
  /// dependency that is not set up yet is set up first.
  pub fn requires(self: &Rc<Self>, requirement: impl Into<Requirement>) -> Result<DeclRef, DeclError> {
    let dep = match requirement.into() {
      Requirement::Decl(decl) => decl,
      Requirement::Name(name) => self.unit()?.get_target(&name)?,
    };

    if Rc::ptr_eq(self, &dep) {
      return Err(DeclError::SelfDependency(self.identifier()));
    }
    if dep.is_abstract() {
      if !self.is_abstract() {
        return Err(DeclError::AbstractDependency {
          dependent: self.identifier(),
          dependency: dep.identifier(),
        });
      }
      if dep.unit_id != self.unit_id {
        return Err(DeclError::AbstractCrossUnit {
          dependent: self.identifier(),
          dependency: dep.identifier(),
        });
      }
    }
    if self.is_target() && !dep.is_target() {
      return Err(DeclError::KindMismatch {
        dependent: self.identifier(),
        dependency: dep.identifier(),
      });
    }

    if !dep.is_abstract() && !dep.is_setup() {
      dep.do_setup()?;
    }

    let mut dependencies = self.dependencies.borrow_mut();
    if !dependencies.iter().any(|existing| Rc::ptr_eq(existing, &dep)) {
      dependencies.push(dep.clone());
    }
    Ok(dep)
  }

  /// Add a build specification to a target that is not set up yet.
  ///
  /// `build` listeners see the raw specification first and may change it.
  pub fn build(self: &Rc<Self>, mut spec: BuildSpec) -> Result<(), DeclError> {
    let DeclKind::Target(data) = &self.kind else {
      return Err(DeclError::NotATarget(self.identifier()));
    };
    if self.is_setup() {
      return Err(DeclError::AlreadySetUp(self.identifier()));
    }

    for listener in self.listeners.borrow().clone() {
      listener(self, TargetEvent::Build(&mut spec)).map_err(|source| DeclError::Listener {
        identifier: self.identifier(),
        source,
      })?;
    }

    let scope = self.unit()?.context().scope();
    data.specs.borrow_mut().push(TargetSpec::parse(&spec, &scope));
    Ok(())
  }

  /// Set up this declaration. May only be called once.
  ///
  /// Dependencies that are not set up yet are set up first, then `setup`
  /// listeners fire, then targets evaluate their specifications.
  pub fn do_setup(self: &Rc<Self>) -> Result<(), DeclError> {
    if self.is_setup() {
      return Err(DeclError::AlreadySetUp(self.identifier()));
    }
    if self.setting_up.replace(true) {
      return Err(DeclError::Cyclic(self.identifier()));
    }
    let result = self.perform_setup();
    self.setting_up.set(false);
    result?;

    self.is_setup.set(true);
    debug!(target = %self.identifier(), "set up");
    Ok(())
  }

  fn perform_setup(self: &Rc<Self>) -> Result<(), DeclError> {
    for dep in self.dependencies() {
      if !dep.is_abstract() && !dep.is_setup() {
        dep.do_setup()?;
      }
    }

    for listener in self.listeners.borrow().clone() {
      listener(self, TargetEvent::Setup).map_err(|source| DeclError::Listener {
        identifier: self.identifier(),
        source,
      })?;
    }

    if let DeclKind::Target(data) = &self.kind {
      let unit = self.unit()?;
      let ws = unit.workspace()?;
      let specs = data.specs.borrow().clone();
      let identifier = self.identifier();

      let mut entries = Vec::new();
      for spec in &specs {
        entries.extend(setup::evaluate(&identifier, &unit, &ws, spec)?);
      }
      *data.entries.borrow_mut() = entries;
    }
    Ok(())
  }

  /// Run a task's procedure on behalf of its unit.
  pub fn run(&self) -> Result<(), DeclError> {
    let DeclKind::Task(proc) = &self.kind else {
      return Err(DeclError::NotATask(self.identifier()));
    };
    let unit = self.unit()?;
    debug!(task = %self.identifier(), "running task");
    proc.run(&unit).map_err(|source| DeclError::Task {
      identifier: self.identifier(),
      source,
    })
  }

  /// Copy of this declaration owned by `unit`.
  ///
  /// The copy is concrete and not set up. Target specifications are rebound
  /// to the new unit's scope; dependencies and listeners are shared.
  pub(crate) fn inherit_into(&self, unit: &Rc<Unit>) -> DeclRef {
    let kind = match &self.kind {
      DeclKind::Target(data) => {
        let scope = unit.context().scope();
        let specs = data.specs.borrow().iter().map(|spec| spec.rebind(&scope)).collect();
        DeclKind::Target(TargetData {
          specs: RefCell::new(specs),
          entries: RefCell::new(Vec::new()),
        })
      }
      DeclKind::Task(proc) => DeclKind::Task(proc.clone()),
    };
    let clone = Self::new(unit, &self.name, false, kind);
    *clone.dependencies.borrow_mut() = self.dependencies();
    *clone.listeners.borrow_mut() = self.listeners.borrow().clone();
    clone
  }

  /// Replace every dependency for which `map` returns a substitute.
  pub(crate) fn rewrite_dependencies(&self, map: impl Fn(&DeclRef) -> Option<DeclRef>) {
    for dep in self.dependencies.borrow_mut().iter_mut() {
      if let Some(substitute) = map(dep) {
        *dep = substitute;
      }
    }
  }
}

/// `roots` and everything they depend on, dependencies first.
///
/// Abstract declarations are skipped. Each declaration appears once.
pub fn dependency_order(roots: &[DeclRef]) -> Vec<DeclRef> {
  fn visit(decl: &DeclRef, seen: &mut HashSet<*const Declaration>, order: &mut Vec<DeclRef>) {
    if decl.is_abstract() || !seen.insert(Rc::as_ptr(decl)) {
      return;
    }
    for dep in decl.dependencies() {
      visit(&dep, seen, order);
    }
    order.push(decl.clone());
  }

  let mut seen = HashSet::new();
  let mut order = Vec::new();
  for root in roots {
    visit(root, &mut seen, &mut order);
  }
  order
}
