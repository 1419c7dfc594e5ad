//! The unit operations shared by the per-unit globals and `unit` handles.
//!
//! Every operation takes the unit it acts on explicitly, so the same function
//! backs both `define(...)` and `unit:define(...)`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use mlua::prelude::*;
use tracing::error;

use super::convert::{macro_source, macro_text, requirements};
use super::userdata::{LuaTarget, LuaTask, LuaUnit};
use crate::unit::{TargetDecl, TaskDecl, Unit};

pub type UnitOp<A, R> = fn(&Lua, &Rc<Unit>, A) -> LuaResult<R>;

pub fn upgrade(unit: &Weak<Unit>) -> LuaResult<Rc<Unit>> {
  unit
    .upgrade()
    .ok_or_else(|| LuaError::external("unit is no longer loaded"))
}

/// Units standing in for the unit a script environment belongs to.
///
/// A task's function resolves its free calls (`define`, `unit`, ...) in the
/// environment of the script that declared it. While the task runs for an
/// inheriting unit, those calls act on the inheriting unit instead.
#[derive(Clone, Default)]
pub struct Bindings(Rc<RefCell<Vec<(Weak<Unit>, Weak<Unit>)>>>);

impl Bindings {
  /// The bindings registered with `lua`.
  pub fn of(lua: &Lua) -> Self {
    lua.app_data_ref::<Self>().map(|bindings| (*bindings).clone()).unwrap_or_default()
  }

  /// The unit free calls in `unit`'s environment currently act on.
  pub fn resolve(&self, unit: &Weak<Unit>) -> LuaResult<Rc<Unit>> {
    let bound = self
      .0
      .borrow()
      .iter()
      .rev()
      .find(|(origin, _)| origin.ptr_eq(unit))
      .map(|(_, target)| target.clone());
    upgrade(bound.as_ref().unwrap_or(unit))
  }

  /// Run `f` with `origin`'s environment bound to `unit`.
  pub fn scoped<R>(&self, origin: &Weak<Unit>, unit: &Rc<Unit>, f: impl FnOnce() -> R) -> R {
    self.0.borrow_mut().push((origin.clone(), Rc::downgrade(unit)));
    let result = f();
    self.0.borrow_mut().pop();
    result
  }
}

pub fn define(_: &Lua, unit: &Rc<Unit>, (name, value): (String, LuaValue)) -> LuaResult<()> {
  unit.define(&name, macro_source(value)?).map_err(LuaError::external)
}

pub fn defined(_: &Lua, unit: &Rc<Unit>, name: String) -> LuaResult<bool> {
  Ok(unit.defined(&name))
}

pub fn append(_: &Lua, unit: &Rc<Unit>, (name, value): (String, LuaValue)) -> LuaResult<()> {
  unit.append(&name, macro_source(value)?).map_err(LuaError::external)
}

pub fn eval(_: &Lua, unit: &Rc<Unit>, text: LuaValue) -> LuaResult<String> {
  unit.eval(&macro_text(text)?).map_err(LuaError::external)
}

pub fn load(_: &Lua, unit: &Rc<Unit>, (identifier, alias): (String, Option<String>)) -> LuaResult<LuaUnit> {
  let loaded = unit
    .load(&identifier, alias.as_deref())
    .map_err(LuaError::external)?;
  Ok(LuaUnit::new(&loaded))
}

pub fn extends(_: &Lua, unit: &Rc<Unit>, (identifier, inherit_targets): (String, Option<bool>)) -> LuaResult<LuaUnit> {
  let base = unit
    .extends(&identifier, inherit_targets.unwrap_or(true))
    .map_err(LuaError::external)?;
  Ok(LuaUnit::new(&base))
}

/// `target{ name, inputs, outputs, command, requires, each, abstract }`
pub fn target(_: &Lua, unit: &Rc<Unit>, spec: LuaTable) -> LuaResult<LuaTarget> {
  let name: String = spec.get("name")?;
  let decl = TargetDecl::new(
    name,
    macro_text(spec.get("inputs")?)?,
    macro_text(spec.get("outputs")?)?,
    macro_text(spec.get("command")?)?,
  )
  .with_requires(requirements(spec.get("requires")?)?)
  .with_each(spec.get::<Option<bool>>("each")?.unwrap_or(false))
  .with_abstract(spec.get::<Option<bool>>("abstract")?.unwrap_or(false));

  let target = unit.target(decl).map_err(LuaError::external)?;
  Ok(LuaTarget(target))
}

/// `task{ name, run = function(unit) end, requires, abstract }`
pub fn task(lua: &Lua, unit: &Rc<Unit>, spec: LuaTable) -> LuaResult<LuaTarget> {
  let name: String = spec.get("name")?;
  let run: LuaFunction = spec
    .get::<Option<LuaFunction>>("run")?
    .ok_or_else(|| LuaError::external(format!("task '{name}' has no run function")))?;
  let decl = TaskDecl::new(name)
    .with_requires(requirements(spec.get("requires")?)?)
    .with_abstract(spec.get::<Option<bool>>("abstract")?.unwrap_or(false));

  let task = unit.task(decl, Rc::new(LuaTask::new(lua, run, unit))).map_err(LuaError::external)?;
  Ok(LuaTarget(task))
}

pub fn get_target(_: &Lua, unit: &Rc<Unit>, identifier: String) -> LuaResult<LuaTarget> {
  let decl = unit.get_target(&identifier).map_err(LuaError::external)?;
  Ok(LuaTarget(decl))
}

pub fn run_task(_: &Lua, unit: &Rc<Unit>, identifier: String) -> LuaResult<()> {
  unit.run_task(&identifier).map_err(LuaError::external)
}

/// `shell(command)`: exit code of the expanded command.
pub fn shell(_: &Lua, unit: &Rc<Unit>, command: LuaValue) -> LuaResult<i32> {
  unit.shell(&macro_text(command)?).map_err(LuaError::external)
}

/// `shell_get(command)`: trimmed standard output of the expanded command.
pub fn shell_get(_: &Lua, unit: &Rc<Unit>, command: LuaValue) -> LuaResult<String> {
  unit.shell_get(&macro_text(command)?).map_err(LuaError::external)
}

pub fn eq(_: &Lua, unit: &Rc<Unit>, (left, right): (LuaValue, LuaValue)) -> LuaResult<bool> {
  unit.eq(&macro_text(left)?, &macro_text(right)?).map_err(LuaError::external)
}

pub fn ne(_: &Lua, unit: &Rc<Unit>, (left, right): (LuaValue, LuaValue)) -> LuaResult<bool> {
  unit.ne(&macro_text(left)?, &macro_text(right)?).map_err(LuaError::external)
}

pub fn info(_: &Lua, unit: &Rc<Unit>, text: LuaValue) -> LuaResult<String> {
  unit.info(&macro_text(text)?).map_err(LuaError::external)
}

pub fn warn(_: &Lua, unit: &Rc<Unit>, text: LuaValue) -> LuaResult<String> {
  unit.warn(&macro_text(text)?).map_err(LuaError::external)
}

/// Log `text` at error level and abort the running script with it.
pub fn error(_: &Lua, unit: &Rc<Unit>, text: LuaValue) -> LuaResult<()> {
  let message = unit.eval(&macro_text(text)?).map_err(LuaError::external)?;
  error!(unit = %unit.identifier(), "{message}");
  Err(LuaError::RuntimeError(message))
}
