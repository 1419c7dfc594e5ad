//! Userdata handed to unit scripts: unit and target handles, `raw()`
//! expressions and `build` event data.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use mlua::prelude::*;

use super::api::{self, Bindings, UnitOp, upgrade};
use super::convert::{host_error, macro_text, requirement};
use crate::macros::Expr;
use crate::target::{BoxError, BuildSpec, CommandEntry, DeclRef, Listener, TargetEvent, TaskProc};
use crate::unit::Unit;

/// Handle to a unit. Does not keep the unit alive.
#[derive(Clone)]
pub struct LuaUnit(pub Weak<Unit>);

impl LuaUnit {
  pub fn new(unit: &Rc<Unit>) -> Self {
    Self(Rc::downgrade(unit))
  }
}

fn unit_method<M, A, R>(methods: &mut M, name: &str, op: UnitOp<A, R>)
where
  M: LuaUserDataMethods<LuaUnit>,
  A: FromLuaMulti + 'static,
  R: IntoLuaMulti + 'static,
{
  methods.add_method(name, move |lua, this, args: A| op(lua, &upgrade(&this.0)?, args));
}

impl LuaUserData for LuaUnit {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("identifier", |_, this| Ok(upgrade(&this.0)?.identifier().to_string()));
    fields.add_field_method_get("project_path", |_, this| {
      Ok(upgrade(&this.0)?.project_path().to_string_lossy().into_owned())
    });
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    unit_method(methods, "define", api::define);
    unit_method(methods, "defined", api::defined);
    unit_method(methods, "append", api::append);
    unit_method(methods, "eval", api::eval);
    unit_method(methods, "load", api::load);
    unit_method(methods, "extends", api::extends);
    unit_method(methods, "target", api::target);
    unit_method(methods, "task", api::task);
    unit_method(methods, "get_target", api::get_target);
    unit_method(methods, "run_task", api::run_task);
    unit_method(methods, "shell", api::shell);
    unit_method(methods, "shell_get", api::shell_get);
    unit_method(methods, "eq", api::eq);
    unit_method(methods, "ne", api::ne);
    unit_method(methods, "info", api::info);
    unit_method(methods, "warn", api::warn);

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
      Ok(format!("unit {}", upgrade(&this.0)?.identifier()))
    });
  }
}

/// Handle to a target or task.
#[derive(Clone)]
pub struct LuaTarget(pub DeclRef);

impl LuaUserData for LuaTarget {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("identifier", |_, this| Ok(this.0.identifier()));
    fields.add_field_method_get("name", |_, this| Ok(this.0.name().to_string()));
    fields.add_field_method_get("kind", |_, this| Ok(this.0.kind_name()));
    fields.add_field_method_get("abstract", |_, this| Ok(this.0.is_abstract()));
    fields.add_field_method_get("is_setup", |_, this| Ok(this.0.is_setup()));
    fields.add_field_method_get("unit", |_, this| {
      let unit = this.0.unit().map_err(LuaError::external)?;
      Ok(LuaUnit::new(&unit))
    });
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method(
      "build",
      |_, this, (inputs, outputs, command, each): (LuaValue, LuaValue, LuaValue, Option<bool>)| {
        let spec = BuildSpec {
          inputs: macro_text(inputs)?,
          outputs: macro_text(outputs)?,
          command: macro_text(command)?,
          each: each.unwrap_or(false),
          auxiliary: Vec::new(),
        };
        this.0.build(spec).map_err(LuaError::external)
      },
    );

    methods.add_method("requires", |_, this, dep: LuaValue| {
      let dep = this.0.requires(requirement(dep)?).map_err(LuaError::external)?;
      Ok(LuaTarget(dep))
    });

    methods.add_method("listen", |_, this, func: LuaFunction| {
      this.0.listen(lua_listener(func));
      Ok(())
    });

    methods.add_method("entries", |lua, this, ()| {
      let entries = lua.create_table()?;
      for (index, entry) in this.0.entries().iter().enumerate() {
        entries.set(index + 1, entry_table(lua, entry)?)?;
      }
      Ok(entries)
    });

    methods.add_method("outputs", |_, this, ()| Ok(this.0.outputs()));

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
      Ok(format!("{} {}", this.0.kind_name(), this.0.identifier()))
    });
  }
}

fn entry_table(lua: &Lua, entry: &CommandEntry) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  table.set("inputs", entry.inputs.clone())?;
  table.set("outputs", entry.outputs.clone())?;
  table.set("command", entry.command.as_str())?;
  table.set("auxiliary", entry.auxiliary.clone())?;
  Ok(table)
}

/// A literal produced by `raw(text)`. Never expanded.
#[derive(Clone)]
pub struct LuaMacro(pub Expr);

impl LuaUserData for LuaMacro {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.0.to_string()));
  }
}

/// The specification passed to a `build` listener. Changes are copied back
/// before the specification is parsed.
pub struct LuaBuildEvent(pub Rc<RefCell<BuildSpec>>);

impl LuaUserData for LuaBuildEvent {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("inputs", |_, this| Ok(this.0.borrow().inputs.clone()));
    fields.add_field_method_get("outputs", |_, this| Ok(this.0.borrow().outputs.clone()));
    fields.add_field_method_get("command", |_, this| Ok(this.0.borrow().command.clone()));
    fields.add_field_method_get("each", |_, this| Ok(this.0.borrow().each));
    fields.add_field_method_get("auxiliary", |_, this| Ok(this.0.borrow().auxiliary.clone()));

    fields.add_field_method_set("inputs", |_, this, value: LuaValue| {
      this.0.borrow_mut().inputs = macro_text(value)?;
      Ok(())
    });
    fields.add_field_method_set("outputs", |_, this, value: LuaValue| {
      this.0.borrow_mut().outputs = macro_text(value)?;
      Ok(())
    });
    fields.add_field_method_set("command", |_, this, value: LuaValue| {
      this.0.borrow_mut().command = macro_text(value)?;
      Ok(())
    });
    fields.add_field_method_set("each", |_, this, value: bool| {
      this.0.borrow_mut().each = value;
      Ok(())
    });
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("add_auxiliary", |_, this, path: LuaValue| {
      this.0.borrow_mut().auxiliary.push(macro_text(path)?);
      Ok(())
    });
  }
}

/// A task procedure implemented by a Lua function taking the unit.
///
/// The function runs with the declaring unit's environment bound to the unit
/// the task runs for, so inherited tasks act on the inheriting unit.
pub struct LuaTask {
  func: LuaFunction,
  origin: Weak<Unit>,
  bindings: Bindings,
}

impl LuaTask {
  pub fn new(lua: &Lua, func: LuaFunction, origin: &Rc<Unit>) -> Self {
    Self {
      func,
      origin: Rc::downgrade(origin),
      bindings: Bindings::of(lua),
    }
  }
}

impl TaskProc for LuaTask {
  fn run(&self, unit: &Rc<Unit>) -> Result<(), BoxError> {
    self
      .bindings
      .scoped(&self.origin, unit, || self.func.call::<()>(LuaUnit::new(unit)))
      .map_err(host_error)
  }
}

/// Adapt `function(target, event, data)` to a declaration listener.
///
/// `data` is nil for `setup` and a [`LuaBuildEvent`] for `build`.
pub fn lua_listener(func: LuaFunction) -> Listener {
  Rc::new(move |decl: &DeclRef, event: TargetEvent<'_>| -> Result<(), BoxError> {
    let name = event.name();
    match event {
      TargetEvent::Setup => func
        .call::<()>((LuaTarget(decl.clone()), name, LuaValue::Nil))
        .map_err(host_error)?,
      TargetEvent::Build(spec) => {
        let data = Rc::new(RefCell::new(spec.clone()));
        func
          .call::<()>((LuaTarget(decl.clone()), name, LuaBuildEvent(data.clone())))
          .map_err(host_error)?;
        *spec = data.borrow().clone();
      }
    }
    Ok(())
  })
}
