//! Global Lua values and the per-unit script environment.
//!
//! Unit-independent helpers live in the Lua globals:
//! - `raw(text)` - A literal that is never expanded
//! - `split(text)` / `join(list)` - Word lists with quoting
//! - `path` - Lexical path utilities
//! - `creator` - Platform information (`platform`, `os`, `arch`, `version`)
//!
//! Each unit script runs in its own environment table that falls back to the
//! globals and adds the unit API (`define`, `target`, `task`, ...) bound to
//! that unit. `unit` is looked up on access so a running inherited task sees
//! the inheriting unit.

use std::rc::{Rc, Weak};

use mlua::prelude::*;

use super::api::{self, Bindings, UnitOp};
use super::helpers;
use super::userdata::{LuaMacro, LuaUnit};
use crate::macros::Expr;
use crate::platform::Platform;
use crate::unit::Unit;
use crate::util::text::{join, split};

/// Register the unit-independent globals in the Lua runtime.
pub fn register_globals(lua: &Lua) -> LuaResult<()> {
  lua.set_app_data(Bindings::default());
  let globals = lua.globals();

  globals.set("raw", lua.create_function(|_, text: String| Ok(LuaMacro(Expr::raw(text))))?)?;
  globals.set("split", lua.create_function(|_, text: String| Ok(split(&text)))?)?;
  globals.set("join", lua.create_function(|_, items: Vec<String>| Ok(join(&items)))?)?;
  globals.set("path", helpers::path::create_path_helpers(lua)?)?;

  let creator = lua.create_table()?;
  if let Some(platform) = Platform::current() {
    creator.set("platform", platform.triple())?;
    creator.set("os", platform.os.as_str())?;
    creator.set("arch", platform.arch.as_str())?;
  }
  creator.set("version", env!("CARGO_PKG_VERSION"))?;
  globals.set("creator", creator)?;

  Ok(())
}

fn bind<A, R>(lua: &Lua, env: &LuaTable, name: &str, unit: &Weak<Unit>, op: UnitOp<A, R>) -> LuaResult<()>
where
  A: FromLuaMulti + 'static,
  R: IntoLuaMulti + 'static,
{
  let unit = unit.clone();
  let func = lua.create_function(move |lua, args: A| op(lua, &Bindings::of(lua).resolve(&unit)?, args))?;
  env.set(name, func)
}

/// Create the environment table a unit script runs in.
pub fn create_unit_env(lua: &Lua, unit: &Rc<Unit>) -> LuaResult<LuaTable> {
  let weak = Rc::downgrade(unit);
  let env = lua.create_table()?;
  let meta = lua.create_table()?;
  let this = weak.clone();
  let index = lua.create_function(move |lua, (_, key): (LuaTable, LuaValue)| match &key {
    LuaValue::String(name) if *name == "unit" => LuaUnit::new(&Bindings::of(lua).resolve(&this)?).into_lua(lua),
    _ => lua.globals().raw_get::<LuaValue>(key.clone()),
  })?;
  meta.set("__index", index)?;
  env.set_metatable(Some(meta))?;

  bind(lua, &env, "define", &weak, api::define)?;
  bind(lua, &env, "defined", &weak, api::defined)?;
  bind(lua, &env, "append", &weak, api::append)?;
  bind(lua, &env, "eval", &weak, api::eval)?;
  bind(lua, &env, "e", &weak, api::eval)?;
  bind(lua, &env, "load", &weak, api::load)?;
  bind(lua, &env, "extends", &weak, api::extends)?;
  bind(lua, &env, "target", &weak, api::target)?;
  bind(lua, &env, "task", &weak, api::task)?;
  bind(lua, &env, "get_target", &weak, api::get_target)?;
  bind(lua, &env, "run_task", &weak, api::run_task)?;
  bind(lua, &env, "shell", &weak, api::shell)?;
  bind(lua, &env, "shell_get", &weak, api::shell_get)?;
  bind(lua, &env, "eq", &weak, api::eq)?;
  bind(lua, &env, "ne", &weak, api::ne)?;
  bind(lua, &env, "info", &weak, api::info)?;
  bind(lua, &env, "warn", &weak, api::warn)?;
  bind(lua, &env, "error", &weak, api::error)?;

  Ok(env)
}
