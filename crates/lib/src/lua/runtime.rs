use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use super::convert::host_error;
use super::globals::{create_unit_env, register_globals};
use crate::host::{HostError, ScriptHost};
use crate::unit::Unit;

/// Runs unit scripts in a shared Lua 5.4 state.
///
/// Every script gets its own environment table, so plain global assignments
/// in one unit are invisible to the others.
pub struct LuaHost {
  lua: Lua,
}

impl LuaHost {
  /// Create a Lua state with the creator globals registered.
  pub fn new() -> LuaResult<Self> {
    let lua = Lua::new();
    register_globals(&lua)?;
    Ok(Self { lua })
  }
}

impl ScriptHost for LuaHost {
  fn execute(&self, unit: &Rc<Unit>, path: &Path) -> Result<(), HostError> {
    let content = std::fs::read_to_string(path)?;
    let env = create_unit_env(&self.lua, unit).map_err(host_error)?;

    debug!(unit = %unit.identifier(), path = ?path, "executing unit script");
    self
      .lua
      .load(&content)
      .set_name(format!("@{}", path.display()))
      .set_environment(env)
      .exec()
      .map_err(host_error)
  }
}
