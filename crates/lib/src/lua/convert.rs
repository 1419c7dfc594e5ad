//! Conversions from Lua arguments to the unit API's argument types.

use mlua::prelude::*;

use super::userdata::{LuaMacro, LuaTarget};
use crate::target::{BoxError, Requirement};
use crate::unit::MacroSource;
use crate::util::text::join;

/// Flatten a Lua error into its message. Lua errors are not `Send`, and the
/// message already carries the traceback and any Rust cause.
pub fn host_error(err: LuaError) -> BoxError {
  err.to_string().into()
}

/// A value for `define`/`append`: macro text, a `raw()` expression, or a list
/// of words joined into one.
pub fn macro_source(value: LuaValue) -> LuaResult<MacroSource> {
  match value {
    LuaValue::UserData(ud) if ud.is::<LuaMacro>() => Ok(MacroSource::Expr(ud.borrow::<LuaMacro>()?.0.clone())),
    other => Ok(MacroSource::Text(macro_text(other)?)),
  }
}

/// Macro text for specifications and `eval`. A `raw()` expression is written
/// back in escaped form so it parses to the same literal.
pub fn macro_text(value: LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::Nil => Ok(String::new()),
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    LuaValue::Integer(n) => Ok(n.to_string()),
    LuaValue::Number(n) => Ok(n.to_string()),
    LuaValue::Table(table) => {
      let mut items = Vec::new();
      for item in table.sequence_values::<LuaValue>() {
        items.push(macro_text(item?)?);
      }
      Ok(join(&items))
    }
    LuaValue::UserData(ud) if ud.is::<LuaMacro>() => Ok(ud.borrow::<LuaMacro>()?.0.to_string()),
    other => Err(LuaError::external(format!(
      "expected macro text, got {}",
      other.type_name()
    ))),
  }
}

/// `requires` values: nothing, a target name, a target handle, or a list of
/// those.
pub fn requirements(value: LuaValue) -> LuaResult<Vec<Requirement>> {
  match value {
    LuaValue::Nil => Ok(Vec::new()),
    LuaValue::Table(table) => {
      let mut requirements = Vec::new();
      for item in table.sequence_values::<LuaValue>() {
        requirements.push(requirement(item?)?);
      }
      Ok(requirements)
    }
    other => Ok(vec![requirement(other)?]),
  }
}

pub fn requirement(value: LuaValue) -> LuaResult<Requirement> {
  match value {
    LuaValue::String(s) => Ok(Requirement::Name(s.to_str()?.to_string())),
    LuaValue::UserData(ud) if ud.is::<LuaTarget>() => Ok(Requirement::Decl(ud.borrow::<LuaTarget>()?.0.clone())),
    other => Err(LuaError::external(format!(
      "expected a target name or target, got {}",
      other.type_name()
    ))),
  }
}
