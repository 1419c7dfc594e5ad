use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::util::path::{normalize, normpath};

/// Create the `path` table with lexical path utilities.
pub fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  // path.join(...) - Join multiple path segments
  path.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut result = PathBuf::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          result.push(s.to_str()?.as_ref());
        }
      }
      Ok(result.to_string_lossy().into_owned())
    })?,
  )?;

  // path.dirname(path) - Parent directory
  path.set(
    "dirname",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .parent()
          .map(|p| p.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // path.basename(path) - File name
  path.set(
    "basename",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // path.extname(path) - Extension including the dot
  path.set(
    "extname",
    lua.create_function(|_, path_str: String| {
      Ok(
        Path::new(&path_str)
          .extension()
          .map(|e| format!(".{}", e.to_string_lossy()))
          .unwrap_or_default(),
      )
    })?,
  )?;

  path.set(
    "is_absolute",
    lua.create_function(|_, path_str: String| Ok(Path::new(&path_str).is_absolute()))?,
  )?;

  // path.normalize(path) - Fold . and .. without touching the filesystem
  path.set("normalize", lua.create_function(|_, path_str: String| Ok(normpath(&path_str)))?)?;

  // path.relative(from, to) - Relative path leading from one path to another
  path.set(
    "relative",
    lua.create_function(|_, (from, to): (String, String)| {
      let from_path = normalize(Path::new(&from));
      let to_path = normalize(Path::new(&to));
      let from_components: Vec<_> = from_path.components().collect();
      let to_components: Vec<_> = to_path.components().collect();

      let common_len = from_components
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

      let mut relative = PathBuf::new();
      for _ in common_len..from_components.len() {
        relative.push("..");
      }
      for component in to_components.iter().skip(common_len) {
        relative.push(component);
      }

      if relative.as_os_str().is_empty() {
        Ok(".".to_string())
      } else {
        Ok(relative.to_string_lossy().into_owned())
      }
    })?,
  )?;

  Ok(path)
}
