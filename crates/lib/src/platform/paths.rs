use crate::consts::{APP_NAME, BUILTINS_DIR_ENV};
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("USERPROFILE").map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> Option<PathBuf> {
  std::env::var_os("APPDATA").map(|appdata| PathBuf::from(appdata).join(APP_NAME))
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> Option<PathBuf> {
  let data_home = match std::env::var_os("XDG_DATA_HOME") {
    Some(dir) if !dir.is_empty() => PathBuf::from(dir),
    _ => home_dir()?.join(".local").join("share"),
  };
  Some(data_home.join(APP_NAME))
}

/// Directory holding the unit scripts that ship with creator.
///
/// `$CREATOR_BUILTINS` overrides the default `<data dir>/builtins`.
pub fn builtins_dir() -> Option<PathBuf> {
  match std::env::var_os(BUILTINS_DIR_ENV) {
    Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
    _ => data_dir().map(|dir| dir.join("builtins")),
  }
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn xdg_data_home_takes_precedence() {
    temp_env::with_vars(
      [("XDG_DATA_HOME", Some("/custom/data")), ("HOME", Some("/home/user"))],
      || {
        assert_eq!(data_dir(), Some(PathBuf::from("/custom/data").join(APP_NAME)));
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [("XDG_DATA_HOME", None::<&str>), ("HOME", Some("/home/user"))],
      || {
        assert_eq!(
          data_dir(),
          Some(PathBuf::from("/home/user/.local/share").join(APP_NAME))
        );
      },
    );
  }

  #[test]
  #[serial]
  fn builtins_env_overrides_data_dir() {
    temp_env::with_vars(
      [(BUILTINS_DIR_ENV, Some("/opt/creator/builtins")), ("HOME", Some("/home/user"))],
      || {
        assert_eq!(builtins_dir(), Some(PathBuf::from("/opt/creator/builtins")));
      },
    );
  }

  #[test]
  #[serial]
  fn builtins_default_below_data_dir() {
    temp_env::with_vars(
      [
        (BUILTINS_DIR_ENV, None::<&str>),
        ("XDG_DATA_HOME", Some("/data")),
      ],
      || {
        assert_eq!(builtins_dir(), Some(PathBuf::from("/data/creator/builtins")));
      },
    );
  }

  #[test]
  #[serial]
  fn no_home_means_no_data_dir() {
    temp_env::with_vars([("XDG_DATA_HOME", None::<&str>), ("HOME", None::<&str>)], || {
      assert_eq!(home_dir(), None);
      assert_eq!(data_dir(), None);
    });
  }
}
