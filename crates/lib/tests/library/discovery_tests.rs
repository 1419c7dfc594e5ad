//! Finding and loading unit files.

use creator_lib::workspace::WorkspaceError;

use super::common::Project;

#[test]
fn units_in_direct_subdirectories() {
  let project = Project::new();
  project.unit_in("zlib", "zlib", r#"define("Version", "1.3")"#);

  let unit = project.workspace.load_unit("zlib").unwrap();
  assert_eq!(unit.eval("${Version}").unwrap(), "1.3");
  assert_eq!(
    dunce::canonicalize(unit.project_path()).unwrap(),
    dunce::canonicalize(project.root().join("zlib")).unwrap()
  );
}

#[test]
fn creator_files_need_metadata() {
  let project = Project::new();
  project.write("tools/Creator", "-- @creator.unit.name tools\ndefine(\"Kind\", \"tools\")\n");
  project.write("other/Creator", "define(\"Kind\", \"other\")\n");

  let units = project.workspace.available_units();
  assert!(units.contains_key("tools"));
  assert!(!units.contains_key("other"));
}

#[test]
fn missing_metadata_falls_back_to_the_stem() {
  let project = Project::new();
  project.write("misc.creator", "define(\"X\", \"1\")\n");

  let unit = project.workspace.load_unit("misc").unwrap();
  assert_eq!(unit.identifier(), "misc");
}

#[test]
fn unknown_units() {
  let project = Project::new();
  let err = project.workspace.load_unit("nope").unwrap_err();
  assert!(matches!(err, WorkspaceError::UnitNotFound(ref id) if id == "nope"));
}

#[test]
fn directory_profile_runs_once_before_its_units() {
  let project = Project::new();
  project.write("proj/.creator_profile", "define(\"Toolchain\", \"llvm\")\n");
  project.unit_in("proj", "app", r#"define("CC", "${Toolchain}-cc")"#);
  project.unit_in("proj", "lib", r#"define("AR", "${Toolchain}-ar")"#);
  project.unit("outside", "");

  let app = project.workspace.load_unit("app").unwrap();
  let lib = project.workspace.load_unit("lib").unwrap();
  assert_eq!(app.eval("${CC}").unwrap(), "llvm-cc");
  assert_eq!(lib.eval("${AR}").unwrap(), "llvm-ar");
  assert_eq!(project.workspace.static_units().len(), 1);

  let outside = project.workspace.load_unit("outside").unwrap();
  assert_eq!(outside.eval("${Toolchain}").unwrap(), "llvm");
}

#[test]
fn failed_units_can_be_retried() {
  let project = Project::new();
  project.unit("flaky", r#"error("not yet")"#);
  assert!(project.workspace.load_unit("flaky").is_err());

  project.unit("flaky", r#"define("Ok", "yes")"#);
  let unit = project.workspace.load_unit("flaky").unwrap();
  assert_eq!(unit.eval("${Ok}").unwrap(), "yes");
}
