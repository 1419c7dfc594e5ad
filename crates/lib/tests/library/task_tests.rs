//! Tasks declared from Lua.

use creator_lib::target::{DeclError, dependency_order};

use super::common::Project;

#[test]
fn tasks_run_after_their_dependencies() {
  let project = Project::new();
  project.unit(
    "app",
    r#"
      define("Log", "")
      local prep = task{ name = "prep", run = function(u) u:append("Log", "prep ") end }
      task{ name = "deploy", requires = { prep }, run = function(u) u:append("Log", "deploy") end }
    "#,
  );
  let unit = project.workspace.load_unit("app").unwrap();

  let deploy = unit.get_target("deploy").unwrap();
  for task in dependency_order(&[deploy]) {
    task.run().unwrap();
  }
  assert_eq!(unit.eval("${Log}").unwrap(), "prep deploy");
}

#[test]
fn task_errors_carry_the_task() {
  let project = Project::new();
  project.unit("app", r#"task{ name = "fail", run = function(u) error("broken") end }"#);
  let unit = project.workspace.load_unit("app").unwrap();

  let err = unit.run_task("fail").unwrap_err();
  assert!(matches!(err, DeclError::Task { ref identifier, .. } if identifier == "app:fail"));
}

#[test]
fn targets_cannot_require_tasks() {
  let project = Project::new();
  project.unit(
    "app",
    r#"
      task{ name = "prep", run = function(u) end }
      target{ name = "bin", inputs = "a.c", outputs = "a", command = "cc", requires = "prep" }
    "#,
  );
  assert!(project.workspace.load_unit("app").is_err());
  assert!(project.workspace.get_unit("app").is_none());
}

#[test]
fn targets_are_not_runnable() {
  let project = Project::new();
  project.unit(
    "app",
    r#"target{ name = "bin", inputs = "a.c", outputs = "a", command = "cc $< -o $@" }"#,
  );
  let unit = project.workspace.load_unit("app").unwrap();
  assert!(matches!(unit.run_task("bin"), Err(DeclError::NotATask(_))));
}
