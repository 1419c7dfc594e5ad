//! `extends` between Lua units.

use super::common::Project;

const CBASE: &str = r#"
  define("CC", "gcc")
  define("Flags", "-O2")
  target{
    name = "bin",
    inputs = "${Sources}",
    outputs = "${Program}",
    command = "${CC} ${Flags} $< -o $@",
    abstract = true,
  }
"#;

#[test]
fn abstract_targets_become_concrete_in_the_child() {
  let project = Project::new();
  project.unit("cbase", CBASE);
  project.unit(
    "hello",
    r#"
      extends("cbase")
      define("Sources", "main.c util.c")
      define("Program", "hello")
    "#,
  );

  let text = project.export("hello");
  assert!(text.contains("# Target: hello:bin\n"), "{text}");
  assert!(text.contains("  command = gcc -O2 main.c util.c -o hello\n"), "{text}");
  assert!(!text.contains("cbase:bin"), "{text}");
}

#[test]
fn child_overrides_apply_to_inherited_specs() {
  let project = Project::new();
  project.unit("cbase", CBASE);
  project.unit(
    "hello",
    r#"
      extends("cbase")
      define("CC", "clang")
      append("Flags", " -g")
      define("Sources", "main.c")
      define("Program", "hello")
    "#,
  );

  let text = project.export("hello");
  assert!(text.contains("  command = clang -O2 -g main.c -o hello\n"), "{text}");

  let base = project.workspace.get_unit("cbase").unwrap();
  assert_eq!(base.eval("${CC} ${Flags}").unwrap(), "gcc -O2");
}

#[test]
fn variables_only() {
  let project = Project::new();
  project.unit("cbase", CBASE);
  project.unit("hello", r#"extends("cbase", false)"#);

  let unit = project.workspace.load_unit("hello").unwrap();
  assert_eq!(unit.eval("${CC}").unwrap(), "gcc");
  assert!(unit.targets().is_empty());
}

#[test]
fn self_still_names_the_child() {
  let project = Project::new();
  project.unit("cbase", r#"define("Name", "${self}")"#);
  project.unit("hello", r#"extends("cbase")"#);

  let unit = project.workspace.load_unit("hello").unwrap();
  assert_eq!(unit.eval("${self}").unwrap(), "hello");
  assert_eq!(unit.eval("${Name}").unwrap(), "hello");
  assert_eq!(project.workspace.get_unit("cbase").unwrap().eval("${Name}").unwrap(), "cbase");
}

#[test]
fn concrete_dependency_inside_abstract_chain() {
  let project = Project::new();
  project.unit(
    "cbase",
    r#"
      local objs = target{
        name = "objs",
        inputs = "${Sources}",
        outputs = "${Objects}",
        command = "cc -c $< -o $@",
        each = true,
        abstract = true,
      }
      target{
        name = "link",
        inputs = "${Objects}",
        outputs = "${Program}",
        command = "cc $< -o $@",
        requires = { objs },
        abstract = true,
      }
    "#,
  );
  project.unit(
    "hello",
    r#"
      define("Sources", "a.c")
      define("Objects", "a.o")
      define("Program", "hello")
      extends("cbase")
    "#,
  );

  let text = project.export("hello");
  assert!(text.contains("build a.o: hello_objs_0000 a.c\n"), "{text}");
  assert!(text.contains("build hello: hello_link_0000 a.o\n"), "{text}");
  let objs = text.find("# Target: hello:objs").unwrap();
  let link = text.find("# Target: hello:link").unwrap();
  assert!(objs < link);
}
