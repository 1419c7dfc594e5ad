//! Ninja files produced from Lua units.

use creator_lib::ninja::{self, ExportError};

use super::common::Project;

#[test]
fn compile_one_file() {
  let project = Project::new();
  project.unit(
    "hello",
    r#"
      target{ name = "bin", inputs = "main.c", outputs = "hello", command = "cc $< -o $@" }
    "#,
  );

  assert_eq!(
    project.export("hello"),
    "# Generated by creator for unit 'hello'. Do not edit.\n\
     \n\
     # Target: hello:bin\n\
     rule hello_bin_0000\n\
     \x20 command = cc main.c -o hello\n\
     build hello: hello_bin_0000 main.c\n\
     build hello_bin: phony hello\n\
     \n"
  );
}

#[test]
fn objects_then_link() {
  let project = Project::new();
  project.unit(
    "app",
    r#"
      define("CC", "gcc")
      define("Sources", "a.c b.c")
      define("Objects", "a.o b.o")
      local objs = target{
        name = "objs",
        inputs = "${Sources}",
        outputs = "${Objects}",
        command = "${CC} -c $< -o $@",
        each = true,
      }
      target{
        name = "link",
        inputs = "${Objects}",
        outputs = "app",
        command = "${CC} $< -o $@",
        requires = { objs },
      }
    "#,
  );

  let text = project.export("app");
  assert!(text.contains("  command = gcc -c a.c -o a.o\n"), "{text}");
  assert!(text.contains("build b.o: app_objs_0001 b.c\n"), "{text}");
  assert!(text.contains("  command = gcc a.o b.o -o app\n"), "{text}");
  assert!(text.contains("build app: app_link_0000 a.o b.o\n"), "{text}");

  let objs = text.find("# Target: app:objs").unwrap();
  let link = text.find("# Target: app:link").unwrap();
  assert!(objs < link);
}

#[test]
fn targets_across_units() {
  let project = Project::new();
  project.unit_in(
    "gen",
    "gen",
    r#"
      target{ name = "header", inputs = "", outputs = "version.h", command = "mkversion > $@" }
    "#,
  );
  project.unit(
    "app",
    r#"
      load("gen", "g")
      target{ name = "bin", inputs = "main.c", outputs = "app", command = "cc $< -o $@", requires = "g:header" }
    "#,
  );

  let text = project.export("app");
  assert!(text.contains("build app: app_bin_0000 main.c version.h\n"), "{text}");
  let gen_pos = text.find("# Target: gen:header").unwrap();
  let app_pos = text.find("# Target: app:bin").unwrap();
  assert!(gen_pos < app_pos);
}

#[test]
fn selected_targets_become_defaults() {
  let project = Project::new();
  project.unit(
    "app",
    r#"
      target{ name = "one", inputs = "1.c", outputs = "1.o", command = "cc -c $< -o $@" }
      target{ name = "two", inputs = "2.c", outputs = "2.o", command = "cc -c $< -o $@" }
    "#,
  );
  let unit = project.workspace.load_unit("app").unwrap();
  project.workspace.setup_targets().unwrap();

  let one = unit.get_target("one").unwrap();
  let mut out = Vec::new();
  ninja::export(&mut out, &project.workspace, Some(unit.as_ref()), Some(&[one][..])).unwrap();
  let text = String::from_utf8(out).unwrap();

  assert!(text.contains("# Target: app:one"));
  assert!(!text.contains("# Target: app:two"));
  assert!(text.ends_with("default app_one\n"), "{text}");
}

#[test]
fn export_requires_setup() {
  let project = Project::new();
  project.unit(
    "app",
    r#"target{ name = "bin", inputs = "main.c", outputs = "app", command = "cc $< -o $@" }"#,
  );
  let unit = project.workspace.load_unit("app").unwrap();

  let mut out = Vec::new();
  let err = ninja::export(&mut out, &project.workspace, Some(unit.as_ref()), None).unwrap_err();
  assert!(matches!(err, ExportError::NotSetUp(ref id) if id == "app:bin"));
}

#[test]
fn each_count_mismatch_fails_setup() {
  let project = Project::new();
  project.unit(
    "app",
    r#"target{ name = "objs", inputs = "a.c b.c", outputs = "a.o", command = "cc", each = true }"#,
  );
  project.workspace.load_unit("app").unwrap();

  let err = project.workspace.setup_targets().unwrap_err();
  assert!(err.to_string().contains("app:objs"), "{err}");
}
