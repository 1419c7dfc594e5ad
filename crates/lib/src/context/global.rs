use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{Binding, Context};
use crate::macros::{Expr, MacroError};
use crate::platform;
use crate::util::ident::{create_var, split_var};
use crate::workspace::Workspace;

/// Variables computed from the host when nothing else defines them.
const BUILTINS: [&str; 3] = ["Platform", "PlatformStandard", "Architecture"];

/// The workspace-wide context.
///
/// Unresolved names fall back to the built-in platform variables and then to
/// the process environment. Qualified names are forwarded to the unit that
/// owns the namespace.
#[derive(Debug, Default)]
pub struct GlobalContext {
  table: RefCell<BTreeMap<String, Expr>>,
}

impl GlobalContext {
  pub fn new() -> Self {
    Self::default()
  }

  fn builtin(name: &str) -> Option<&'static str> {
    match name {
      "Platform" => Some(platform::platform_name()),
      "PlatformStandard" => Some(platform::platform_standard()),
      "Architecture" => Some(platform::architecture()),
      _ => None,
    }
  }

  fn lookup_global(&self, name: &str) -> Option<Binding> {
    let key = create_var(Some(""), name);
    if let Some(expr) = self.table.borrow().get(name) {
      return Some(Binding { key, expr: expr.clone() });
    }
    if let Some(value) = Self::builtin(name) {
      return Some(Binding { key, expr: Expr::raw(value) });
    }
    std::env::var(name).ok().map(|value| Binding { key, expr: Expr::raw(value) })
  }

  /// Store `expr` under the unqualified `name`.
  pub fn set(&self, name: &str, expr: Expr) {
    self.table.borrow_mut().insert(name.to_string(), expr);
  }
}

impl Context for GlobalContext {
  fn namespace(&self) -> Option<&str> {
    Some("")
  }

  fn lookup(&self, ws: &Workspace, name: &str) -> Option<Binding> {
    match split_var(name) {
      (Some(ns), var) if !ns.is_empty() => ws.scope_unit(ns)?.context().lookup_local(var),
      (_, var) => self.lookup_global(var),
    }
  }

  fn define(&self, ws: &Workspace, name: &str, expr: Expr) -> Result<(), MacroError> {
    match split_var(name) {
      (Some(ns), var) if !ns.is_empty() => {
        let unit = ws.scope_unit(ns).ok_or_else(|| MacroError::UnknownNamespace {
          namespace: ns.to_string(),
          name: name.to_string(),
        })?;
        unit.context().set_local(var, expr);
        Ok(())
      }
      (_, var) => {
        self.set(var, expr);
        Ok(())
      }
    }
  }

  fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.table.borrow().keys().cloned().collect();
    for builtin in BUILTINS {
      if !names.iter().any(|name| name == builtin) {
        names.push(builtin.to_string());
      }
    }
    names.sort();
    names
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::TestWorkspace;
  use serial_test::serial;

  #[test]
  fn builtins_are_always_defined() {
    let tw = TestWorkspace::new();
    let ws = tw.workspace();
    for name in BUILTINS {
      assert!(ws.context().lookup(ws, name).is_some(), "{name} should resolve");
    }
    assert_eq!(
      ws.context().eval_text(ws, "$Architecture").unwrap(),
      platform::architecture()
    );
  }

  #[test]
  fn defined_values_shadow_builtins() {
    let tw = TestWorkspace::new();
    let ws = tw.workspace();
    ws.context().set("Platform", Expr::raw("custom"));
    assert_eq!(ws.context().eval_text(ws, "$Platform").unwrap(), "custom");
  }

  #[test]
  #[serial]
  fn environment_is_the_last_fallback() {
    temp_env::with_var("CREATOR_TEST_ENV_FALLBACK", Some("from-env"), || {
      let tw = TestWorkspace::new();
      let ws = tw.workspace();
      assert_eq!(
        ws.context().eval_text(ws, "${CREATOR_TEST_ENV_FALLBACK}").unwrap(),
        "from-env"
      );

      ws.context().set("CREATOR_TEST_ENV_FALLBACK", Expr::raw("defined"));
      assert_eq!(
        ws.context().eval_text(ws, "$CREATOR_TEST_ENV_FALLBACK").unwrap(),
        "defined"
      );
    });
  }

  #[test]
  fn empty_namespace_means_global() {
    let tw = TestWorkspace::new();
    let ws = tw.workspace();
    ws.context().define(ws, ":Out", Expr::raw("build")).unwrap();
    assert_eq!(ws.context().eval_text(ws, "${:Out}/$Out").unwrap(), "build/build");
  }

  #[test]
  fn qualified_define_needs_a_known_unit() {
    let tw = TestWorkspace::new();
    let ws = tw.workspace();
    let err = ws.context().define(ws, "nowhere:X", Expr::raw("1")).unwrap_err();
    assert!(matches!(err, MacroError::UnknownNamespace { ref namespace, .. } if namespace == "nowhere"));
  }

  #[test]
  fn qualified_names_reach_unit_storage() {
    let tw = TestWorkspace::new();
    tw.add_unit("lib", |unit| {
      unit.define("Name", "libfoo")?;
      Ok(())
    });
    let ws = tw.workspace();
    ws.load_unit("lib").unwrap();

    assert_eq!(ws.context().eval_text(ws, "${lib:Name}.a").unwrap(), "libfoo.a");
    ws.context().define(ws, "lib:Name", Expr::raw("libbar")).unwrap();
    assert_eq!(ws.context().eval_text(ws, "${lib:Name}.a").unwrap(), "libbar.a");
  }

  #[test]
  fn names_include_builtins() {
    let ctx = GlobalContext::new();
    ctx.set("Zed", Expr::raw("z"));
    assert_eq!(ctx.names(), vec!["Architecture", "Platform", "PlatformStandard", "Zed"]);
  }
}
