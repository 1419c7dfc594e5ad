use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{Binding, Context};
use crate::macros::{Expr, MacroError};
use crate::util::ident::{create_var, split_var};
use crate::workspace::Workspace;

/// The context of a single unit.
///
/// Unqualified names resolve locally, then globally. Qualified names go
/// through the alias table first; a namespace naming this unit resolves
/// locally, any other is handed to the global context fully qualified.
#[derive(Debug)]
pub struct UnitContext {
  namespace: Rc<str>,
  is_static: bool,
  table: RefCell<BTreeMap<String, Expr>>,
  aliases: RefCell<BTreeMap<String, String>>,
}

impl UnitContext {
  pub fn new(namespace: Rc<str>, is_static: bool) -> Self {
    Self {
      namespace,
      is_static,
      table: RefCell::new(BTreeMap::new()),
      aliases: RefCell::new(BTreeMap::new()),
    }
  }

  /// Static contexts write unqualified definitions to the global context.
  pub fn is_static(&self) -> bool {
    self.is_static
  }

  /// Map an alias to the namespace it stands for.
  pub fn resolve_namespace(&self, namespace: &str) -> String {
    self
      .aliases
      .borrow()
      .get(namespace)
      .cloned()
      .unwrap_or_else(|| namespace.to_string())
  }

  pub fn alias(&self, alias: &str, identifier: &str) {
    self.aliases.borrow_mut().insert(alias.to_string(), identifier.to_string());
  }

  pub fn aliases(&self) -> BTreeMap<String, String> {
    self.aliases.borrow().clone()
  }

  /// Look up an unqualified name in this unit's own table only.
  pub fn lookup_local(&self, name: &str) -> Option<Binding> {
    self.table.borrow().get(name).map(|expr| Binding {
      key: create_var(Some(&self.namespace), name),
      expr: expr.clone(),
    })
  }

  pub fn set_local(&self, name: &str, expr: Expr) {
    self.table.borrow_mut().insert(name.to_string(), expr);
  }

  /// Snapshot of the local table.
  pub fn items(&self) -> Vec<(String, Expr)> {
    self
      .table
      .borrow()
      .iter()
      .map(|(name, expr)| (name.clone(), expr.clone()))
      .collect()
  }
}

impl Context for UnitContext {
  fn namespace(&self) -> Option<&str> {
    Some(&self.namespace)
  }

  fn lookup(&self, ws: &Workspace, name: &str) -> Option<Binding> {
    match split_var(name) {
      (None, var) => self.lookup_local(var).or_else(|| ws.context().lookup(ws, var)),
      (Some(""), var) => ws.context().lookup(ws, var),
      (Some(ns), var) => {
        let ns = self.resolve_namespace(ns);
        if *ns == *self.namespace {
          self.lookup_local(var)
        } else {
          ws.context().lookup(ws, &create_var(Some(&ns), var))
        }
      }
    }
  }

  fn define(&self, ws: &Workspace, name: &str, expr: Expr) -> Result<(), MacroError> {
    match split_var(name) {
      (None, var) if self.is_static => ws.context().define(ws, var, expr),
      (None, var) => {
        self.set_local(var, expr);
        Ok(())
      }
      (Some(""), var) => ws.context().define(ws, var, expr),
      (Some(ns), var) => {
        let ns = self.resolve_namespace(ns);
        if *ns == *self.namespace {
          self.set_local(var, expr);
          return Ok(());
        }
        let unit = ws.scope_unit(&ns).ok_or_else(|| MacroError::UnknownNamespace {
          namespace: ns.clone(),
          name: name.to_string(),
        })?;
        unit.context().set_local(var, expr);
        Ok(())
      }
    }
  }

  fn names(&self) -> Vec<String> {
    self.table.borrow().keys().cloned().collect()
  }
}
