use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{Binding, Context};
use crate::macros::{Expr, MacroError};
use crate::util::ident::split_var;
use crate::workspace::Workspace;

/// A short-lived context without a namespace.
///
/// Used to bind `$<` and `$@` while one command is expanded, and for ad-hoc
/// overlays passed to [`crate::unit::Unit::eval_with`]. Its bindings are
/// transient: they win over the scope a reference was parsed in.
#[derive(Debug, Default)]
pub struct MutableContext {
  table: RefCell<BTreeMap<String, Expr>>,
}

impl MutableContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&self, name: &str, expr: Expr) {
    self.table.borrow_mut().insert(name.to_string(), expr);
  }

  /// Builder form of [`MutableContext::set`].
  pub fn with(self, name: &str, expr: Expr) -> Self {
    self.set(name, expr);
    self
  }
}

impl Context for MutableContext {
  fn namespace(&self) -> Option<&str> {
    None
  }

  fn lookup(&self, _ws: &Workspace, name: &str) -> Option<Binding> {
    self.table.borrow().get(name).map(|expr| Binding {
      key: name.to_string(),
      expr: expr.clone(),
    })
  }

  fn define(&self, _ws: &Workspace, name: &str, expr: Expr) -> Result<(), MacroError> {
    if let (Some(ns), _) = split_var(name) {
      return Err(MacroError::UnknownNamespace {
        namespace: ns.to_string(),
        name: name.to_string(),
      });
    }
    self.set(name, expr);
    Ok(())
  }

  fn names(&self) -> Vec<String> {
    self.table.borrow().keys().cloned().collect()
  }
}

/// Contexts consulted in order; the first that resolves a name wins.
pub struct ChainContext<'a> {
  layers: Vec<&'a dyn Context>,
}

impl<'a> ChainContext<'a> {
  pub fn new(layers: Vec<&'a dyn Context>) -> Self {
    Self { layers }
  }
}

impl Context for ChainContext<'_> {
  fn namespace(&self) -> Option<&str> {
    self.layers.iter().find_map(|layer| layer.namespace())
  }

  fn lookup(&self, ws: &Workspace, name: &str) -> Option<Binding> {
    self.layers.iter().find_map(|layer| layer.lookup(ws, name))
  }

  fn lookup_transient(&self, ws: &Workspace, name: &str) -> Option<Binding> {
    self.layers.iter().find_map(|layer| layer.lookup_transient(ws, name))
  }

  fn define(&self, ws: &Workspace, name: &str, expr: Expr) -> Result<(), MacroError> {
    match self.layers.first() {
      Some(layer) => layer.define(ws, name, expr),
      None => Err(MacroError::ReadOnly(name.to_string())),
    }
  }

  fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.layers.iter().flat_map(|layer| layer.names()).collect();
    names.sort();
    names.dedup();
    names
  }
}
