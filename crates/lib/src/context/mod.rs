//! Scopes that store and resolve named macro expressions.
//!
//! Every context takes the [`Workspace`] explicitly so it can hand qualified
//! names to the unit or global context that owns them. Contexts use interior
//! mutability; the whole graph is single-threaded.

mod chain;
mod global;
mod unit;

pub use chain::{ChainContext, MutableContext};
pub use global::GlobalContext;
pub use unit::UnitContext;

use crate::macros::{Expr, MacroError, Scope, parse};
use crate::workspace::Workspace;

/// A resolved variable.
#[derive(Debug, Clone)]
pub struct Binding {
  /// Fully qualified name of what was resolved (`unit:Name`, `:Name`, or the
  /// bare name for scratch contexts). Used to detect cycles.
  pub key: String,
  pub expr: Expr,
}

pub trait Context {
  /// `None` for scratch contexts, `""` for the global context, else the unit
  /// identifier.
  fn namespace(&self) -> Option<&str>;

  /// Resolve `name`, which may be namespace-qualified.
  fn lookup(&self, ws: &Workspace, name: &str) -> Option<Binding>;

  /// Bindings that take precedence over the scope a reference was parsed in.
  ///
  /// Only scratch contexts contribute transient bindings.
  fn lookup_transient(&self, ws: &Workspace, name: &str) -> Option<Binding> {
    match self.namespace() {
      None => self.lookup(ws, name),
      Some(_) => None,
    }
  }

  fn define(&self, _ws: &Workspace, name: &str, _expr: Expr) -> Result<(), MacroError> {
    Err(MacroError::ReadOnly(name.to_string()))
  }

  /// Names stored directly in this context.
  fn names(&self) -> Vec<String>;

  fn scope(&self) -> Scope {
    Scope::from_namespace(self.namespace())
  }

  /// Parse `text` bound to this context's scope.
  fn parse(&self, text: &str) -> Expr {
    parse(text, &self.scope())
  }

  /// Parse and evaluate `text` in this context.
  fn eval_text(&self, ws: &Workspace, text: &str) -> Result<String, MacroError>
  where
    Self: Sized,
  {
    self.parse(text).evaluate(ws, self)
  }
}
