//! The macro language: expression trees, parsing and evaluation.
//!
//! Text such as `$CC -c $< -o $@` is parsed once into an [`Expr`] tree. Every
//! reference in the tree remembers the [`Scope`] it was parsed in, so a macro
//! defined in one unit keeps resolving names against that unit even when it is
//! evaluated from somewhere else.
//!
//! # Syntax
//!
//! - `$Name` and `${Name}` - a variable, looked up locally then globally
//! - `$ns:Name` and `${ns:Name}` - a variable of another unit (or alias)
//! - `${:Name}` - a variable of the global context
//! - `$<` and `$@` - the inputs and outputs of the command being expanded
//! - `$$` - a literal `$`
//!
//! Anything else is literal text, so parsing never fails.

mod parse;

pub use parse::parse;

use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::context::Context;
use crate::workspace::{Detached, Workspace};

/// Where a reference resolves when it is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
  /// Not bound to any namespace. Resolved against whatever context evaluates it.
  Free,
  /// The workspace's global context.
  Global,
  /// The context of the unit with this identifier.
  Unit(Rc<str>),
}

impl Scope {
  /// Scope of a context reporting `namespace`.
  ///
  /// `None` is a free scope, the empty namespace is the global context.
  pub fn from_namespace(namespace: Option<&str>) -> Self {
    match namespace {
      None => Self::Free,
      Some("") => Self::Global,
      Some(ns) => Self::Unit(Rc::from(ns)),
    }
  }
}

/// A variable reference inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
  /// The name as written, possibly namespace-qualified (`ns:Name`).
  pub name: Rc<str>,
  pub scope: Scope,
}

/// An immutable macro expression.
///
/// Cloning is cheap: text and children are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  /// Text that is never re-expanded.
  Literal(Rc<str>),
  Reference(Reference),
  /// Concatenation of the child expressions.
  Composite(Rc<[Expr]>),
}

#[derive(Debug, Error)]
pub enum MacroError {
  #[error("undefined variable: {0}")]
  Undefined(String),

  #[error("cyclic reference: {}", .0.join(" -> "))]
  Cyclic(Vec<String>),

  #[error("cannot define '{0}': context is read-only")]
  ReadOnly(String),

  #[error("unknown namespace '{namespace}' in '{name}'")]
  UnknownNamespace { namespace: String, name: String },

  #[error(transparent)]
  Detached(#[from] Detached),
}

impl Expr {
  /// A literal that is inserted verbatim, `$` included.
  pub fn raw(text: impl Into<Rc<str>>) -> Self {
    Self::Literal(text.into())
  }

  pub fn empty() -> Self {
    Self::Composite(Rc::from(Vec::new()))
  }

  /// Concatenation of `self` followed by `other`.
  pub fn concat(self, other: Expr) -> Self {
    Self::Composite(Rc::from(vec![self, other]))
  }

  /// Copy of this tree with every bound reference moved to `scope`.
  ///
  /// Free references stay free.
  pub fn rebind(&self, scope: &Scope) -> Self {
    match self {
      Self::Literal(_) => self.clone(),
      Self::Reference(reference) => Self::Reference(Reference {
        name: reference.name.clone(),
        scope: match reference.scope {
          Scope::Free => Scope::Free,
          _ => scope.clone(),
        },
      }),
      Self::Composite(children) => Self::Composite(children.iter().map(|child| child.rebind(scope)).collect()),
    }
  }

  /// Evaluate against `ctx` with a fresh resolution stack.
  pub fn evaluate(&self, ws: &Workspace, ctx: &dyn Context) -> Result<String, MacroError> {
    let mut stack = Vec::new();
    self.eval(ws, ctx, &mut stack)
  }

  /// Evaluate against `ctx`.
  ///
  /// `stack` holds the qualified names currently being resolved; meeting one
  /// of them again is a [`MacroError::Cyclic`].
  pub fn eval(&self, ws: &Workspace, ctx: &dyn Context, stack: &mut Vec<String>) -> Result<String, MacroError> {
    match self {
      Self::Literal(text) => Ok(text.to_string()),
      Self::Composite(children) => {
        let mut result = String::new();
        for child in children.iter() {
          result.push_str(&child.eval(ws, ctx, stack)?);
        }
        Ok(result)
      }
      Self::Reference(reference) => {
        let binding = match ctx.lookup_transient(ws, &reference.name) {
          Some(binding) => Some(binding),
          None => match &reference.scope {
            Scope::Free => ctx.lookup(ws, &reference.name),
            Scope::Global => ws.context().lookup(ws, &reference.name),
            Scope::Unit(id) => ws
              .scope_unit(id)
              .and_then(|unit| unit.context().lookup(ws, &reference.name)),
          },
        };
        let binding = binding.ok_or_else(|| MacroError::Undefined(reference.name.to_string()))?;

        if stack.contains(&binding.key) {
          let mut cycle = stack.clone();
          cycle.push(binding.key);
          return Err(MacroError::Cyclic(cycle));
        }

        stack.push(binding.key);
        let result = binding.expr.eval(ws, ctx, stack);
        stack.pop();
        result
      }
    }
  }
}

impl From<&str> for Expr {
  /// A literal; use [`parse`] for macro text.
  fn from(text: &str) -> Self {
    Self::raw(text)
  }
}

impl fmt::Display for Expr {
  /// Writes the expression back as macro source.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Literal(text) => write!(f, "{}", text.replace('$', "$$")),
      Self::Reference(reference) => match &*reference.name {
        "<" | "@" => write!(f, "${}", reference.name),
        name => write!(f, "${{{name}}}"),
      },
      Self::Composite(children) => children.iter().try_for_each(|child| write!(f, "{child}")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn unit_scope(id: &str) -> Scope {
    Scope::Unit(Rc::from(id))
  }

  #[test]
  fn scope_from_namespace() {
    assert_eq!(Scope::from_namespace(None), Scope::Free);
    assert_eq!(Scope::from_namespace(Some("")), Scope::Global);
    assert_eq!(Scope::from_namespace(Some("cpp")), unit_scope("cpp"));
  }

  #[test]
  fn rebind_moves_bound_references_only() {
    let expr = parse("-I$Include $<", &unit_scope("a"));
    let rebound = expr.rebind(&unit_scope("b"));

    let Expr::Composite(children) = rebound else {
      panic!("expected composite");
    };
    let scopes: Vec<_> = children
      .iter()
      .filter_map(|child| match child {
        Expr::Reference(r) => Some((r.name.to_string(), r.scope.clone())),
        _ => None,
      })
      .collect();
    assert_eq!(
      scopes,
      vec![("Include".to_string(), unit_scope("b")), ("<".to_string(), unit_scope("b"))]
    );
  }

  #[test]
  fn rebind_keeps_free_references_free() {
    let expr = parse("$X", &Scope::Free);
    assert_eq!(expr.rebind(&unit_scope("b")), expr);
  }

  #[test]
  fn display_reconstructs_source() {
    let expr = parse("cc $< -o $@ ${a.b:Flags} $$HOME", &Scope::Global);
    assert_eq!(expr.to_string(), "cc $< -o $@ ${a.b:Flags} $$HOME");
  }

  #[test]
  fn display_escapes_raw_dollars() {
    assert_eq!(Expr::raw("$notavar").to_string(), "$$notavar");
  }

  #[test]
  fn concat_keeps_both_sides() {
    let expr = Expr::raw("a").concat(Expr::raw("b"));
    assert_eq!(expr.to_string(), "ab");
  }
}
