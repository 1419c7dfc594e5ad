use std::rc::Rc;

use super::{Expr, Reference, Scope};
use crate::util::ident::is_name_char;

/// Parse macro `text` into an expression whose references are bound to `scope`.
///
/// Always returns a [`Expr::Composite`]. Malformed references (`$` followed by
/// something that starts no reference, an unterminated `${`, an empty `${}`)
/// are kept as literal text.
pub fn parse(text: &str, scope: &Scope) -> Expr {
  let bytes = text.as_bytes();
  let mut parts = Vec::new();
  let mut literal = String::new();
  let mut pos = 0;

  while pos < bytes.len() {
    let Some(offset) = text[pos..].find('$') else {
      literal.push_str(&text[pos..]);
      break;
    };
    literal.push_str(&text[pos..pos + offset]);
    let start = pos + offset;

    match scan_reference(text, start) {
      Some((name, end)) => {
        if !literal.is_empty() {
          parts.push(Expr::Literal(Rc::from(std::mem::take(&mut literal))));
        }
        parts.push(Expr::Reference(Reference {
          name: Rc::from(name),
          scope: scope.clone(),
        }));
        pos = end;
      }
      None if bytes.get(start + 1) == Some(&b'$') => {
        literal.push('$');
        pos = start + 2;
      }
      None => {
        literal.push('$');
        pos = start + 1;
      }
    }
  }

  if !literal.is_empty() {
    parts.push(Expr::Literal(Rc::from(literal)));
  }
  Expr::Composite(Rc::from(parts))
}

/// Scan a reference starting at the `$` at `start`.
///
/// Returns the referenced name and the byte index just past the reference.
fn scan_reference(text: &str, start: usize) -> Option<(&str, usize)> {
  let bytes = text.as_bytes();
  let first = start + 1;

  match *bytes.get(first)? {
    b'<' | b'@' => Some((&text[first..first + 1], first + 1)),
    b'{' => {
      let close = first + 1 + text[first + 1..].find('}')?;
      let name = &text[first + 1..close];
      (!name.is_empty()).then_some((name, close + 1))
    }
    c if is_name_char(c) => {
      let mut end = name_end(bytes, first);
      if bytes.get(end) == Some(&b':') && bytes.get(end + 1).is_some_and(|&c| is_name_char(c)) {
        end = name_end(bytes, end + 1);
      }
      Some((&text[first..end], end))
    }
    _ => None,
  }
}

fn name_end(bytes: &[u8], from: usize) -> usize {
  bytes[from..]
    .iter()
    .position(|&c| !is_name_char(c))
    .map_or(bytes.len(), |len| from + len)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lit(text: &str) -> Expr {
    Expr::Literal(Rc::from(text))
  }

  fn var(name: &str) -> Expr {
    Expr::Reference(Reference {
      name: Rc::from(name),
      scope: Scope::Global,
    })
  }

  fn parts(text: &str) -> Vec<Expr> {
    match parse(text, &Scope::Global) {
      Expr::Composite(parts) => parts.to_vec(),
      other => panic!("expected composite, got {other:?}"),
    }
  }

  #[test]
  fn plain_text_is_one_literal() {
    assert_eq!(parts("gcc -O2 main.c"), vec![lit("gcc -O2 main.c")]);
  }

  #[test]
  fn empty_text_is_empty_composite() {
    assert!(parts("").is_empty());
  }

  #[test]
  fn bare_and_braced_references() {
    assert_eq!(parts("$CC"), vec![var("CC")]);
    assert_eq!(parts("${CC}"), vec![var("CC")]);
    assert_eq!(parts("prefix-${N}-suffix"), vec![lit("prefix-"), var("N"), lit("-suffix")]);
  }

  #[test]
  fn bare_name_is_greedy() {
    assert_eq!(parts("$N-suffix"), vec![var("N"), lit("-suffix")]);
    assert_eq!(parts("$Name_2.o"), vec![var("Name_2"), lit(".o")]);
  }

  #[test]
  fn qualified_references() {
    assert_eq!(parts("$b:X"), vec![var("b:X")]);
    assert_eq!(parts("${my.lib:X}"), vec![var("my.lib:X")]);
    assert_eq!(parts("${:X}"), vec![var(":X")]);
  }

  #[test]
  fn bare_colon_without_name_is_literal() {
    assert_eq!(parts("$b: x"), vec![var("b"), lit(": x")]);
    assert_eq!(parts("$b:"), vec![var("b"), lit(":")]);
  }

  #[test]
  fn positional_markers() {
    assert_eq!(
      parts("cc $< -o $@"),
      vec![lit("cc "), var("<"), lit(" -o "), var("@")]
    );
  }

  #[test]
  fn malformed_references_stay_literal() {
    assert_eq!(parts("cost: 5$"), vec![lit("cost: 5$")]);
    assert_eq!(parts("$ x"), vec![lit("$ x")]);
    assert_eq!(parts("${unterminated"), vec![lit("${unterminated")]);
    assert_eq!(parts("${}"), vec![lit("${}")]);
  }

  #[test]
  fn double_dollar_escapes() {
    assert_eq!(parts("$$HOME"), vec![lit("$HOME")]);
    assert_eq!(parts("a$$$X"), vec![lit("a$"), var("X")]);
  }

  #[test]
  fn references_carry_the_parse_scope() {
    let scope = Scope::Unit(Rc::from("cpp"));
    let Expr::Composite(parts) = parse("$X", &scope) else {
      panic!("expected composite");
    };
    assert_eq!(
      parts[0],
      Expr::Reference(Reference {
        name: Rc::from("X"),
        scope
      })
    );
  }

  #[test]
  fn non_ascii_text_is_preserved() {
    assert_eq!(parts("größe $X ü"), vec![lit("größe "), var("X"), lit(" ü")]);
  }
}
