//! Splitting macro results into lists and joining lists back into text.
//!
//! Lists are whitespace separated. Single or double quotes group an item that
//! contains whitespace; inside double quotes a backslash escapes the next
//! character.

/// Split `text` into list items.
pub fn split(text: &str) -> Vec<String> {
  let mut items = Vec::new();
  let mut current = String::new();
  let mut in_item = false;
  let mut chars = text.chars();

  while let Some(ch) = chars.next() {
    match ch {
      '\'' => {
        in_item = true;
        for c in chars.by_ref() {
          if c == '\'' {
            break;
          }
          current.push(c);
        }
      }
      '"' => {
        in_item = true;
        while let Some(c) = chars.next() {
          match c {
            '"' => break,
            '\\' => {
              if let Some(escaped) = chars.next() {
                current.push(escaped);
              }
            }
            _ => current.push(c),
          }
        }
      }
      c if c.is_whitespace() => {
        if in_item {
          items.push(std::mem::take(&mut current));
          in_item = false;
        }
      }
      c => {
        in_item = true;
        current.push(c);
      }
    }
  }

  if in_item {
    items.push(current);
  }
  items
}

/// Quote `item` so that [`split`] yields it back as a single item.
pub fn quote(item: &str) -> String {
  let needs_quotes = item.is_empty() || item.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
  if !needs_quotes {
    return item.to_string();
  }

  let mut quoted = String::with_capacity(item.len() + 2);
  quoted.push('"');
  for c in item.chars() {
    if matches!(c, '"' | '\\') {
      quoted.push('\\');
    }
    quoted.push(c);
  }
  quoted.push('"');
  quoted
}

/// Join `items` into a single space separated string, quoting where needed.
pub fn join<S: AsRef<str>>(items: &[S]) -> String {
  items.iter().map(|s| quote(s.as_ref())).collect::<Vec<_>>().join(" ")
}
