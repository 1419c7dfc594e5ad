//! Identifier syntax for units, declarations and variables.

/// Returns true if `s` is a valid unit or declaration identifier.
///
/// Identifiers are non-empty, consist of ASCII letters, digits, `_`, `.` and
/// `-`, and must not start with `.` or `-`.
pub fn validate_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Returns true if `c` may appear in a bare `$Name` reference.
pub fn is_name_char(c: u8) -> bool {
  c.is_ascii_alphanumeric() || c == b'_'
}

/// Split a variable name into its namespace and local part.
///
/// `"ns:Name"` gives `(Some("ns"), "Name")`, `":Name"` gives `(Some(""), "Name")`
/// and `"Name"` gives `(None, "Name")`. The split happens at the last colon so
/// namespaces of static units (which embed file paths) stay intact.
pub fn split_var(name: &str) -> (Option<&str>, &str) {
  match name.rsplit_once(':') {
    Some((ns, var)) => (Some(ns), var),
    None => (None, name),
  }
}

/// Inverse of [`split_var`].
pub fn create_var(namespace: Option<&str>, name: &str) -> String {
  match namespace {
    Some(ns) => format!("{ns}:{name}"),
    None => name.to_string(),
  }
}
