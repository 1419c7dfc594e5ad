//! Low-level ninja syntax.

use std::io::{self, Write};

/// Escape a path for use in a `build` line.
pub fn escape_path(path: &str) -> String {
  let mut escaped = String::with_capacity(path.len());
  for c in path.chars() {
    match c {
      '$' => escaped.push_str("$$"),
      ' ' => escaped.push_str("$ "),
      ':' => escaped.push_str("$:"),
      c => escaped.push(c),
    }
  }
  escaped
}

/// Escape a variable value. Only `$` is special there.
pub fn escape_value(value: &str) -> String {
  value.replace('$', "$$")
}

/// Writes ninja statements to `out`.
pub struct NinjaWriter<W: Write> {
  out: W,
}

impl<W: Write> NinjaWriter<W> {
  pub fn new(out: W) -> Self {
    Self { out }
  }

  pub fn into_inner(self) -> W {
    self.out
  }

  pub fn comment(&mut self, text: &str) -> io::Result<()> {
    for line in text.lines() {
      writeln!(self.out, "# {line}")?;
    }
    Ok(())
  }

  pub fn newline(&mut self) -> io::Result<()> {
    writeln!(self.out)
  }

  pub fn variable(&mut self, key: &str, value: &str, indent: usize) -> io::Result<()> {
    writeln!(self.out, "{}{key} = {}", "  ".repeat(indent), escape_value(value))
  }

  pub fn rule(&mut self, name: &str, command: &str) -> io::Result<()> {
    writeln!(self.out, "rule {name}")?;
    self.variable("command", command, 1)
  }

  /// `build <outputs>: <rule> <inputs>`. Paths are escaped here.
  pub fn build(&mut self, outputs: &[String], rule: &str, inputs: &[String]) -> io::Result<()> {
    let mut line = String::from("build");
    for output in outputs {
      line.push(' ');
      line.push_str(&escape_path(output));
    }
    line.push_str(": ");
    line.push_str(rule);
    for input in inputs {
      line.push(' ');
      line.push_str(&escape_path(input));
    }
    writeln!(self.out, "{line}")
  }

  pub fn default(&mut self, targets: &[String]) -> io::Result<()> {
    let escaped: Vec<String> = targets.iter().map(|t| escape_path(t)).collect();
    writeln!(self.out, "default {}", escaped.join(" "))
  }
}
