//! Implementation of the `creator check` command: load and set up, write
//! nothing.

use anyhow::Result;

use super::session::{Session, SessionOptions};
use crate::output::{plural, print_success};

pub fn cmd_check(options: &SessionOptions) -> Result<()> {
  let session = Session::open(options)?;
  session.setup()?;

  let declarations = session.workspace.all_targets();
  let entries: usize = declarations.iter().map(|decl| decl.entries().len()).sum();
  print_success(&format!(
    "Unit '{}' is valid: {}, {}",
    session.main.identifier(),
    plural(declarations.len(), "declaration"),
    plural(entries, "command"),
  ));
  Ok(())
}
