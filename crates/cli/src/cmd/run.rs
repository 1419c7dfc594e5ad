//! Implementation of the `creator run` command.
//!
//! Runs tasks after the tasks they require, each at most once.

use anyhow::{Context, Result, bail};

use creator_lib::target::dependency_order;

use super::session::{Session, SessionOptions};
use crate::output::{print_info, print_success, print_warning};

pub fn cmd_run(options: &SessionOptions, tasks: &[String]) -> Result<()> {
  let session = Session::open(options)?;
  session.setup()?;
  let roots = session.resolve(tasks)?;
  if let Some(decl) = roots.iter().find(|decl| !decl.is_task()) {
    bail!("'{}' is a {}, not a task", decl.identifier(), decl.kind_name());
  }

  for decl in dependency_order(&roots) {
    if !decl.is_task() {
      print_warning(&format!("Skipping target {}; build it with ninja", decl.identifier()));
      continue;
    }
    print_info(&format!("Running {}", decl.identifier()));
    decl.run().with_context(|| format!("Task '{}' failed", decl.identifier()))?;
  }

  print_success("Done");
  Ok(())
}
