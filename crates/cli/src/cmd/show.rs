//! Implementation of the `creator show` command.
//!
//! Lists every concrete declaration with its dependencies and command entries.

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use creator_lib::target::{CommandEntry, DeclRef};

use super::session::{Session, SessionOptions};
use crate::output::{OutputFormat, print_json, symbols};

#[derive(Debug, Serialize)]
struct DeclView {
  identifier: String,
  kind: &'static str,
  dependencies: Vec<String>,
  entries: Vec<CommandEntry>,
}

impl DeclView {
  fn new(decl: &DeclRef) -> Self {
    Self {
      identifier: decl.identifier(),
      kind: decl.kind_name(),
      dependencies: decl.dependencies().iter().map(|dep| dep.identifier()).collect(),
      entries: decl.entries(),
    }
  }
}

pub fn cmd_show(options: &SessionOptions, format: OutputFormat) -> Result<()> {
  let session = Session::open(options)?;
  session.setup()?;

  let views: Vec<DeclView> = session.workspace.all_targets().iter().map(DeclView::new).collect();
  if format.is_json() {
    return print_json(&views);
  }

  for view in &views {
    println!(
      "{} {}",
      view.identifier.if_supports_color(Stream::Stdout, |s| s.bold()),
      format!("({})", view.kind).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    if !view.dependencies.is_empty() {
      println!("  requires: {}", view.dependencies.join(", "));
    }
    for entry in &view.entries {
      println!(
        "  {} {} {}",
        entry.inputs.join(" "),
        symbols::ARROW,
        entry.outputs.join(" ")
      );
      println!("    $ {}", entry.command);
    }
  }
  Ok(())
}
