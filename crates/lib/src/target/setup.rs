//! Turning a parsed build specification into command entries.

use super::{CommandEntry, DeclError, TargetSpec};
use crate::context::{ChainContext, Context, MutableContext};
use crate::macros::Expr;
use crate::unit::Unit;
use crate::util::path::normpath;
use crate::util::text::{join, split};
use crate::workspace::Workspace;

/// Evaluate `spec` against the context of `unit`.
///
/// Inputs and outputs are split into lists of normalized paths. In `each`
/// mode every input is paired with the output at the same position and the
/// command is evaluated once per pair; otherwise a single entry covers all
/// inputs and outputs.
pub(super) fn evaluate(
  identifier: &str,
  unit: &Unit,
  ws: &Workspace,
  spec: &TargetSpec,
) -> Result<Vec<CommandEntry>, DeclError> {
  let ctx = unit.context();
  let inputs = paths(&spec.inputs.evaluate(ws, ctx)?);
  let outputs = paths(&spec.outputs.evaluate(ws, ctx)?);
  let mut auxiliary = Vec::new();
  for expr in &spec.auxiliary {
    auxiliary.extend(paths(&expr.evaluate(ws, ctx)?));
  }

  if spec.each {
    if inputs.len() != outputs.len() {
      return Err(DeclError::CountMismatch {
        identifier: identifier.to_string(),
        inputs: inputs.len(),
        outputs: outputs.len(),
      });
    }

    let mut entries = Vec::with_capacity(inputs.len());
    for (input, output) in inputs.into_iter().zip(outputs) {
      let command = expand_command(&spec.command, ws, ctx, &input, &output)?;
      entries.push(CommandEntry {
        inputs: vec![input],
        outputs: vec![output],
        command,
        auxiliary: auxiliary.clone(),
      });
    }
    return Ok(entries);
  }

  if outputs.is_empty() {
    return Err(DeclError::NoOutputs(identifier.to_string()));
  }
  let command = expand_command(&spec.command, ws, ctx, &join(&inputs), &join(&outputs))?;
  Ok(vec![CommandEntry {
    inputs,
    outputs,
    command,
    auxiliary,
  }])
}

/// Evaluate `command` with `$<` and `$@` bound for this expansion only.
fn expand_command(
  command: &Expr,
  ws: &Workspace,
  ctx: &dyn Context,
  inputs: &str,
  outputs: &str,
) -> Result<String, DeclError> {
  let positional = MutableContext::new()
    .with("<", Expr::raw(inputs))
    .with("@", Expr::raw(outputs));
  let chain = ChainContext::new(vec![&positional as &dyn Context, ctx]);
  Ok(command.evaluate(ws, &chain)?)
}

fn paths(text: &str) -> Vec<String> {
  split(text).iter().map(|item| normpath(item)).collect()
}

#[cfg(test)]
mod tests {
  use crate::target::{DeclError, DeclRef};
  use crate::unit::TargetDecl;
  use crate::util::testutil::TestWorkspace;

  fn set_up(tw: &TestWorkspace, decl: TargetDecl) -> Result<DeclRef, DeclError> {
    let unit = tw.bare_unit("a");
    let target = unit.target(decl)?;
    target.do_setup()?;
    Ok(target)
  }

  #[test]
  fn single_entry_binds_joined_lists() {
    let tw = TestWorkspace::new();
    let target = set_up(&tw, TargetDecl::new("lib", "a.o b.o", "liba.a", "ar rcs $@ $<")).unwrap();

    let entries = target.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].inputs, vec!["a.o", "b.o"]);
    assert_eq!(entries[0].command, "ar rcs liba.a a.o b.o");
  }

  #[test]
  fn each_mode_pairs_positionally() {
    let tw = TestWorkspace::new();
    let target = set_up(
      &tw,
      TargetDecl::new("objs", "a.c b.c", "a.o b.o", "cc -c $< -o $@").with_each(true),
    )
    .unwrap();

    let commands: Vec<String> = target.entries().into_iter().map(|e| e.command).collect();
    assert_eq!(commands, vec!["cc -c a.c -o a.o", "cc -c b.c -o b.o"]);
  }

  #[test]
  fn each_mode_count_mismatch_produces_nothing() {
    let tw = TestWorkspace::new();
    let unit = tw.bare_unit("a");
    let target = unit
      .target(TargetDecl::new("objs", "a.c b.c c.c", "a.o b.o", "cc $< -o $@").with_each(true))
      .unwrap();

    let err = target.do_setup().unwrap_err();
    assert!(matches!(err, DeclError::CountMismatch { inputs: 3, outputs: 2, .. }));
    assert!(target.entries().is_empty());
    assert!(!target.is_setup());
  }

  #[test]
  fn each_mode_allows_empty_lists() {
    let tw = TestWorkspace::new();
    let target = set_up(&tw, TargetDecl::new("objs", "", "", "cc $< -o $@").with_each(true)).unwrap();
    assert!(target.entries().is_empty());
  }

  #[test]
  fn zero_outputs_is_an_error() {
    let tw = TestWorkspace::new();
    let err = set_up(&tw, TargetDecl::new("nothing", "a.c", "  ", "cc")).unwrap_err();
    assert!(matches!(err, DeclError::NoOutputs(_)));
  }

  #[test]
  fn paths_are_normalized() {
    let tw = TestWorkspace::new();
    let target = set_up(&tw, TargetDecl::new("obj", "./src/../a.c", "build/./a.o", "cc $< -o $@")).unwrap();
    let entry = &target.entries()[0];
    assert_eq!(entry.inputs, vec!["a.c"]);
    assert_eq!(entry.outputs, vec!["build/a.o"]);
    assert_eq!(entry.command, "cc a.c -o build/a.o");
  }

  #[test]
  fn macros_expand_into_lists() {
    let tw = TestWorkspace::new();
    let unit = tw.bare_unit("a");
    unit.define("Sources", "main.c util.c").unwrap();
    unit.define("Objects", "main.o util.o").unwrap();
    let target = unit
      .target(TargetDecl::new("objs", "$Sources", "$Objects", "$CC -c $< -o $@").with_each(true))
      .unwrap();
    unit.define("CC", "gcc").unwrap();
    target.do_setup().unwrap();

    assert_eq!(target.entries()[1].command, "gcc -c util.c -o util.o");
  }

  #[test]
  fn positional_markers_reach_macros_of_other_units() {
    let tw = TestWorkspace::new();
    tw.add_unit("cc", |unit| {
      unit.define("Compile", "cc -c $< -o $@")?;
      Ok(())
    });
    let unit = tw.bare_unit("a");
    unit.load("cc", None).unwrap();
    let target = unit
      .target(TargetDecl::new("obj", "x.c", "x.o", "${cc:Compile}"))
      .unwrap();
    target.do_setup().unwrap();

    assert_eq!(target.entries()[0].command, "cc -c x.c -o x.o");
  }

  #[test]
  fn quoted_paths_keep_spaces() {
    let tw = TestWorkspace::new();
    let target = set_up(&tw, TargetDecl::new("obj", "\"my file.c\"", "out.o", "cc $< -o $@")).unwrap();
    let entry = &target.entries()[0];
    assert_eq!(entry.inputs, vec!["my file.c"]);
    assert_eq!(entry.command, "cc \"my file.c\" -o out.o");
  }
}
