//! Exporting set-up targets as a ninja build file.
//!
//! Every command entry of a target becomes a rule and a build statement. The
//! build statement consumes the entry's inputs, the outputs of the target's
//! direct dependencies and its auxiliary files. A phony build named after the
//! target aliases all of its outputs.

mod writer;

pub use writer::{NinjaWriter, escape_path, escape_value};

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::APP_NAME;
use crate::target::{DeclRef, Declaration};
use crate::unit::Unit;
use crate::workspace::Workspace;

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("target '{0}' is not set up")]
  NotSetUp(String),

  #[error("dependency cycle detected involving '{0}'")]
  CycleDetected(String),

  #[error("failed to write ninja file")]
  Io(#[from] std::io::Error),
}

/// Turn an identifier into a valid ninja rule name.
pub fn ident(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
    .collect()
}

/// Name of the rule for entry `index` of target `identifier`.
pub fn rule_name(identifier: &str, index: usize) -> String {
  ident(&format!("{identifier}_{index:04}"))
}

/// Write a ninja file for `selected` targets (and what they depend on), or
/// for every concrete target when `selected` is `None`.
///
/// Every participating target must be set up. Tasks are skipped.
pub fn export<W: Write>(
  out: W,
  ws: &Workspace,
  main_unit: Option<&Unit>,
  selected: Option<&[DeclRef]>,
) -> Result<(), ExportError> {
  let participants = match selected {
    Some(roots) => closure(roots),
    None => ws.all_targets().into_iter().filter(|decl| decl.is_target()).collect(),
  };

  for decl in &participants {
    if !decl.is_setup() {
      return Err(ExportError::NotSetUp(decl.identifier()));
    }
  }

  let ordered = dependency_order(participants)?;
  let mut writer = NinjaWriter::new(out);

  let header = match main_unit {
    Some(unit) => format!("Generated by {APP_NAME} for unit '{}'. Do not edit.", unit.identifier()),
    None => format!("Generated by {APP_NAME}. Do not edit."),
  };
  writer.comment(&header)?;
  writer.newline()?;

  for decl in &ordered {
    write_target(&mut writer, decl)?;
  }

  if let Some(roots) = selected {
    let defaults: Vec<String> = roots
      .iter()
      .filter(|decl| decl.is_target() && !decl.is_abstract())
      .map(|decl| ident(&decl.identifier()))
      .collect();
    if !defaults.is_empty() {
      writer.default(&defaults)?;
    }
  }

  info!(targets = ordered.len(), "exported ninja file");
  Ok(())
}

fn write_target<W: Write>(writer: &mut NinjaWriter<W>, decl: &DeclRef) -> Result<(), ExportError> {
  let identifier = decl.identifier();
  writer.comment(&format!("Target: {identifier}"))?;

  let dependency_outputs: BTreeSet<String> = decl
    .dependencies()
    .iter()
    .filter(|dep| dep.is_target())
    .flat_map(|dep| dep.outputs())
    .collect();

  let entries = decl.entries();
  for (index, entry) in entries.iter().enumerate() {
    let rule = rule_name(&identifier, index);
    let mut seen = HashSet::new();
    let inputs: Vec<String> = entry
      .inputs
      .iter()
      .chain(dependency_outputs.iter())
      .chain(entry.auxiliary.iter())
      .filter(|path| seen.insert(path.as_str()))
      .cloned()
      .collect();

    writer.rule(&rule, &entry.command)?;
    writer.build(&entry.outputs, &rule, &inputs)?;
  }

  writer.build(&[ident(&identifier)], "phony", &decl.outputs())?;
  writer.newline()?;
  debug!(target = %identifier, entries = entries.len(), "wrote target");
  Ok(())
}

/// `roots` plus their transitive target dependencies, without tasks and
/// abstract declarations.
fn closure(roots: &[DeclRef]) -> Vec<DeclRef> {
  let mut seen = HashSet::new();
  let mut stack: Vec<DeclRef> = roots.to_vec();
  let mut found = Vec::new();
  while let Some(decl) = stack.pop() {
    if !decl.is_target() || decl.is_abstract() || !seen.insert(Rc::as_ptr(&decl)) {
      continue;
    }
    stack.extend(decl.dependencies());
    found.push(decl);
  }
  found
}

/// Order `decls` so that dependencies come first; ties go to the smaller
/// identifier.
fn dependency_order(mut decls: Vec<DeclRef>) -> Result<Vec<DeclRef>, ExportError> {
  decls.sort_by_key(|decl| decl.identifier());

  let mut graph: DiGraph<DeclRef, ()> = DiGraph::new();
  let mut nodes: HashMap<*const Declaration, NodeIndex> = HashMap::new();
  for decl in &decls {
    let index = graph.add_node(decl.clone());
    nodes.insert(Rc::as_ptr(decl), index);
  }
  for decl in &decls {
    let dependent = nodes[&Rc::as_ptr(decl)];
    for dep in decl.dependencies() {
      if let Some(&dependency) = nodes.get(&Rc::as_ptr(&dep)) {
        graph.add_edge(dependency, dependent, ());
      }
    }
  }

  toposort(&graph, None).map_err(|cycle| ExportError::CycleDetected(graph[cycle.node_id()].identifier()))?;

  // Node indices follow identifier order, so a min-heap breaks ties by identifier.
  let mut in_degree: Vec<usize> = graph
    .node_indices()
    .map(|node| graph.neighbors_directed(node, Direction::Incoming).count())
    .collect();
  let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
    .node_indices()
    .filter(|node| in_degree[node.index()] == 0)
    .map(Reverse)
    .collect();

  let mut ordered = Vec::with_capacity(decls.len());
  while let Some(Reverse(node)) = ready.pop() {
    ordered.push(graph[node].clone());
    for next in graph.neighbors_directed(node, Direction::Outgoing) {
      in_degree[next.index()] -= 1;
      if in_degree[next.index()] == 0 {
        ready.push(Reverse(next));
      }
    }
  }
  Ok(ordered)
}
