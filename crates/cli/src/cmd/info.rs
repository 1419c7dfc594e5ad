use anyhow::Result;

use creator_lib::platform::{Platform, architecture, platform_name, platform_standard};

use super::session::{SessionOptions, open_workspace};
use crate::output::print_stat;

pub fn cmd_info(options: &SessionOptions) -> Result<()> {
  println!("System:");
  match Platform::current() {
    Some(platform) => print_stat("Platform", &platform.triple()),
    None => println!("Could not detect platform."),
  }
  print_stat("Platform name", platform_name());
  print_stat("Platform standard", platform_standard());
  print_stat("Architecture", architecture());

  let workspace = open_workspace(options)?;
  println!("Search path:");
  for dir in workspace.search_path() {
    println!("  {}", dir.display());
  }

  let units = workspace.available_units();
  println!("Units:");
  if units.is_empty() {
    println!("  (none)");
  }
  for (identifier, path) in &units {
    println!("  {identifier} {}", path.display());
  }
  Ok(())
}
