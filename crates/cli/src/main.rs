use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use cmd::SessionOptions;
use output::{OutputFormat, print_error};

/// creator - a meta-build system that generates ninja files from Lua units
#[derive(Parser)]
#[command(name = "creator")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Bind a global variable to a literal value
  #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", global = true)]
  defines: Vec<String>,

  /// Bind a global variable to macro text
  #[arg(short = 'M', long = "macro", value_name = "KEY=VALUE", global = true)]
  macros: Vec<String>,

  /// Additional directory to search for units
  #[arg(short = 'I', long = "unitpath", value_name = "DIR", global = true)]
  unit_path: Vec<PathBuf>,

  /// Main unit (default: the unit file in the current directory)
  #[arg(short, long, value_name = "ID", global = true)]
  unit: Option<String>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Set up all targets and write a ninja file
  Export {
    /// Targets to make the ninja defaults (default: everything)
    targets: Vec<String>,

    /// Output file (default: $NinjaOut or build.ninja)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Load and set up all targets without writing anything
  Check,

  /// Remove the output files of targets
  Clean {
    /// Targets to clean (default: all)
    targets: Vec<String>,

    /// Also clean what the targets depend on
    #[arg(long)]
    with_deps: bool,
  },

  /// List targets and their commands
  Show {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Run tasks after the tasks they require
  Run {
    #[arg(required = true)]
    tasks: Vec<String>,
  },

  /// Show platform information and the unit search path
  Info,
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .with_target(false)
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let options = SessionOptions {
    defines: cli.defines,
    macros: cli.macros,
    unit_path: cli.unit_path,
    unit: cli.unit,
  };

  let result = match cli.command {
    Commands::Export { targets, output } => cmd::cmd_export(&options, &targets, output),
    Commands::Check => cmd::cmd_check(&options),
    Commands::Clean { targets, with_deps } => cmd::cmd_clean(&options, &targets, with_deps),
    Commands::Show { format } => cmd::cmd_show(&options, format),
    Commands::Run { tasks } => cmd::cmd_run(&options, &tasks),
    Commands::Info => cmd::cmd_info(&options),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
