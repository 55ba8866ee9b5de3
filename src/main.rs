use clap::{Args, Parser, Subcommand, ValueEnum};
use goat::compiler::{self, DumpOptions, dump};
use goat::{Error, InferConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const CONFIG_FILE: &str = "goat.toml";

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    #[default]
    Human,
    Json,
}

#[derive(Parser)]
#[command(name = "goat")]
#[command(about = "Type inference for goat program trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand that runs inference.
#[derive(Args)]
struct InferArgs {
    /// Configuration file (defaults to ./goat.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of solver steps (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_solver_steps: Option<usize>,

    /// Trace every solver step
    #[arg(long)]
    trace_solver: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Type check a program tree (JSON)
    Check {
        /// The program tree to check
        file: PathBuf,

        #[command(flatten)]
        infer: InferArgs,

        /// Dump constraints and substitutions to stderr, or to a file with --dump-constraints=path
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        dump_constraints: Option<Option<PathBuf>>,

        /// Dump the typed tree to stderr, or to a file with --dump-typed=path
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        dump_typed: Option<Option<PathBuf>>,
    },
    /// Print the program tree with every inferred type
    Infer {
        /// The program tree to annotate
        file: PathBuf,

        #[command(flatten)]
        infer: InferArgs,

        /// Output format (human or json)
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormatArg,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            file,
            infer,
            dump_constraints,
            dump_typed,
        } => {
            let config = match load_config(&infer) {
                Ok(config) => config,
                Err(e) => return report(&e),
            };
            compiler::init_tracing(config.trace_solver);

            let dump_opts = DumpOptions {
                dump_constraints,
                dump_typed,
            };
            if let Err(e) = compiler::check_file_with_dump(&file, &config, &dump_opts) {
                return report(&e);
            }
            println!("Type check passed.");
        }
        Commands::Infer {
            file,
            infer,
            format,
        } => {
            let config = match load_config(&infer) {
                Ok(config) => config,
                Err(e) => return report(&e),
            };
            compiler::init_tracing(config.trace_solver);

            let resolved = match compiler::check_file(&file, &config) {
                Ok(resolved) => resolved,
                Err(e) => return report(&e),
            };
            match format {
                OutputFormatArg::Human => print!("{}", dump::format_tree(&resolved)),
                OutputFormatArg::Json => match serde_json::to_string_pretty(&resolved) {
                    Ok(json) => println!("{}", json),
                    Err(e) => return report(&Error::from(e)),
                },
            }
        }
    }

    ExitCode::SUCCESS
}

/// Build the configuration: file values first, then command-line overrides.
fn load_config(args: &InferArgs) -> Result<InferConfig, Error> {
    let mut config = match &args.config {
        Some(path) => InferConfig::load(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.is_file() {
                InferConfig::load(default_path)?
            } else {
                InferConfig::default()
            }
        }
    };

    if let Some(steps) = args.max_solver_steps {
        config.max_solver_steps = steps;
    }
    if args.trace_solver {
        config.trace_solver = true;
    }
    Ok(config)
}

fn report(error: &Error) -> ExitCode {
    eprintln!("error: {}", error);
    ExitCode::FAILURE
}
