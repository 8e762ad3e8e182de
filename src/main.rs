use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, LevelFilter};

use fm_compiler::cnf::DEFAULT_MAX_CLAUSES;
use fm_compiler::config::{Config, EngineKind};
use fm_compiler::generator::GeneratorKind;
use fm_compiler::project::Project;

#[derive(Parser)]
#[command(author, version, about = "Feature model DSL compiler")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    /// More logging (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// CNF engine used for constraints
    #[arg(long, value_enum, default_value_t = EngineKind::Builtin, global = true)]
    engine: EngineKind,

    /// Program run by the command engine
    #[arg(long, value_name = "PROGRAM", global = true)]
    engine_command: Option<PathBuf>,

    /// Extra argument for the command engine (repeatable)
    #[arg(long, value_name = "ARG", allow_hyphen_values = true, global = true)]
    engine_arg: Vec<String>,

    /// Timeout of a single normalization, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 10_000, global = true)]
    timeout_ms: u64,

    /// Clause budget of the builtin engine
    #[arg(long, value_name = "INT", default_value_t = DEFAULT_MAX_CLAUSES, global = true)]
    max_clauses: usize,
}

impl EngineArgs {
    fn config(&self) -> Config {
        Config {
            engine: self.engine,
            engine_command: self.engine_command.clone(),
            engine_args: self.engine_arg.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_clauses: self.max_clauses,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model file into the selected outputs
    Compile {
        /// Input model file
        input: PathBuf,

        /// Model name (default: file stem of the input)
        #[arg(long)]
        name: Option<String>,

        /// Output directory for files without an explicit path
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// SPL Conqueror XML output
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        xml: Option<Option<PathBuf>>,

        /// Feature expression output
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        expression: Option<Option<PathBuf>>,

        /// Header output with mandatory features
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        header: Option<Option<PathBuf>>,

        /// Sorted list of all features
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        features: Option<Option<PathBuf>>,
    },

    /// Parse a model file and report its statistics
    Check {
        /// Input model file
        input: PathBuf,
    },

    /// Print the CNF clauses of a boolean expression
    Normalize {
        /// Expression over `&`, `|`, `!` and parentheses
        expression: String,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let normalizer = cli.engine.config().normalizer()?;

    match cli.command {
        Commands::Compile {
            input,
            name,
            out_dir,
            xml,
            expression,
            header,
            features,
        } => {
            let mut project = Project::new(input);
            if let Some(name) = name {
                project = project.with_name(name);
            }

            let selected = [
                (GeneratorKind::SplConqueror, xml),
                (GeneratorKind::FeatureExpression, expression),
                (GeneratorKind::Header, header),
                (GeneratorKind::OpenFeatures, features),
            ];
            for (kind, path) in selected {
                project = match path {
                    Some(Some(path)) => project.with_output(kind, path),
                    // Flag given without a value: default name in the output directory.
                    Some(None) => project.with_output_in(kind, &out_dir),
                    None => project,
                };
            }
            if project.outputs.is_empty() {
                info!("no outputs selected, only checking the model");
            }

            let model = project.compile(&normalizer)?;
            info!(
                "compiled `{}`: {} feature(s), {} constraint clause(s), {} output(s)",
                model.name(),
                model.num_features(),
                model.get_constraints().len(),
                project.outputs.len()
            );
        }

        Commands::Check { input } => {
            let model = Project::new(input).check(&normalizer)?;
            println!("name: {}", model.name());
            println!("features: {}", model.num_features());
            println!("mandatory: {}", model.get_mandatory().len());
            println!("optional: {}", model.get_optional().len());
            println!("alternative groups: {}", model.get_alternatives().len());
            println!("constraint clauses: {}", model.get_constraints().len());
        }

        Commands::Normalize { expression } => {
            let clauses = normalizer
                .normalize(&expression)
                .wrap_err_with(|| format!("cannot normalize `{}`", expression))?;
            for clause in clauses {
                println!("{}", clause);
            }
        }
    }

    Ok(())
}
