use anyhow::{Context, Result};
use atomic_gen::codegen::{self, GenError, Generator};
use atomic_gen::config::{GeneratorConfig, Variant};
use atomic_gen::error;
use atomic_gen::registry::DataModel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atomic-gen")]
#[command(about = "Generates the header-only atomic operations library", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the atomic operations header (the default)
    Header {
        #[command(flatten)]
        target: TargetArgs,

        /// Write to this file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate the type sizes header for a target data model
    Sizes {
        #[arg(long, value_enum, default_value_t = ModelArg::Lp64)]
        data_model: ModelArg,

        #[arg(long, default_value_t = GeneratorConfig::default().namespace)]
        namespace: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render every (type, operation, backend) triple and report template defects
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Debug, PartialEq)]
struct TargetArgs {
    #[arg(long, value_enum, default_value_t = GeneratorConfig::default().variant.into())]
    variant: VariantArg,

    /// Prefix of generated identifiers
    #[arg(long, default_value_t = GeneratorConfig::default().namespace)]
    namespace: String,
}

impl TargetArgs {
    fn config(&self) -> Result<GeneratorConfig> {
        Ok(GeneratorConfig::new(self.namespace.clone(), self.variant.into())?)
    }
}

/// Same values clap fills in when no flag is given.
impl Default for TargetArgs {
    fn default() -> Self {
        let config = GeneratorConfig::default();
        Self {
            variant: config.variant.into(),
            namespace: config.namespace,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum VariantArg {
    Full,
    Standard,
}

impl From<Variant> for VariantArg {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Full => VariantArg::Full,
            Variant::StandardOnly => VariantArg::Standard,
        }
    }
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Full => Variant::Full,
            VariantArg::Standard => Variant::StandardOnly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Lp64,
    Llp64,
    Ilp32,
}

impl From<ModelArg> for DataModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Lp64 => DataModel::Lp64,
            ModelArg::Llp64 => DataModel::Llp64,
            ModelArg::Ilp32 => DataModel::Ilp32,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries only generated text.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let command = cli.command.unwrap_or(Commands::Header {
        target: TargetArgs::default(),
        output: None,
    });

    match command {
        Commands::Header { target, output } => {
            let config = target.config()?;
            let text = match codegen::generate_header(&config) {
                Ok(text) => text,
                Err(err) => return report(&err),
            };
            write_output(output, &text)?;
        }
        Commands::Sizes { data_model, namespace, output } => {
            let config = GeneratorConfig::new(namespace, Variant::Full)?;
            let text = match codegen::generate_sizes(&config, data_model.into()) {
                Ok(text) => text,
                Err(err) => return report(&err),
            };
            write_output(output, &text)?;
        }
        Commands::Check { target } => {
            let config = target.config()?;
            let generator = Generator::new(&config)?;
            let errors = generator.check();
            for err in &errors {
                error::display_template_error(err).context("failed to print diagnostic")?;
            }
            if !errors.is_empty() {
                eprintln!("{} template defect(s) found", errors.len());
                return Ok(ExitCode::FAILURE);
            }
            info!(variant = ?config.variant, "all templates render completely");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report(err: &GenError) -> Result<ExitCode> {
    error::display_gen_error(err).context("failed to print diagnostic")?;
    Ok(ExitCode::FAILURE)
}

fn write_output(output: Option<PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = text.len(), "wrote generated header");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("failed to write to standard output")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flag_defaults_match_bare_invocation() {
        let cli = Cli::try_parse_from(["atomic-gen", "header"]).unwrap();
        match cli.command {
            Some(Commands::Header { target, output }) => {
                assert_eq!(target, TargetArgs::default());
                assert!(output.is_none());
            }
            _ => panic!("expected the header command"),
        }
    }

    #[test]
    fn test_sizes_namespace_default() {
        let cli = Cli::try_parse_from(["atomic-gen", "sizes"]).unwrap();
        match cli.command {
            Some(Commands::Sizes { namespace, .. }) => {
                assert_eq!(namespace, GeneratorConfig::default().namespace);
            }
            _ => panic!("expected the sizes command"),
        }
    }

    #[test]
    fn test_variant_flag_round_trips() {
        let cli = Cli::try_parse_from(["atomic-gen", "check", "--variant", "standard"]).unwrap();
        match cli.command {
            Some(Commands::Check { target }) => {
                assert_eq!(target.config().unwrap().variant, Variant::StandardOnly);
            }
            _ => panic!("expected the check command"),
        }
    }
}
