//! PGx CPIC worker main executable

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

use pgx_cpic_worker::{common, cpic};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "PGx CPIC annotation",
    long_about = "This tool annotates extracted pharmacogenomic findings with the CPIC reference"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// CPIC related commands.
    Cpic(Cpic),
}

/// Parsing of "cpic *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Cpic {
    /// The sub command to run
    #[command(subcommand)]
    command: CpicCommands,
}

/// Enum supporting the parsing of "cpic *" sub commands.
#[derive(Debug, Subcommand)]
enum CpicCommands {
    Annotate(cpic::cli::annotate::Args),
    Lookup(cpic::cli::lookup::Args),
    GeneSummary(cpic::cli::gene_summary::Args),
    Verify(cpic::cli::verify::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(common::tracing_level(&cli.common))
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Cpic(cpic) => match &cpic.command {
                CpicCommands::Annotate(args) => cpic::cli::annotate::run(&cli.common, args)?,
                CpicCommands::Lookup(args) => cpic::cli::lookup::run(&cli.common, args)?,
                CpicCommands::GeneSummary(args) => {
                    cpic::cli::gene_summary::run(&cli.common, args)?
                }
                CpicCommands::Verify(args) => cpic::cli::verify::run(&cli.common, args)?,
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
