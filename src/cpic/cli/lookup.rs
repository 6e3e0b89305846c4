//! Implementation of the `cpic lookup` sub command.

use std::io::Write;

use crate::common;

use super::TableArgs;

/// Command line arguments for `cpic lookup` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "look up one diplotype in the CPIC table", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub table: TableArgs,
    /// Gene symbol, e.g., `CYP2C19`.
    #[clap(long)]
    pub gene: String,
    /// Diplotype, e.g., `*1/*2`.
    #[clap(long)]
    pub diplotype: String,
    /// Reported phenotype to compare against, prints the full annotation if given.
    #[clap(long)]
    pub reported_phenotype: Option<String>,
}

/// Write the entry for `args` as JSON to `out`; returns whether it was found.
pub fn lookup(args: &Args, out: &mut dyn Write) -> Result<bool, anyhow::Error> {
    let annotator = args.table.annotator()?;

    if let Some(reported_phenotype) = &args.reported_phenotype {
        let annotated = annotator.annotate(&args.gene, &args.diplotype, reported_phenotype);
        serde_json::to_writer_pretty(&mut *out, &annotated)?;
        writeln!(out)?;
        return Ok(annotated.cpic_phenotype.is_some());
    }

    match annotator.table().lookup(&args.gene, &args.diplotype) {
        Some(entry) => {
            serde_json::to_writer_pretty(&mut *out, entry)?;
            writeln!(out)?;
            Ok(true)
        }
        None => {
            writeln!(
                out,
                "Diplotype {} not found in CPIC table for {}",
                &args.diplotype, &args.gene
            )?;
            Ok(false)
        }
    }
}

/// Main entry point for `cpic lookup` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let stdout = std::io::stdout();
    let found = lookup(args, &mut stdout.lock())?;
    tracing::debug!("found = {}", found);

    Ok(())
}
