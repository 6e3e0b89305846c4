//! Implementation of the `cpic verify` sub command.

use std::io::Write;

use crate::{common, cpic::table::Inconsistency};

use super::TableArgs;

/// Command line arguments for `cpic verify` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "check the CPIC table for consistency", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub table: TableArgs,
    /// Fail if any inconsistency is found.
    #[clap(long, default_value_t = false)]
    pub strict: bool,
}

/// Run the consistency check and write one JSON line per violation to `out`.
pub fn verify(args: &Args, out: &mut dyn Write) -> Result<Vec<Inconsistency>, anyhow::Error> {
    let (provider, _) = args.table.load()?;
    let table = provider.get()?;

    let inconsistencies = table.check_consistency();
    for inconsistency in &inconsistencies {
        serde_json::to_writer(&mut *out, inconsistency)?;
        writeln!(out)?;
    }
    tracing::info!(
        "checked {} diplotypes, found {} inconsistencies",
        table.len(),
        inconsistencies.len()
    );

    if args.strict && !inconsistencies.is_empty() {
        anyhow::bail!(
            "CPIC table {} has {} inconsistencies",
            &args.table.path_cpic_table,
            inconsistencies.len()
        );
    }
    Ok(inconsistencies)
}

/// Main entry point for `cpic verify` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let stdout = std::io::stdout();
    verify(args, &mut stdout.lock())?;

    Ok(())
}
