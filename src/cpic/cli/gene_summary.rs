//! Implementation of the `cpic gene-summary` sub command.

use std::io::Write;

use crate::{common, cpic::table::GeneSummary};

use super::TableArgs;

/// Command line arguments for `cpic gene-summary` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "summarize the CPIC table by gene", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub table: TableArgs,
    /// Restrict to this gene, all genes if not given.
    #[clap(long)]
    pub gene: Option<String>,
}

/// Compute the summaries selected by `args`, sorted by gene.
pub fn gene_summaries(args: &Args) -> Result<Vec<GeneSummary>, anyhow::Error> {
    let (provider, _) = args.table.load()?;
    let table = provider.get()?;

    match &args.gene {
        Some(gene) => table
            .gene_summary(gene)
            .map(|summary| vec![summary])
            .ok_or_else(|| anyhow::anyhow!("gene {} not in CPIC table", gene)),
        None => Ok(table
            .genes()
            .into_iter()
            .filter_map(|gene| table.gene_summary(gene))
            .collect()),
    }
}

/// Main entry point for `cpic gene-summary` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let summaries = gene_summaries(args)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &summaries)?;
    writeln!(out)?;

    Ok(())
}
