//! Implementation of the `cpic annotate` sub command.

use std::{io::Write, path::Path, time::Instant};

use serde::Serialize;
use thousands::Separable;

use crate::{
    common::{
        self,
        io::{expand_path_list, open_read_maybe_gz, open_write_maybe_gz},
    },
    cpic::{
        annotate::{AnnotatedGene, GeneObservation},
        summary::annotate_cohort,
    },
};

use super::TableArgs;

/// Command line arguments for `cpic annotate` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "annotate extracted genes with CPIC", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub table: TableArgs,
    /// Path(s) to the input TSV files, one per case; `@file` reads a list of paths.
    #[clap(long, required = true)]
    pub path_input: Vec<String>,
    /// Path to the output JSONL file.
    #[clap(long)]
    pub path_output: String,
    /// Optional path to the summary JSON file.
    #[clap(long)]
    pub path_summary: Option<String>,
    /// Set the number of threads to use, defaults to number of cores.
    #[clap(long)]
    pub num_threads: Option<usize>,
}

/// One output line: the annotated gene tagged with its case.
#[derive(Serialize, Debug)]
struct OutputRecord<'a> {
    case: &'a str,
    #[serde(flatten)]
    gene: &'a AnnotatedGene,
}

/// Name of the case in `path`: the file name without `.gz` and extension.
fn case_name(path: &str) -> String {
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let file_name = file_name.trim_end_matches(".gz");
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Read the observations of one case from the TSV file at `path`.
fn read_case(path: &str) -> Result<(String, Vec<GeneObservation>), anyhow::Error> {
    let reader = open_read_maybe_gz(path)
        .map_err(|e| anyhow::anyhow!("could not open input {}: {}", path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);
    let observations = reader
        .deserialize::<GeneObservation>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("could not parse input {}: {}", path, e))?;
    tracing::debug!("read {} observations from {}", observations.len(), path);
    Ok((case_name(path), observations))
}

/// Main entry point for `cpic annotate` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }

    tracing::info!("Loading CPIC table...");
    let annotator = args.table.annotator()?;

    tracing::info!("Reading input files...");
    let cases = expand_path_list(&args.path_input)?
        .iter()
        .map(|path| read_case(path))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("Annotating {} cases...", cases.len().separate_with_commas());
    let before_annotation = Instant::now();
    let (annotated, summary) = annotate_cohort(&annotator, &cases);
    tracing::info!("... done annotating in {:?}", before_annotation.elapsed());

    tracing::info!("Writing output to {}...", &args.path_output);
    {
        let mut writer = open_write_maybe_gz(&args.path_output)
            .map_err(|e| anyhow::anyhow!("could not open output {}: {}", &args.path_output, e))?;
        for case in &annotated {
            for gene in &case.genes {
                serde_json::to_writer(
                    &mut writer,
                    &OutputRecord {
                        case: &case.name,
                        gene,
                    },
                )?;
                writer.write_all(b"\n")?;
            }
        }
        writer.flush()?;
    }

    if let Some(path_summary) = &args.path_summary {
        tracing::info!("Writing summary to {}...", path_summary);
        let mut writer = open_write_maybe_gz(path_summary)
            .map_err(|e| anyhow::anyhow!("could not open summary {}: {}", path_summary, e))?;
        serde_json::to_writer_pretty(&mut writer, &summary)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    tracing::info!(
        "{} genes, {} not in CPIC, {} high risk, match rate {}%",
        summary.cohort.total_genes.separate_with_commas(),
        summary.cohort.cpic_not_found,
        summary.cohort.high_risk_count,
        summary.cohort.match_rate
    );
    common::trace_rss_now();
    tracing::info!(
        "All of `cpic annotate` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
