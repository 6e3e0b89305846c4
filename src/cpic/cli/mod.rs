//! Sub commands of `pgx-cpic-worker cpic`.

use std::path::Path;

use crate::cpic::{annotate::Annotator, conf::AnnotatorConf, provider::ReferenceTableProvider};

pub mod annotate;
pub mod gene_summary;
pub mod lookup;
pub mod verify;

/// Default location of the integrated CPIC table.
pub const DEFAULT_PATH_CPIC_TABLE: &str = "annotations/cpic_diplotype_phenotype_integrated.csv";

/// Arguments shared by all `cpic` sub commands.
#[derive(Debug, Clone, clap::Args)]
pub struct TableArgs {
    /// Path to the integrated CPIC table (CSV, or TSV with `.tsv` in the name).
    #[clap(long, default_value = DEFAULT_PATH_CPIC_TABLE)]
    pub path_cpic_table: String,
    /// Optional path to the annotator configuration TOML file.
    #[clap(long)]
    pub path_conf: Option<String>,
}

impl Default for TableArgs {
    fn default() -> Self {
        Self {
            path_cpic_table: DEFAULT_PATH_CPIC_TABLE.to_string(),
            path_conf: None,
        }
    }
}

impl TableArgs {
    /// Load table and configuration, failing if the table cannot be loaded.
    pub fn load(&self) -> Result<(ReferenceTableProvider, AnnotatorConf), anyhow::Error> {
        let conf = AnnotatorConf::from_path_or_default(self.path_conf.as_deref().map(Path::new))?;
        let provider =
            ReferenceTableProvider::new(shellexpand::tilde(&self.path_cpic_table).into_owned());
        provider.get()?;
        Ok((provider, conf))
    }

    /// Build the annotator from table and configuration.
    pub fn annotator(&self) -> Result<Annotator, anyhow::Error> {
        let (provider, conf) = self.load()?;
        Ok(Annotator::new(provider.get()?, &conf))
    }
}
