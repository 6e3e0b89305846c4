//! Configuration of the annotator.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::classify::{Classifier, EquivalenceTable, DEFAULT_NO_DATA_SENTINELS};

fn default_equivalences() -> Vec<[String; 2]> {
    vec![[
        String::from("Normal Function"),
        String::from("Normal Metabolizer"),
    ]]
}

fn default_no_data_sentinels() -> Vec<String> {
    DEFAULT_NO_DATA_SENTINELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Annotator configuration, read from TOML.
///
/// Every field has a default so that a missing file or partial file is fine.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct AnnotatorConf {
    /// Synonymous phenotype pairs yielding `equivalent_match`.
    pub equivalences: Vec<[String; 2]>,
    /// Reported values meaning "nothing was extracted"; the empty string always is.
    pub no_data_sentinels: Vec<String>,
    /// Retry a missing `A/B` diplotype as `B/A`.
    pub match_reversed_diplotype: bool,
    /// Trim and upper-case gene symbols and map `CYP2C` cluster spellings to
    /// `CYP2C_CLUSTER` before lookup.
    pub normalize_gene_symbol: bool,
}

impl Default for AnnotatorConf {
    fn default() -> Self {
        Self {
            equivalences: default_equivalences(),
            no_data_sentinels: default_no_data_sentinels(),
            match_reversed_diplotype: false,
            normalize_gene_symbol: false,
        }
    }
}

impl AnnotatorConf {
    /// Load configuration from the TOML file at `path`.
    pub fn from_path(path: &Path) -> Result<Self, anyhow::Error> {
        let toml_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read config {:?}: {}", path, e))?;
        let conf: Self = toml::from_str(&toml_str)
            .map_err(|e| anyhow::anyhow!("could not parse config {:?}: {}", path, e))?;
        tracing::debug!("conf = {:#?}", &conf);
        Ok(conf)
    }

    /// Load from `path` if given, otherwise use defaults.
    pub fn from_path_or_default(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        path.map(Self::from_path)
            .unwrap_or_else(|| Ok(Self::default()))
    }

    /// Build the classifier described by this configuration.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            EquivalenceTable::new(
                self.equivalences
                    .iter()
                    .map(|[lhs, rhs]| (lhs.as_str(), rhs.as_str())),
            ),
            self.no_data_sentinels.iter(),
        )
    }
}
