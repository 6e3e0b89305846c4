//! Annotation of extracted gene observations with the CPIC reference.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    classify::{Classifier, MatchStatus},
    conf::AnnotatorConf,
    normalize::{normalize_gene_symbol, reverse_diplotype},
    table::{ReferenceEntry, ReferenceTable},
};

/// One `(gene, genotype, phenotype)` record as extracted from a report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneObservation {
    pub gene: String,
    /// Diplotype as written in the report.
    pub genotype: String,
    /// Free-text metabolizer status, may be empty.
    #[serde(alias = "metabolizer_status", default)]
    pub reported_phenotype: String,
}

/// A gene observation together with the CPIC reference data and match verdict.
///
/// All `cpic_*` options are `None` when the diplotype is not in the table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedGene {
    pub gene: String,
    pub genotype: String,
    pub reported_phenotype: String,
    pub cpic_phenotype: Option<String>,
    pub cpic_phenotype_full: Option<String>,
    pub cpic_phenotype_category: Option<String>,
    pub cpic_activity_score: Option<String>,
    pub cpic_ehr_priority: Option<String>,
    pub cpic_is_high_risk: bool,
    pub cpic_match_status: MatchStatus,
    pub cpic_validation_message: String,
}

/// Annotates observations; cheap to clone and safe to share between threads.
#[derive(Debug, Clone)]
pub struct Annotator {
    table: Arc<ReferenceTable>,
    classifier: Classifier,
    match_reversed_diplotype: bool,
    normalize_gene_symbol: bool,
}

impl Annotator {
    pub fn new(table: Arc<ReferenceTable>, conf: &AnnotatorConf) -> Self {
        Self {
            table,
            classifier: conf.classifier(),
            match_reversed_diplotype: conf.match_reversed_diplotype,
            normalize_gene_symbol: conf.normalize_gene_symbol,
        }
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    /// The `(gene, diplotype)` keys to try after the exact lookup failed, empty unless
    /// a fallback is enabled.
    fn fallback_keys(&self, gene: &str, diplotype: &str) -> Vec<(String, String)> {
        if !self.normalize_gene_symbol && !self.match_reversed_diplotype {
            return Vec::new();
        }

        let original_gene = gene;
        let gene = if self.normalize_gene_symbol {
            normalize_gene_symbol(gene)
        } else {
            gene.to_string()
        };
        let mut diplotypes = vec![diplotype.to_string()];
        if self.match_reversed_diplotype {
            diplotypes.extend(reverse_diplotype(diplotype));
        }

        diplotypes
            .into_iter()
            .map(|candidate| (gene.clone(), candidate))
            .filter(|key| key.0 != original_gene || key.1 != diplotype)
            .collect()
    }

    /// Find the reference entry, applying the configured fallbacks after the exact
    /// lookup failed.
    fn resolve(&self, gene: &str, diplotype: &str) -> Option<&ReferenceEntry> {
        if let Some(entry) = self.table.lookup(gene, diplotype) {
            return Some(entry);
        }

        let result = self
            .fallback_keys(gene, diplotype)
            .iter()
            .find_map(|(gene, diplotype)| self.table.lookup(gene, diplotype));
        if let Some(entry) = result {
            tracing::debug!(
                "resolved {} {} to {} {}",
                gene,
                diplotype,
                &entry.gene,
                &entry.diplotype
            );
        }
        result
    }

    /// Annotate one `(gene, diplotype, reported_phenotype)` triple.
    ///
    /// Never fails: unknown genes and diplotypes yield `not_found`.
    pub fn annotate(&self, gene: &str, diplotype: &str, reported_phenotype: &str) -> AnnotatedGene {
        let Some(entry) = self.resolve(gene, diplotype) else {
            tracing::debug!("{} {} not in CPIC table", gene, diplotype);
            return AnnotatedGene {
                gene: gene.to_string(),
                genotype: diplotype.to_string(),
                reported_phenotype: reported_phenotype.to_string(),
                cpic_phenotype: None,
                cpic_phenotype_full: None,
                cpic_phenotype_category: None,
                cpic_activity_score: None,
                cpic_ehr_priority: None,
                cpic_is_high_risk: false,
                cpic_match_status: MatchStatus::NotFound,
                cpic_validation_message: format!(
                    "Diplotype {} not found in CPIC table for {}",
                    diplotype, gene
                ),
            };
        };

        let verdict = self.classifier.classify(
            reported_phenotype,
            &entry.phenotype_simplified,
            &entry.phenotype_category,
        );
        if matches!(
            verdict.status,
            MatchStatus::Mismatch | MatchStatus::NoData
        ) {
            tracing::debug!("{} {}: {}", gene, diplotype, &verdict.message);
        }

        AnnotatedGene {
            gene: gene.to_string(),
            genotype: diplotype.to_string(),
            reported_phenotype: reported_phenotype.to_string(),
            cpic_phenotype: Some(entry.phenotype_simplified.clone()),
            cpic_phenotype_full: Some(entry.phenotype_full.clone()),
            cpic_phenotype_category: Some(entry.phenotype_category.clone()),
            cpic_activity_score: entry.activity_score.clone(),
            cpic_ehr_priority: Some(entry.ehr_priority.clone()),
            cpic_is_high_risk: entry.is_high_risk(),
            cpic_match_status: verdict.status,
            cpic_validation_message: verdict.message,
        }
    }

    pub fn annotate_observation(&self, observation: &GeneObservation) -> AnnotatedGene {
        self.annotate(
            &observation.gene,
            &observation.genotype,
            &observation.reported_phenotype,
        )
    }

    /// Annotate all observations of one document, keeping their order.
    pub fn annotate_all(&self, observations: &[GeneObservation]) -> Vec<AnnotatedGene> {
        observations
            .iter()
            .map(|observation| self.annotate_observation(observation))
            .collect()
    }
}

/// The clinically actionable subset of `genes`.
pub fn high_risk_genes(genes: &[AnnotatedGene]) -> Vec<&AnnotatedGene> {
    genes.iter().filter(|gene| gene.cpic_is_high_risk).collect()
}
