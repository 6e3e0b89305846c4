//! Aggregate quality statistics over annotated genes.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    annotate::{AnnotatedGene, Annotator, GeneObservation},
    classify::MatchStatus,
};

/// Counts over one batch of annotated genes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BatchSummary {
    pub total_genes: usize,
    /// Genes with a reference entry, `no_data` included.
    pub cpic_found: usize,
    pub cpic_not_found: usize,
    pub high_risk_count: usize,
    pub exact_matches: usize,
    pub mismatches: usize,
    /// Exact matches in percent of all genes, one decimal.
    pub match_rate: f64,
}

/// Percentage rounded to one decimal place, `0.0` for an empty batch.
///
/// Ties round half to even, e.g., 1 of 16 gives `6.2`.
fn match_rate(exact_matches: usize, total_genes: usize) -> f64 {
    if total_genes == 0 {
        return 0.0;
    }
    let numerator = 1000 * exact_matches;
    let (quotient, remainder) = (numerator / total_genes, numerator % total_genes);
    let permille = match (2 * remainder).cmp(&total_genes) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient % 2,
    };
    permille as f64 / 10.0
}

impl BatchSummary {
    /// Summarize `genes`; the result does not depend on their order.
    pub fn summarize<'a, I>(genes: I) -> Self
    where
        I: IntoIterator<Item = &'a AnnotatedGene>,
    {
        let mut result = Self::default();
        for gene in genes {
            result.total_genes += 1;
            match gene.cpic_match_status {
                MatchStatus::NotFound => result.cpic_not_found += 1,
                MatchStatus::ExactMatch => result.exact_matches += 1,
                MatchStatus::Mismatch => result.mismatches += 1,
                _ => (),
            }
            if gene.cpic_is_high_risk {
                result.high_risk_count += 1;
            }
        }
        result.cpic_found = result.total_genes - result.cpic_not_found;
        result.match_rate = match_rate(result.exact_matches, result.total_genes);
        result
    }

    /// Combine two summaries, re-deriving the match rate from the summed counts.
    pub fn merge(&self, other: &Self) -> Self {
        let total_genes = self.total_genes + other.total_genes;
        let exact_matches = self.exact_matches + other.exact_matches;
        Self {
            total_genes,
            cpic_found: self.cpic_found + other.cpic_found,
            cpic_not_found: self.cpic_not_found + other.cpic_not_found,
            high_risk_count: self.high_risk_count + other.high_risk_count,
            exact_matches,
            mismatches: self.mismatches + other.mismatches,
            match_rate: match_rate(exact_matches, total_genes),
        }
    }
}

/// Per-case summaries together with their total.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CohortSummary {
    /// Summaries by case, in input order.
    pub cases: IndexMap<String, BatchSummary>,
    pub cohort: BatchSummary,
}

impl CohortSummary {
    pub fn from_cases<I>(cases: I) -> Self
    where
        I: IntoIterator<Item = (String, BatchSummary)>,
    {
        let cases = cases.into_iter().collect::<IndexMap<_, _>>();
        let cohort = cases
            .values()
            .fold(BatchSummary::default(), |acc, summary| acc.merge(summary));
        Self { cases, cohort }
    }
}

/// The annotations of one case.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCase {
    pub name: String,
    pub genes: Vec<AnnotatedGene>,
    pub summary: BatchSummary,
}

/// Annotate and summarize many cases in parallel, keeping the input order.
pub fn annotate_cohort(
    annotator: &Annotator,
    cases: &[(String, Vec<GeneObservation>)],
) -> (Vec<AnnotatedCase>, CohortSummary) {
    let annotated = cases
        .par_iter()
        .map(|(name, observations)| {
            let genes = annotator.annotate_all(observations);
            let summary = BatchSummary::summarize(&genes);
            tracing::debug!("case {}: {:?}", name, &summary);
            AnnotatedCase {
                name: name.clone(),
                genes,
                summary,
            }
        })
        .collect::<Vec<_>>();
    let summary = CohortSummary::from_cases(
        annotated
            .iter()
            .map(|case| (case.name.clone(), case.summary.clone())),
    );
    (annotated, summary)
}
