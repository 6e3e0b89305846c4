//! Classification of reported phenotypes against the CPIC phenotype.
//!
//! The verdict is found by walking an explicit, ordered list of rules; the first rule
//! whose predicate holds wins.  `not_found` is decided by the annotator before the
//! classifier is consulted, as it requires the table lookup.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::normalize::fold;

/// Outcome of comparing a reported phenotype with the CPIC reference.
#[derive(
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    /// No reference entry for the `(gene, diplotype)` pair.
    NotFound,
    /// Reference entry exists but nothing was reported to compare with.
    NoData,
    /// Equal after case and whitespace folding.
    ExactMatch,
    /// Textually different but listed as synonyms.
    EquivalentMatch,
    /// The CPIC category occurs as a substring of the reported phenotype.
    CategoryMatch,
    /// None of the above; needs clinical review.
    Mismatch,
}

/// A verdict together with its human-readable explanation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: MatchStatus,
    pub message: String,
}

/// The inputs of one classification, raw and folded.
#[derive(Debug)]
pub struct Comparison<'a> {
    pub reported: &'a str,
    pub cpic_phenotype: &'a str,
    pub cpic_category: &'a str,
    reported_folded: String,
    cpic_folded: String,
    category_folded: String,
}

impl<'a> Comparison<'a> {
    pub fn new(reported: &'a str, cpic_phenotype: &'a str, cpic_category: &'a str) -> Self {
        Self {
            reported,
            cpic_phenotype,
            cpic_category,
            reported_folded: fold(reported),
            cpic_folded: fold(cpic_phenotype),
            category_folded: fold(cpic_category),
        }
    }
}

/// Synonymous phenotype spellings, e.g., "Normal Function" and "Normal Metabolizer".
///
/// Pairs are unordered and compared after folding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquivalenceTable {
    pairs: HashSet<(String, String)>,
}

impl EquivalenceTable {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(lhs, rhs)| Self::key(&fold(lhs.as_ref()), &fold(rhs.as_ref())))
            .collect();
        Self { pairs }
    }

    fn key(lhs: &str, rhs: &str) -> (String, String) {
        if lhs <= rhs {
            (lhs.to_string(), rhs.to_string())
        } else {
            (rhs.to_string(), lhs.to_string())
        }
    }

    /// Whether the two folded phenotypes are listed as synonyms.
    pub fn contains(&self, lhs: &str, rhs: &str) -> bool {
        self.pairs.contains(&Self::key(lhs, rhs))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// One entry of the ordered rule list.
pub struct Rule {
    pub status: MatchStatus,
    pub applies: fn(&Classifier, &Comparison) -> bool,
    pub message: fn(&Comparison) -> String,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("status", &self.status).finish()
    }
}

/// The classification rules in order of precedence.
pub const RULES: &[Rule] = &[
    Rule {
        status: MatchStatus::NoData,
        applies: |classifier, cmp| classifier.is_no_data(&cmp.reported_folded),
        message: |cmp| {
            format!(
                "No reported phenotype to compare against CPIC \"{}\"",
                cmp.cpic_phenotype
            )
        },
    },
    Rule {
        status: MatchStatus::ExactMatch,
        applies: |_, cmp| cmp.reported_folded == cmp.cpic_folded,
        message: |_| String::from("Exact match with CPIC standard"),
    },
    Rule {
        status: MatchStatus::EquivalentMatch,
        applies: |classifier, cmp| {
            classifier
                .equivalences
                .contains(&cmp.reported_folded, &cmp.cpic_folded)
        },
        message: |cmp| {
            format!(
                "Reported \"{}\" is equivalent to CPIC \"{}\"",
                cmp.reported, cmp.cpic_phenotype
            )
        },
    },
    Rule {
        status: MatchStatus::CategoryMatch,
        applies: |_, cmp| {
            !cmp.category_folded.is_empty()
                && cmp.reported_folded.contains(&cmp.category_folded)
        },
        message: |cmp| {
            format!(
                "Category matches ({}) but format differs",
                cmp.cpic_category
            )
        },
    },
    Rule {
        status: MatchStatus::Mismatch,
        applies: |_, _| true,
        message: |cmp| {
            format!(
                "Reported \"{}\" does not match CPIC \"{}\"",
                cmp.reported, cmp.cpic_phenotype
            )
        },
    },
];

/// Default reported values that mean "nothing was extracted".
pub const DEFAULT_NO_DATA_SENTINELS: &[&str] = &["not found", "none", "n/a", "na", "-"];

/// Stateless phenotype classifier, configured with synonyms and sentinels.
#[derive(Debug, Clone)]
pub struct Classifier {
    equivalences: EquivalenceTable,
    no_data_sentinels: HashSet<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            EquivalenceTable::new([("Normal Function", "Normal Metabolizer")]),
            DEFAULT_NO_DATA_SENTINELS.iter().copied(),
        )
    }
}

impl Classifier {
    pub fn new<I, S>(equivalences: EquivalenceTable, no_data_sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            equivalences,
            no_data_sentinels: no_data_sentinels
                .into_iter()
                .map(|s| fold(s.as_ref()))
                .collect(),
        }
    }

    /// The empty string is always "no data".
    fn is_no_data(&self, reported_folded: &str) -> bool {
        reported_folded.is_empty() || self.no_data_sentinels.contains(reported_folded)
    }

    /// Classify `reported` against the CPIC simplified phenotype and category.
    pub fn classify(&self, reported: &str, cpic_phenotype: &str, cpic_category: &str) -> Verdict {
        let cmp = Comparison::new(reported, cpic_phenotype, cpic_category);
        let rule = RULES
            .iter()
            .find(|rule| (rule.applies)(self, &cmp))
            .unwrap_or(&RULES[RULES.len() - 1]);
        Verdict {
            status: rule.status,
            message: (rule.message)(&cmp),
        }
    }
}
