//! Loading and indexing of the integrated CPIC diplotype-to-phenotype table.

use std::{collections::HashMap, io::Read, path::Path, time::Instant};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thousands::Separable;

use crate::{
    common::io::open_read_maybe_gz,
    cpic::normalize::{derive_category, simplify_phenotype},
    err::LoadError,
};

/// EHR priority notation of high-risk diplotypes.
pub const HIGH_RISK_PRIORITY: &str = "Abnormal/Priority/High Risk";
/// EHR priority notation of normal diplotypes.
pub const NORMAL_PRIORITY: &str = "Normal/Routine/Low Risk";

/// Columns that the integrated table must provide.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Gene",
    "Diplotype",
    "Phenotype_CPIC_Format",
    "Phenotype_Simplified",
    "Phenotype_Category",
    "Activity_Score",
    "EHR_Priority",
];

/// Coarse phenotype buckets.
#[derive(
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    Default,
    strum::EnumString,
    strum::EnumIter,
    strum::Display,
)]
pub enum PhenotypeCategory {
    Normal,
    Intermediate,
    Poor,
    Rapid,
    Ultrarapid,
    Reduced,
    Low,
    Indeterminate,
    #[default]
    Unknown,
}

/// Parsed EHR priority notation.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EhrPriority {
    /// "Normal/Routine/Low Risk"
    Normal,
    /// "Abnormal/Priority/High Risk"
    Abnormal,
    /// Anything else, e.g., empty or "none".
    Unknown,
}

impl EhrPriority {
    /// Interpret the notation from the `EHR_Priority` column.
    ///
    /// Only the exact vocabulary strings are recognized.
    pub fn from_notation(notation: &str) -> Self {
        match notation.trim() {
            HIGH_RISK_PRIORITY => EhrPriority::Abnormal,
            NORMAL_PRIORITY => EhrPriority::Normal,
            _ => EhrPriority::Unknown,
        }
    }
}

/// One row of the reference table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    /// Gene symbol, e.g., `"CYP2C19"`.
    pub gene: String,
    /// Diplotype in allele notation, e.g., `"*1/*2"`.
    pub diplotype: String,
    /// Phenotype with gene prefix, e.g., `"CYP2C19 Intermediate Metabolizer"`.
    pub phenotype_full: String,
    /// Phenotype without gene prefix.
    pub phenotype_simplified: String,
    /// Coarse category, e.g., `"Intermediate"`.
    pub phenotype_category: String,
    /// Activity score as text, if any.
    pub activity_score: Option<String>,
    /// EHR priority notation.
    pub ehr_priority: String,
}

impl ReferenceEntry {
    pub fn priority(&self) -> EhrPriority {
        EhrPriority::from_notation(&self.ehr_priority)
    }

    /// Whether the EHR priority flags this diplotype as clinically actionable.
    pub fn is_high_risk(&self) -> bool {
        self.priority() == EhrPriority::Abnormal
    }
}

/// Raw row as found in the CSV file.
#[derive(Deserialize, Debug)]
struct RawRow {
    #[serde(rename = "Gene")]
    gene: String,
    #[serde(rename = "Diplotype")]
    diplotype: String,
    #[serde(rename = "Phenotype_CPIC_Format")]
    phenotype_full: String,
    #[serde(rename = "Phenotype_Simplified")]
    phenotype_simplified: String,
    #[serde(rename = "Phenotype_Category")]
    phenotype_category: String,
    #[serde(rename = "Activity_Score")]
    activity_score: String,
    #[serde(rename = "EHR_Priority")]
    ehr_priority: String,
}

/// Cell values that denote a missing activity score.
const MISSING_SCORE: &[&str] = &["", "nan", "na", "n/a", "none", "null"];

/// Convert the activity score cell to text-or-absent.
///
/// Whatever the backing table stores, the result is never numeric: values are
/// carried as their (trimmed) textual representation and placeholders become `None`.
pub fn coerce_activity_score(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_SCORE.contains(&trimmed.to_lowercase().as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl TryFrom<RawRow> for ReferenceEntry {
    type Error = String;

    fn try_from(row: RawRow) -> Result<Self, Self::Error> {
        if row.gene.trim().is_empty() {
            return Err("empty Gene cell".to_string());
        }
        if row.diplotype.trim().is_empty() {
            return Err(format!("empty Diplotype cell for gene {}", row.gene));
        }

        let phenotype_simplified = if row.phenotype_simplified.trim().is_empty() {
            simplify_phenotype(&row.gene, &row.phenotype_full).to_string()
        } else {
            row.phenotype_simplified
        };
        let phenotype_category = if row.phenotype_category.trim().is_empty() {
            derive_category(&row.phenotype_full).to_string()
        } else {
            row.phenotype_category
        };

        Ok(ReferenceEntry {
            activity_score: coerce_activity_score(&row.activity_score),
            gene: row.gene,
            diplotype: row.diplotype,
            phenotype_full: row.phenotype_full,
            phenotype_simplified,
            phenotype_category,
            ehr_priority: row.ehr_priority,
        })
    }
}

/// Per-gene statistics over the reference table.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneSummary {
    pub gene: String,
    pub total_diplotypes: usize,
    /// Number of diplotypes by category, most frequent first.
    pub phenotype_categories: IndexMap<String, usize>,
    pub high_risk_count: usize,
    pub normal_count: usize,
    pub indeterminate_count: usize,
}

/// A reference row that violates a table invariant.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Inconsistency {
    pub gene: String,
    pub diplotype: String,
    pub kind: InconsistencyKind,
}

/// Kind of an `Inconsistency`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum InconsistencyKind {
    /// Stripping the gene prefix from the full phenotype does not yield the simplified one.
    SimplifiedPhenotype { expected: String, actual: String },
    /// Category is outside of the fixed vocabulary.
    UnknownCategory { category: String },
}

/// The in-memory index of the reference table.
///
/// Keyed by gene and then diplotype, both compared as exact, case-sensitive strings.
/// Immutable once built.
#[derive(Debug, Default, Clone)]
pub struct ReferenceTable {
    by_gene: HashMap<String, HashMap<String, ReferenceEntry>>,
    len: usize,
}

impl ReferenceTable {
    /// Build a table from entries; for duplicate `(gene, diplotype)` pairs the last wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ReferenceEntry>,
    {
        let mut result = Self::default();
        for entry in entries {
            result.insert(entry);
        }
        result
    }

    /// Insert `entry`, returning the replaced entry, if any.
    fn insert(&mut self, entry: ReferenceEntry) -> Option<ReferenceEntry> {
        let previous = self
            .by_gene
            .entry(entry.gene.clone())
            .or_default()
            .insert(entry.diplotype.clone(), entry);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Load the table from the CSV (or TSV, with `.tsv` in the name) file at `path`.
    #[tracing::instrument]
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        tracing::debug!("loading CPIC table from {:?}...", path);
        let reader = open_read_maybe_gz(path).map_err(|e| LoadError::Unavailable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let delimiter = if path.to_string_lossy().contains(".tsv") {
            b'\t'
        } else {
            b','
        };
        Self::from_reader(reader, delimiter, path)
    }

    /// Load the table from `reader`; `origin` is only used for messages.
    pub fn from_reader<R: Read>(
        reader: R,
        delimiter: u8,
        origin: &Path,
    ) -> Result<Self, LoadError> {
        let before_loading = Instant::now();
        let malformed = |line: u64, message: String| LoadError::Malformed {
            path: origin.to_path_buf(),
            line,
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers().map_err(|e| malformed(1, e.to_string()))?;
        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|header| header == **column))
            .map(|column| column.to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns {
                path: origin.to_path_buf(),
                columns: missing,
            });
        }

        let mut result = Self::default();
        let mut duplicates = 0usize;
        for (i, row) in reader.deserialize::<RawRow>().enumerate() {
            // Header is line 1, so data rows start at line 2.
            let fallback_line = i as u64 + 2;
            let row = row.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                malformed(line, e.to_string())
            })?;
            let entry = ReferenceEntry::try_from(row).map_err(|e| malformed(fallback_line, e))?;
            if let Some(previous) = result.insert(entry) {
                tracing::warn!(
                    "duplicate CPIC row for {} {} at line {}, keeping the last one",
                    &previous.gene,
                    &previous.diplotype,
                    fallback_line
                );
                duplicates += 1;
            }
        }

        if result.is_empty() {
            return Err(LoadError::Empty {
                path: origin.to_path_buf(),
            });
        }

        tracing::info!(
            "loaded {} diplotypes for {} genes ({} duplicates) in {:?}",
            result.len().separate_with_commas(),
            result.by_gene.len(),
            duplicates,
            before_loading.elapsed()
        );

        Ok(result)
    }

    /// Look up the entry for `(gene, diplotype)`.
    pub fn lookup(&self, gene: &str, diplotype: &str) -> Option<&ReferenceEntry> {
        self.by_gene
            .get(gene)
            .and_then(|diplotypes| diplotypes.get(diplotype))
    }

    /// Number of distinct `(gene, diplotype)` pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sorted gene symbols.
    pub fn genes(&self) -> Vec<&str> {
        self.by_gene.keys().map(String::as_str).sorted().collect()
    }

    /// All entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.by_gene.values().flat_map(|diplotypes| diplotypes.values())
    }

    /// Entries flagged as high risk, optionally restricted to `gene`.
    pub fn high_risk_diplotypes(&self, gene: Option<&str>) -> Vec<&ReferenceEntry> {
        self.entries()
            .filter(|entry| gene.map_or(true, |gene| entry.gene == gene))
            .filter(|entry| entry.is_high_risk())
            .sorted_by(|a, b| (&a.gene, &a.diplotype).cmp(&(&b.gene, &b.diplotype)))
            .collect()
    }

    /// Summary statistics for `gene`, `None` if the gene has no rows.
    pub fn gene_summary(&self, gene: &str) -> Option<GeneSummary> {
        let diplotypes = self.by_gene.get(gene)?;

        let phenotype_categories = diplotypes
            .values()
            .map(|entry| entry.phenotype_category.clone())
            .counts()
            .into_iter()
            .sorted_by(|(a_cat, a_cnt), (b_cat, b_cnt)| {
                b_cnt.cmp(a_cnt).then_with(|| a_cat.cmp(b_cat))
            })
            .collect::<IndexMap<_, _>>();
        let count_priority = |priority: EhrPriority| {
            diplotypes
                .values()
                .filter(|entry| entry.priority() == priority)
                .count()
        };

        Some(GeneSummary {
            gene: gene.to_string(),
            total_diplotypes: diplotypes.len(),
            phenotype_categories,
            high_risk_count: count_priority(EhrPriority::Abnormal),
            normal_count: count_priority(EhrPriority::Normal),
            indeterminate_count: count_priority(EhrPriority::Unknown),
        })
    }

    /// Rows violating the simplified-phenotype round trip or the category vocabulary.
    pub fn check_consistency(&self) -> Vec<Inconsistency> {
        let categories = PhenotypeCategory::iter()
            .map(|category| category.to_string())
            .collect::<Vec<_>>();

        let mut result = Vec::new();
        for entry in self
            .entries()
            .sorted_by(|a, b| (&a.gene, &a.diplotype).cmp(&(&b.gene, &b.diplotype)))
        {
            let expected = simplify_phenotype(&entry.gene, &entry.phenotype_full);
            if expected != entry.phenotype_simplified {
                result.push(Inconsistency {
                    gene: entry.gene.clone(),
                    diplotype: entry.diplotype.clone(),
                    kind: InconsistencyKind::SimplifiedPhenotype {
                        expected: expected.to_string(),
                        actual: entry.phenotype_simplified.clone(),
                    },
                });
            }
            if !categories.contains(&entry.phenotype_category) {
                result.push(Inconsistency {
                    gene: entry.gene.clone(),
                    diplotype: entry.diplotype.clone(),
                    kind: InconsistencyKind::UnknownCategory {
                        category: entry.phenotype_category.clone(),
                    },
                });
            }
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Path to the synthetic reference table used throughout the tests.
    pub const PATH_REFERENCE: &str = "tests/data/cpic/reference.csv";

    /// Shorthand for building entries in tests.
    pub fn entry(
        gene: &str,
        diplotype: &str,
        simplified: &str,
        category: &str,
        ehr_priority: &str,
    ) -> ReferenceEntry {
        ReferenceEntry {
            gene: gene.to_string(),
            diplotype: diplotype.to_string(),
            phenotype_full: format!("{} {}", gene, simplified),
            phenotype_simplified: simplified.to_string(),
            phenotype_category: category.to_string(),
            activity_score: None,
            ehr_priority: ehr_priority.to_string(),
        }
    }

    pub fn load_reference() -> ReferenceTable {
        ReferenceTable::from_path(Path::new(PATH_REFERENCE)).expect("fixture loads")
    }

    #[test]
    fn load_reference_table() {
        let table = load_reference();

        assert_eq!(table.len(), 21);
        assert_eq!(
            table.genes(),
            vec![
                "CYP2B6", "CYP2C19", "CYP2C9", "CYP2D6", "CYP4F2", "DPYD", "NUDT15", "SLCO1B1",
                "TPMT", "UGT1A1", "VKORC1"
            ]
        );
        assert_eq!(
            table.lookup("CYP2C19", "*1/*2"),
            Some(&ReferenceEntry {
                gene: String::from("CYP2C19"),
                diplotype: String::from("*1/*2"),
                phenotype_full: String::from("CYP2C19 Intermediate Metabolizer"),
                phenotype_simplified: String::from("Intermediate Metabolizer"),
                phenotype_category: String::from("Intermediate"),
                activity_score: None,
                ehr_priority: String::from(HIGH_RISK_PRIORITY),
            })
        );
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let table = load_reference();

        assert!(table.lookup("CYP2C19", "*1/*2").is_some());
        assert!(table.lookup("cyp2c19", "*1/*2").is_none());
        assert!(table.lookup("CYP2C19", "*2/*1").is_none());
        assert!(table.lookup("CYP2C19", " *1/*2").is_none());
        assert!(table.lookup("CYP2B6", "*1/*99").is_none());
        assert!(table.lookup("", "").is_none());
        assert!(table
            .lookup("VKORC1", "Reference/rs9923231 (-1639G>A)")
            .is_some());
    }

    #[test]
    fn activity_score_is_text_or_absent() {
        let table = load_reference();

        let score = |gene: &str, diplotype: &str| {
            table
                .lookup(gene, diplotype)
                .and_then(|entry| entry.activity_score.clone())
        };
        assert_eq!(score("CYP2C9", "*1/*1"), Some(String::from("2.0")));
        assert_eq!(score("CYP2D6", "*20/*41"), Some(String::from("1.25")));
        assert_eq!(score("DPYD", "*1/*1"), Some(String::from("2")));
        assert_eq!(score("CYP4F2", "*1/*3"), None);
        assert_eq!(score("CYP2C19", "*1/*2"), None);
    }

    #[rstest::rstest]
    #[case("1.5", Some("1.5"))]
    #[case(" 0 ", Some("0"))]
    #[case("≥3.0", Some("≥3.0"))]
    #[case("", None)]
    #[case("NaN", None)]
    #[case("n/a", None)]
    #[case("None", None)]
    fn coerce_activity_score_cases(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(coerce_activity_score(raw), expected.map(String::from));
    }

    #[test]
    fn blank_cells_are_derived() {
        let table = load_reference();
        let entry = table.lookup("UGT1A1", "*1/*28").expect("in fixture");

        assert_eq!(entry.phenotype_simplified, "Intermediate Metabolizer");
        assert_eq!(entry.phenotype_category, "Intermediate");
    }

    #[rstest::rstest]
    #[case(HIGH_RISK_PRIORITY, EhrPriority::Abnormal)]
    #[case(NORMAL_PRIORITY, EhrPriority::Normal)]
    #[case("none", EhrPriority::Unknown)]
    #[case("", EhrPriority::Unknown)]
    #[case("abnormal/priority/high risk", EhrPriority::Unknown)]
    fn ehr_priority_from_notation(#[case] notation: &str, #[case] expected: EhrPriority) {
        assert_eq!(EhrPriority::from_notation(notation), expected);
    }

    #[test]
    #[tracing_test::traced_test]
    fn duplicates_keep_last_row() {
        let table =
            ReferenceTable::from_path(Path::new("tests/data/cpic/reference_duplicates.csv"))
                .expect("fixture loads");

        assert_eq!(table.len(), 2);
        assert_eq!(
            table
                .lookup("CYP2C19", "*1/*2")
                .map(|entry| entry.phenotype_simplified.as_str()),
            Some("Poor Metabolizer")
        );
        assert!(logs_contain("duplicate CPIC row for CYP2C19 *1/*2"));
    }

    #[test]
    fn from_entries_keeps_last() {
        let table = ReferenceTable::from_entries(vec![
            entry("TPMT", "*1/*1", "Normal Metabolizer", "Normal", NORMAL_PRIORITY),
            entry("TPMT", "*1/*1", "Poor Metabolizer", "Poor", HIGH_RISK_PRIORITY),
        ]);

        assert_eq!(table.len(), 1);
        assert!(table
            .lookup("TPMT", "*1/*1")
            .expect("inserted")
            .is_high_risk());
    }

    #[test]
    fn missing_file_is_unavailable() {
        let result = ReferenceTable::from_path(Path::new("tests/data/cpic/does-not-exist.csv"));

        assert!(matches!(result, Err(LoadError::Unavailable { .. })));
    }

    #[test]
    fn missing_column_is_reported() {
        let result =
            ReferenceTable::from_path(Path::new("tests/data/cpic/reference_missing_column.csv"));

        assert_eq!(
            result.map(|table| table.len()),
            Err(LoadError::MissingColumns {
                path: PathBuf::from("tests/data/cpic/reference_missing_column.csv"),
                columns: vec![String::from("EHR_Priority")],
            })
        );
    }

    #[test]
    fn ragged_row_is_malformed() {
        let result =
            ReferenceTable::from_path(Path::new("tests/data/cpic/reference_malformed.csv"));

        match result {
            Err(LoadError::Malformed { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other.map(|table| table.len())),
        }
    }

    #[test]
    fn padded_headers_are_accepted() -> Result<(), anyhow::Error> {
        let data = format!(
            "{}\nTPMT,*1/*1,TPMT Normal Metabolizer,Normal Metabolizer,Normal,,{}\n",
            REQUIRED_COLUMNS
                .iter()
                .map(|column| format!(" {} ", column))
                .join(","),
            NORMAL_PRIORITY
        );
        let table = ReferenceTable::from_reader(data.as_bytes(), b',', Path::new("inline"))?;

        assert_eq!(table.len(), 1);
        assert_eq!(
            table
                .lookup("TPMT", "*1/*1")
                .map(|entry| entry.phenotype_simplified.as_str()),
            Some("Normal Metabolizer")
        );

        Ok(())
    }

    #[test]
    fn header_only_is_empty() {
        let data = REQUIRED_COLUMNS.join(",");
        let result = ReferenceTable::from_reader(data.as_bytes(), b',', Path::new("inline"));

        assert_eq!(
            result.map(|table| table.len()),
            Err(LoadError::Empty {
                path: PathBuf::from("inline")
            })
        );
    }

    #[test]
    fn high_risk_diplotypes_sorted() {
        let table = load_reference();

        let diplotypes = table
            .high_risk_diplotypes(Some("CYP2C19"))
            .into_iter()
            .map(|entry| entry.diplotype.as_str())
            .collect::<Vec<_>>();
        assert_eq!(diplotypes, vec!["*1/*2", "*17/*17", "*2/*2"]);
        assert_eq!(table.high_risk_diplotypes(None).len(), 11);
        assert!(table.high_risk_diplotypes(Some("UNKNOWN")).is_empty());
    }

    #[test]
    fn gene_summary_counts() {
        let table = load_reference();

        let summary = table.gene_summary("CYP2C19").expect("gene in fixture");
        assert_eq!(summary.total_diplotypes, 4);
        assert_eq!(summary.high_risk_count, 3);
        assert_eq!(summary.normal_count, 1);
        assert_eq!(summary.indeterminate_count, 0);
        assert_eq!(
            summary.phenotype_categories.into_iter().collect::<Vec<_>>(),
            vec![
                (String::from("Intermediate"), 1),
                (String::from("Normal"), 1),
                (String::from("Poor"), 1),
                (String::from("Ultrarapid"), 1),
            ]
        );

        let summary = table.gene_summary("CYP4F2").expect("gene in fixture");
        assert_eq!(summary.indeterminate_count, 1);
        assert!(table.gene_summary("CYP3A5").is_none());
    }

    #[test]
    fn fixture_is_consistent() {
        let table = load_reference();

        assert_eq!(table.check_consistency(), vec![]);
    }

    #[test]
    fn consistency_violations() {
        let mut bad = entry("CYP2D6", "*1/*1", "Normal Metabolizer", "Normalish", NORMAL_PRIORITY);
        bad.phenotype_simplified = String::from("CYP2D6 Normal Metabolizer");
        let table = ReferenceTable::from_entries(vec![bad]);

        assert_eq!(
            table.check_consistency(),
            vec![
                Inconsistency {
                    gene: String::from("CYP2D6"),
                    diplotype: String::from("*1/*1"),
                    kind: InconsistencyKind::SimplifiedPhenotype {
                        expected: String::from("Normal Metabolizer"),
                        actual: String::from("CYP2D6 Normal Metabolizer"),
                    },
                },
                Inconsistency {
                    gene: String::from("CYP2D6"),
                    diplotype: String::from("*1/*1"),
                    kind: InconsistencyKind::UnknownCategory {
                        category: String::from("Normalish"),
                    },
                },
            ]
        );
    }
}
