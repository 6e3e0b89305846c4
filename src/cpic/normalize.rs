//! Canonicalization of free-text phenotype strings.

use std::sync::OnceLock;

use regex::Regex;

use super::table::PhenotypeCategory;

/// Remove the leading gene symbol (and following whitespace) from `phenotype_full`.
///
/// The gene symbol is matched case-sensitively at the very start of the string and
/// only as a whole token, so that `"CYP2C19 Poor Metabolizer"` becomes
/// `"Poor Metabolizer"` for gene `CYP2C19` while `CYP2C9` leaves it untouched.  If the
/// prefix is absent, the input is returned unchanged.
pub fn simplify_phenotype<'a>(gene: &str, phenotype_full: &'a str) -> &'a str {
    if gene.is_empty() {
        return phenotype_full;
    }
    match phenotype_full.strip_prefix(gene) {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => phenotype_full,
    }
}

/// Fold `text` for comparison: trim, collapse inner whitespace runs, lower-case.
pub fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn category_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(Likely Intermediate|Possible Intermediate|Ultra[- ]?rapid|Ultrarapid|Normal|Intermediate|Poor|Rapid|Reduced|Low|Indeterminate|Unknown)",
        )
        .expect("category pattern is valid")
    })
}

/// Derive the coarse phenotype category from a CPIC-formatted phenotype.
///
/// Used for reference rows whose category cell is blank.  Qualified intermediate
/// phenotypes collapse to `Intermediate`; no hit yields `Unknown`.
pub fn derive_category(phenotype_full: &str) -> PhenotypeCategory {
    let Some(m) = category_regex().find(phenotype_full) else {
        return PhenotypeCategory::Unknown;
    };
    match m.as_str() {
        "Normal" => PhenotypeCategory::Normal,
        "Poor" => PhenotypeCategory::Poor,
        "Rapid" => PhenotypeCategory::Rapid,
        "Reduced" => PhenotypeCategory::Reduced,
        "Low" => PhenotypeCategory::Low,
        "Indeterminate" => PhenotypeCategory::Indeterminate,
        "Unknown" => PhenotypeCategory::Unknown,
        s if s.ends_with("Intermediate") => PhenotypeCategory::Intermediate,
        _ => PhenotypeCategory::Ultrarapid,
    }
}

/// Canonical spelling of a gene symbol: trimmed, upper-cased, with the different
/// spellings of the CYP2C cluster collapsed to `CYP2C_CLUSTER`.
pub fn normalize_gene_symbol(gene: &str) -> String {
    let gene = gene.trim().to_uppercase();
    if gene.contains("CYP2C") && gene.contains("CLUSTER") {
        String::from("CYP2C_CLUSTER")
    } else {
        gene
    }
}

/// Swap the two alleles of `diplotype`, `None` if there is nothing to swap.
pub fn reverse_diplotype(diplotype: &str) -> Option<String> {
    let (lhs, rhs) = diplotype.split_once('/')?;
    if lhs == rhs || rhs.contains('/') {
        None
    } else {
        Some(format!("{}/{}", rhs, lhs))
    }
}
