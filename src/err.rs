//! Error types for the fatal reference table failures.

use std::path::PathBuf;

/// Errors when loading the CPIC reference table.
///
/// All of these are fatal: the annotator refuses to serve requests from an empty or
/// partial index.  Note that an unknown `(gene, diplotype)` pair is not an error but a
/// normal lookup outcome.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("CPIC table {path:?} is unavailable: {message}")]
    Unavailable { path: PathBuf, message: String },
    #[error("CPIC table {path:?} lacks required column(s): {}", .columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },
    #[error("CPIC table {path:?} is malformed at line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: u64,
        message: String,
    },
    #[error("CPIC table {path:?} contains no diplotype rows")]
    Empty { path: PathBuf },
}
