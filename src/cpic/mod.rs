//! Annotation of pharmacogenomic findings with the CPIC diplotype-to-phenotype table.

pub mod annotate;
pub mod classify;
pub mod cli;
pub mod conf;
pub mod normalize;
pub mod provider;
pub mod summary;
pub mod table;
