//! Annotation and validation of pharmacogenomic phenotypes against CPIC.

pub mod common;
pub mod cpic;
pub mod err;
