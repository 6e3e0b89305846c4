//! Explicit, load-once handle to the reference table.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crate::{common::trace_rss_now, err::LoadError};

use super::table::ReferenceTable;

/// Hands out the reference table, parsing the backing file at most once.
///
/// Construct one per process and pass it to whoever annotates.  Concurrent first use
/// blocks all callers until the single load finished; a load failure is kept and
/// returned to every later caller as well.
#[derive(Debug)]
pub struct ReferenceTableProvider {
    path: PathBuf,
    table: OnceLock<Result<Arc<ReferenceTable>, LoadError>>,
}

impl ReferenceTableProvider {
    /// Provider that will load from `path` on first use.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table: OnceLock::new(),
        }
    }

    /// Provider around an already built table, e.g., a synthetic one in tests.
    pub fn with_table(table: ReferenceTable) -> Self {
        Self {
            path: PathBuf::from("<in-memory>"),
            table: OnceLock::from(Ok(Arc::new(table))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the load was already attempted.
    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    /// Return the shared table, loading it if necessary.
    pub fn get(&self) -> Result<Arc<ReferenceTable>, LoadError> {
        self.table
            .get_or_init(|| {
                let result = ReferenceTable::from_path(&self.path).map(Arc::new);
                match &result {
                    Ok(_) => trace_rss_now(),
                    Err(e) => tracing::error!("{}", e),
                }
                result
            })
            .clone()
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cpic::table::test::{entry, PATH_REFERENCE};

    #[test]
    fn loads_lazily() -> Result<(), anyhow::Error> {
        let provider = ReferenceTableProvider::new(PATH_REFERENCE);
        assert!(!provider.is_loaded());

        let table = provider.get()?;
        assert!(provider.is_loaded());
        assert_eq!(table.len(), 21);

        Ok(())
    }

    #[test]
    fn concurrent_first_use_loads_once() -> Result<(), anyhow::Error> {
        let provider = Arc::new(ReferenceTableProvider::new(PATH_REFERENCE));

        let handles = (0..8)
            .map(|_| {
                let provider = provider.clone();
                thread::spawn(move || provider.get())
            })
            .collect::<Vec<_>>();
        let tables = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread panicked"))
            .collect::<Result<Vec<_>, _>>()?;

        for table in &tables {
            assert!(Arc::ptr_eq(table, &tables[0]));
        }
        assert!(Arc::ptr_eq(&provider.get()?, &tables[0]));

        Ok(())
    }

    #[test]
    fn failure_is_sticky() {
        let provider = ReferenceTableProvider::new("tests/data/cpic/does-not-exist.csv");

        let first = provider.get();
        let second = provider.get();
        assert!(matches!(first, Err(LoadError::Unavailable { .. })));
        assert_eq!(first.map(|_| ()), second.map(|_| ()));
    }

    #[test]
    fn with_table_skips_loading() -> Result<(), anyhow::Error> {
        let provider = ReferenceTableProvider::with_table(ReferenceTable::from_entries(vec![
            entry("TPMT", "*1/*1", "Normal Metabolizer", "Normal", ""),
        ]));

        assert!(provider.is_loaded());
        assert_eq!(provider.path(), Path::new("<in-memory>"));
        assert_eq!(provider.get()?.len(), 1);
        assert!(Arc::ptr_eq(&provider.get()?, &provider.get()?));

        Ok(())
    }
}
