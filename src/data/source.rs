//! Data source selection and the per-session load cache.
//!
//! Sources are tried in a fixed priority order:
//!
//! 1. a file supplied by the operator (`--file` / picker)
//! 2. a local cache pair `<dir>/<basename>.csv`, then `<dir>/<basename>.xlsx`
//! 3. the remote default dataset
//!
//! The first provider that yields a table wins. A provider that has nothing to
//! offer (no upload, no local file) or fails to load is skipped; exhausting the
//! chain is fatal (`SourceUnavailable`). `UnsupportedFormat` is fatal at once.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::data::remote::RemoteClient;
use crate::domain::{SalesTable, SessionConfig, SourceKey};
use crate::error::SalesError;
use crate::io::ingest::{RawTable, TableFormat, normalize, read_csv, read_table};

/// One entry in the source chain.
pub trait SourceProvider {
    /// Human-readable name for status messages.
    fn describe(&self) -> String;

    /// Identity of the data this provider would return.
    ///
    /// `Ok(None)` means the provider has nothing to offer and the next one
    /// should be tried.
    fn identity(&self) -> Result<Option<SourceKey>, SalesError>;

    /// Read the raw table.
    fn load(&self) -> Result<RawTable, SalesError>;
}

/// A file handed to the app by the operator: its name plus full contents.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
    format: TableFormat,
}

impl UploadedFile {
    /// Wrap in-memory contents. The name decides the format.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, SalesError> {
        let name = name.into();
        let format = TableFormat::from_name(&name)?;
        Ok(Self { name, bytes, format })
    }

    /// Read a file from disk, rejecting unrecognized extensions before reading.
    pub fn from_path(path: &Path) -> Result<Self, SalesError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let format = TableFormat::from_name(&name)?;
        let bytes = std::fs::read(path).map_err(|source| SalesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { name, bytes, format })
    }

    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.bytes.hash(&mut hasher);
        hasher.finish()
    }
}

impl SourceProvider for UploadedFile {
    fn describe(&self) -> String {
        format!("uploaded file {}", self.name)
    }

    fn identity(&self) -> Result<Option<SourceKey>, SalesError> {
        Ok(Some(SourceKey::Uploaded {
            name: self.name.clone(),
            digest: self.digest(),
        }))
    }

    fn load(&self) -> Result<RawTable, SalesError> {
        read_table(&self.bytes, self.format, &self.name)
    }
}

/// The local cache pair `<dir>/<basename>.csv` / `.xlsx`.
#[derive(Debug, Clone)]
pub struct LocalSource {
    dir: PathBuf,
    basename: String,
}

impl LocalSource {
    pub fn new(dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            basename: basename.into(),
        }
    }

    /// CSV takes precedence over XLSX when both exist.
    fn resolve(&self) -> Option<(PathBuf, TableFormat)> {
        [("csv", TableFormat::Csv), ("xlsx", TableFormat::Xlsx)]
            .into_iter()
            .map(|(ext, format)| (self.dir.join(format!("{}.{ext}", self.basename)), format))
            .find(|(path, _)| path.is_file())
    }
}

impl SourceProvider for LocalSource {
    fn describe(&self) -> String {
        format!("local file {}", self.dir.join(&self.basename).display())
    }

    fn identity(&self) -> Result<Option<SourceKey>, SalesError> {
        Ok(self.resolve().map(|(path, _)| SourceKey::Local(path)))
    }

    fn load(&self) -> Result<RawTable, SalesError> {
        let Some((path, format)) = self.resolve() else {
            return Err(SalesError::Read {
                path: self.dir.join(&self.basename),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "local file disappeared"),
            });
        };
        let bytes = std::fs::read(&path).map_err(|source| SalesError::Read {
            path: path.clone(),
            source,
        })?;
        read_table(&bytes, format, &path.display().to_string())
    }
}

/// The remote default dataset (CSV over HTTP).
#[derive(Debug, Clone)]
pub struct RemoteSource {
    url: String,
    timeout_secs: u64,
}

impl RemoteSource {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout_secs,
        }
    }
}

impl SourceProvider for RemoteSource {
    fn describe(&self) -> String {
        format!("default dataset {}", self.url)
    }

    fn identity(&self) -> Result<Option<SourceKey>, SalesError> {
        Ok(Some(SourceKey::Default(self.url.clone())))
    }

    fn load(&self) -> Result<RawTable, SalesError> {
        let fetch_err = |reason: String| SalesError::Fetch {
            url: self.url.clone(),
            reason,
        };
        let client = RemoteClient::new(&self.url, self.timeout_secs).map_err(fetch_err)?;
        let bytes = client.fetch().map_err(fetch_err)?;
        read_csv(&bytes, client.url())
    }
}

/// Loaded tables keyed by source identity. Never invalidated within a session.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<SourceKey, Rc<SalesTable>>,
}

impl LoadCache {
    pub fn get(&self, key: &SourceKey) -> Option<Rc<SalesTable>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: SourceKey, table: Rc<SalesTable>) {
        self.entries.insert(key, table);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a chain load: the table plus the providers that failed before it.
#[derive(Debug, Clone)]
pub struct ChainLoad {
    pub table: Rc<SalesTable>,
    /// `"<provider>: <error>"` for each provider that offered data but failed.
    /// Providers with nothing to offer are not listed.
    pub skipped: Vec<String>,
}

/// Ordered list of providers; first success wins.
pub struct SourceChain {
    providers: Vec<Box<dyn SourceProvider>>,
}

impl SourceChain {
    pub fn new(providers: Vec<Box<dyn SourceProvider>>) -> Self {
        Self { providers }
    }

    /// Build the standard upload → local → remote chain.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SalesError> {
        let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
        if let Some(path) = &config.upload {
            providers.push(Box::new(UploadedFile::from_path(path)?));
        }
        providers.push(Box::new(LocalSource::new(&config.local_dir, &config.local_basename)));
        providers.push(Box::new(RemoteSource::new(&config.remote_url, config.timeout_secs)));
        Ok(Self::new(providers))
    }

    /// Resolve the canonical table, consulting the cache before loading.
    pub fn load(&self, cache: &mut LoadCache, rng: &mut StdRng) -> Result<ChainLoad, SalesError> {
        let mut attempts = Vec::new();
        let mut skipped = Vec::new();

        for provider in &self.providers {
            let key = match provider.identity() {
                Ok(Some(key)) => key,
                Ok(None) => {
                    attempts.push(format!("{}: not found", provider.describe()));
                    continue;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(source = %provider.describe(), error = %err, "source skipped");
                    let line = format!("{}: {err}", provider.describe());
                    attempts.push(line.clone());
                    skipped.push(line);
                    continue;
                }
            };

            if let Some(table) = cache.get(&key) {
                info!(source = %key, "using cached sales table");
                return Ok(ChainLoad { table, skipped });
            }

            match provider.load() {
                Ok(raw) => {
                    let table = Rc::new(normalize(&raw, key.clone(), rng));
                    let prov = table.provenance();
                    info!(
                        source = %key,
                        rows = table.len(),
                        dropped = prov.rows_dropped,
                        synthesized = prov.synthesized.len(),
                        "loaded sales table"
                    );
                    cache.insert(key, Rc::clone(&table));
                    return Ok(ChainLoad { table, skipped });
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(source = %provider.describe(), error = %err, "source failed to load");
                    let line = format!("{}: {err}", provider.describe());
                    attempts.push(line.clone());
                    skipped.push(line);
                }
            }
        }

        Err(SalesError::SourceUnavailable { attempts })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;

    use super::*;
    use crate::data::synth::session_rng;

    /// Test provider counting how often it is asked to load.
    struct CountingSource {
        key: Option<SourceKey>,
        result: Result<RawTable, String>,
        loads: Rc<Cell<usize>>,
    }

    impl SourceProvider for CountingSource {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        fn identity(&self) -> Result<Option<SourceKey>, SalesError> {
            Ok(self.key.clone())
        }

        fn load(&self) -> Result<RawTable, SalesError> {
            self.loads.set(self.loads.get() + 1);
            self.result.clone().map_err(|reason| SalesError::Fetch {
                url: "memory".to_string(),
                reason,
            })
        }
    }

    fn small_table() -> RawTable {
        RawTable {
            headers: vec!["date".to_string(), "units_sold".to_string()],
            rows: vec![vec!["2024-01-01".to_string(), "5".to_string()]],
        }
    }

    #[test]
    fn first_available_source_wins_and_is_cached() {
        let skipped = Rc::new(Cell::new(0));
        let winner = Rc::new(Cell::new(0));
        let chain = SourceChain::new(vec![
            Box::new(CountingSource {
                key: None,
                result: Ok(small_table()),
                loads: Rc::clone(&skipped),
            }),
            Box::new(CountingSource {
                key: Some(SourceKey::Default("memory".to_string())),
                result: Ok(small_table()),
                loads: Rc::clone(&winner),
            }),
        ]);

        let mut cache = LoadCache::default();
        let mut rng = session_rng(Some(1));
        let first = chain.load(&mut cache, &mut rng).unwrap();
        let second = chain.load(&mut cache, &mut rng).unwrap();

        assert_eq!(skipped.get(), 0);
        assert_eq!(winner.get(), 1);
        assert!(Rc::ptr_eq(&first.table, &second.table));
        assert!(first.skipped.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn exhausted_chain_is_source_unavailable() {
        let chain = SourceChain::new(vec![Box::new(CountingSource {
            key: Some(SourceKey::Default("memory".to_string())),
            result: Err("unreachable".to_string()),
            loads: Rc::new(Cell::new(0)),
        })]);

        let err = chain
            .load(&mut LoadCache::default(), &mut session_rng(Some(1)))
            .unwrap_err();
        match err {
            SalesError::SourceUnavailable { attempts } => {
                assert_eq!(attempts.len(), 1);
                assert!(attempts[0].contains("unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsupported_upload_is_rejected_before_reading() {
        let err = UploadedFile::from_path(Path::new("/definitely/missing/sales.json")).unwrap_err();
        assert!(matches!(err, SalesError::UnsupportedFormat { .. }));
    }

    #[test]
    fn local_csv_preferred_over_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cache.csv"), "date,units_sold\n2024-01-01,5\n").unwrap();
        fs::write(dir.path().join("cache.xlsx"), b"not really a workbook").unwrap();

        let local = LocalSource::new(dir.path(), "cache");
        let key = local.identity().unwrap().unwrap();
        assert_eq!(key, SourceKey::Local(dir.path().join("cache.csv")));
        assert_eq!(local.load().unwrap().rows.len(), 1);

        let missing = LocalSource::new(dir.path(), "other");
        assert!(missing.identity().unwrap().is_none());
    }

    #[test]
    fn upload_identity_depends_on_content() {
        let a = UploadedFile::new("s.csv", b"date\n2024-01-01\n".to_vec()).unwrap();
        let b = UploadedFile::new("s.csv", b"date\n2024-01-02\n".to_vec()).unwrap();
        assert_ne!(a.identity().unwrap(), b.identity().unwrap());
    }

    #[test]
    fn unreadable_upload_falls_through_but_is_reported() {
        let upload = UploadedFile::new("sales.xlsx", b"not really a workbook".to_vec()).unwrap();
        let providers: Vec<Box<dyn SourceProvider>> = vec![
            Box::new(upload),
            Box::new(CountingSource {
                key: Some(SourceKey::Default("memory".to_string())),
                result: Ok(small_table()),
                loads: Rc::new(Cell::new(0)),
            }),
        ];

        let loaded = SourceChain::new(providers)
            .load(&mut LoadCache::default(), &mut session_rng(Some(1)))
            .unwrap();
        assert_eq!(loaded.table.provenance().source, SourceKey::Default("memory".to_string()));
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].starts_with("uploaded file sales.xlsx:"), "{:?}", loaded.skipped);
    }
}
