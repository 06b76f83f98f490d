use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, info};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use super::loader::{self, ColumnNames, LoadedDataset};
use crate::error::LoadError;

/// Size and modification time of the source when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Fingerprint {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct Cached {
    dataset: Arc<LoadedDataset>,
    fingerprint: Option<Fingerprint>,
}

/// Owns the one loaded copy of a source.
///
/// Create it once at startup and pass it by reference. The first `get`
/// reads the file; every later call, from any thread, returns the same
/// dataset until the handle is invalidated. Readers share the lock;
/// `invalidate` takes it exclusively, so a shared handle can be refreshed
/// while datasets already handed out stay valid.
#[derive(Debug)]
pub struct DatasetHandle {
    source: PathBuf,
    names: ColumnNames,
    cell: RwLock<OnceCell<Cached>>,
}

impl DatasetHandle {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self::with_names(source, ColumnNames::default())
    }

    pub fn with_names(source: impl Into<PathBuf>, names: ColumnNames) -> Self {
        DatasetHandle {
            source: source.into(),
            names,
            cell: RwLock::new(OnceCell::new()),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.read().get().is_some()
    }

    /// The dataset, loading it on first use.
    ///
    /// Concurrent first calls load once; the others wait for that result.
    /// A failed load leaves the handle empty, so a later call retries.
    pub fn get(&self) -> Result<Arc<LoadedDataset>, LoadError> {
        let cell = self.cell.read();
        if let Some(cached) = cell.get() {
            debug!("dataset cache hit for {}", self.source.display());
            return Ok(Arc::clone(&cached.dataset));
        }
        let cached = cell.get_or_try_init(|| {
            // Fingerprint first: a write racing the read shows up as stale.
            let fingerprint = Fingerprint::of(&self.source);
            let dataset = loader::load_with(&self.source, &self.names)?;
            Ok::<_, LoadError>(Cached {
                dataset: Arc::new(dataset),
                fingerprint,
            })
        })?;
        Ok(Arc::clone(&cached.dataset))
    }

    /// Whether the source changed on disk since it was loaded. An unloaded
    /// handle is never stale.
    pub fn is_stale(&self) -> bool {
        match self.cell.read().get() {
            Some(cached) => Fingerprint::of(&self.source) != cached.fingerprint,
            None => false,
        }
    }

    /// Drop the cached dataset; the next `get` reads the source again.
    pub fn invalidate(&self) {
        if self.cell.write().take().is_some() {
            info!("invalidated cached dataset for {}", self.source.display());
        }
    }

    /// Reload if the source changed, then return the current dataset.
    pub fn refresh(&self) -> Result<Arc<LoadedDataset>, LoadError> {
        if self.is_stale() {
            self.invalidate();
        }
        self.get()
    }
}
