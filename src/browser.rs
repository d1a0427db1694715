use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::dataset::Dataset;
use crate::domain::{BrowseConfig, BrowseError};
use crate::exporter;
use crate::session::Session;
use crate::storage::{DiskStore, FileRecord, FileStore, Upload};
use crate::upload::{LoadedFile, UploadSource, UploadTicket, Uploader};

#[derive(Debug)]
pub enum LoadEvent {
    Loaded { name: String, rows: usize, columns: usize },
    Failed(BrowseError),
}

/// Ties the session to the upload flow and the file store: installs finished
/// uploads, releases stored files it no longer needs and writes exports.
pub struct Browser {
    session: Session,
    uploader: Uploader,
    current_file: Option<FileRecord>,
    export_dir: PathBuf,
}

impl Browser {
    pub fn new(config: &BrowseConfig) -> Self {
        let store: Arc<dyn FileStore> = Arc::new(DiskStore::new(config.uploads_dir.clone()));
        Browser::with_store(config, store)
    }

    pub fn with_store(config: &BrowseConfig, store: Arc<dyn FileStore>) -> Self {
        Browser {
            session: Session::new(config.page_size),
            uploader: Uploader::new(store),
            current_file: None,
            export_dir: config.export_dir.clone(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn current_file(&self) -> Option<&FileRecord> {
        self.current_file.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.uploader.is_pending()
    }

    #[instrument(skip(self))]
    pub fn open(&mut self, path: &Path) -> UploadTicket {
        info!("Opening {:?}", path);
        self.uploader.begin(UploadSource::Path(path.to_path_buf()))
    }

    pub fn upload(&mut self, upload: Upload) -> UploadTicket {
        info!("Uploading {}", upload.original_name);
        self.uploader.begin(UploadSource::Upload(upload))
    }

    /// Installs the result of the current upload if it has arrived.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        let result = self.uploader.poll()?;
        Some(self.install(result))
    }

    /// Like [`Browser::poll`] but waits up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadEvent> {
        let result = self.uploader.wait(timeout)?;
        Some(self.install(result))
    }

    fn install(&mut self, result: Result<LoadedFile, BrowseError>) -> LoadEvent {
        match result {
            Ok(LoadedFile { record, parsed }) => {
                let dataset = Dataset::from_parsed(record.original_filename.clone(), parsed);
                let (rows, columns) = (dataset.len(), dataset.fields().len());
                self.session.load(dataset);
                self.release_current();
                let name = record.original_filename.clone();
                self.current_file = Some(record);
                info!("Loaded {name}: {rows} rows, {columns} columns");
                LoadEvent::Loaded {
                    name,
                    rows,
                    columns,
                }
            }
            Err(e) => {
                error!("Loading failed: {e}");
                LoadEvent::Failed(e)
            }
        }
    }

    /// Unloads the dataset, cancels a pending upload and releases the stored file.
    pub fn remove_file(&mut self) {
        self.uploader.cancel();
        self.release_current();
        self.session.clear();
    }

    /// Drops everything the browser holds in the store, pending uploads included.
    pub fn close(&mut self) {
        self.uploader.shutdown();
        self.release_current();
        self.session.clear();
    }

    fn release_current(&mut self) {
        if let Some(record) = self.current_file.take()
            && let Err(e) = self.uploader.store().remove(&record.handle())
        {
            warn!("Could not release {}: {}", record.filename, e);
        }
    }

    /// Writes the filtered view into the export directory.
    /// Returns `None` when no row matches.
    #[instrument(skip(self))]
    pub fn export(&self) -> Result<Option<PathBuf>, BrowseError> {
        let Some(content) = self.session.export()? else {
            info!("Nothing to export");
            return Ok(None);
        };
        let original = self
            .current_file
            .as_ref()
            .map(|r| r.original_filename.as_str())
            .unwrap_or("data");
        exporter::write_export(&self.export_dir, original, &content).map(Some)
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.close();
    }
}
