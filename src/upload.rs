//! Background upload: store the file, read it back and parse it.
//!
//! Each request gets a ticket. Only the outcome carrying the latest ticket is
//! handed out; outcomes of superseded requests are dropped and their stored
//! files released.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, info, warn};

use crate::codec::{self, ParsedCsv};
use crate::domain::BrowseError;
use crate::storage::{FileRecord, FileStore, Upload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UploadTicket(u64);

#[derive(Debug)]
pub struct LoadedFile {
    pub record: FileRecord,
    pub parsed: ParsedCsv,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub ticket: UploadTicket,
    pub result: Result<LoadedFile, BrowseError>,
}

pub enum UploadSource {
    Path(PathBuf),
    Upload(Upload),
}

pub struct Uploader {
    store: Arc<dyn FileStore>,
    sender: Sender<UploadOutcome>,
    receiver: Receiver<UploadOutcome>,
    last_ticket: u64,
    current: Option<UploadTicket>,
    workers: Vec<JoinHandle<()>>,
}

impl Uploader {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        let (sender, receiver) = unbounded();
        Uploader {
            store,
            sender,
            receiver,
            last_ticket: 0,
            current: None,
            workers: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// Starts an upload on a worker thread. Supersedes any upload in flight.
    pub fn begin(&mut self, source: UploadSource) -> UploadTicket {
        self.last_ticket += 1;
        let ticket = UploadTicket(self.last_ticket);
        self.current = Some(ticket);

        let store = Arc::clone(&self.store);
        let sender = self.sender.clone();
        self.workers.retain(|w| !w.is_finished());
        let worker = thread::spawn(move || {
            let result = run_upload(store.as_ref(), source);
            // The receiver lives as long as the uploader, a send error means it is gone.
            if sender.send(UploadOutcome { ticket, result }).is_err() {
                debug!("Upload {:?} finished after the uploader was dropped", ticket);
            }
        });
        self.workers.push(worker);
        debug!("Started upload {:?}", ticket);
        ticket
    }

    /// Forgets the upload in flight, its outcome will be discarded.
    pub fn cancel(&mut self) {
        if let Some(ticket) = self.current.take() {
            debug!("Cancelled upload {:?}", ticket);
        }
    }

    /// Cancels the current upload, waits for running workers and releases
    /// every file they stored.
    pub fn shutdown(&mut self) {
        self.cancel();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("An upload worker panicked");
            }
        }
        while let Ok(outcome) = self.receiver.try_recv() {
            self.settle(outcome);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<UploadTicket> {
        self.current
    }

    /// Non-blocking check for the outcome of the current upload.
    pub fn poll(&mut self) -> Option<Result<LoadedFile, BrowseError>> {
        while let Ok(outcome) = self.receiver.try_recv() {
            if let Some(result) = self.settle(outcome) {
                return Some(result);
            }
        }
        None
    }

    /// Blocks up to `timeout` for the outcome of the current upload.
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<LoadedFile, BrowseError>> {
        while self.current.is_some() {
            match self.receiver.recv_timeout(timeout) {
                Ok(outcome) => {
                    if let Some(result) = self.settle(outcome) {
                        return Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
        None
    }

    /// Accepts the outcome of the current ticket, drops stale ones.
    pub fn settle(&mut self, outcome: UploadOutcome) -> Option<Result<LoadedFile, BrowseError>> {
        if self.current == Some(outcome.ticket) {
            self.current = None;
            return Some(outcome.result);
        }
        info!("Discarding stale upload {:?}", outcome.ticket);
        if let Ok(loaded) = outcome.result
            && let Err(e) = self.store.remove(&loaded.record.handle())
        {
            warn!("Could not release stale upload {}: {}", loaded.record.filename, e);
        }
        None
    }
}

fn run_upload(store: &dyn FileStore, source: UploadSource) -> Result<LoadedFile, BrowseError> {
    let upload = match source {
        UploadSource::Path(path) => Upload::from_path(&path)?,
        UploadSource::Upload(upload) => upload,
    };
    let record = store.save(upload)?;
    let handle = record.handle();

    let parsed = store.read(&handle).and_then(|text| codec::parse(&text));
    match parsed {
        Ok(parsed) => Ok(LoadedFile { record, parsed }),
        Err(e) => {
            // Nothing gets installed for a file that does not parse.
            if let Err(remove_err) = store.remove(&handle) {
                warn!("Could not release {}: {}", handle, remove_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskStore;

    fn uploader() -> (tempfile::TempDir, Uploader) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn FileStore> = Arc::new(DiskStore::new(dir.path()));
        (dir, Uploader::new(store))
    }

    fn upload(name: &str, text: &str) -> UploadSource {
        UploadSource::Upload(Upload::new(name, None, text.as_bytes().to_vec()))
    }

    #[test]
    fn current_upload_is_delivered() {
        let (_dir, mut uploader) = uploader();
        uploader.begin(upload("a.csv", "x,y\n1,2\n"));
        assert!(uploader.is_pending());
        let loaded = uploader.wait(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(loaded.parsed.fields, vec!["x", "y"]);
        assert_eq!(loaded.record.original_filename, "a.csv");
        assert!(!uploader.is_pending());
    }

    #[test]
    fn superseded_upload_is_discarded_and_released() {
        let (_dir, mut uploader) = uploader();
        let first = uploader.begin(upload("first.csv", "a\n1\n"));
        let second = uploader.begin(upload("second.csv", "b\n2\n"));
        assert!(first < second);
        assert_eq!(uploader.current(), Some(second));

        let loaded = uploader.wait(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(loaded.record.original_filename, "second.csv");

        // A late outcome of the first ticket must not come through.
        let record = uploader
            .store()
            .save(Upload::new("first.csv", None, b"a\n1\n".to_vec()))
            .unwrap();
        let late = UploadOutcome {
            ticket: first,
            result: Ok(LoadedFile {
                record: record.clone(),
                parsed: ParsedCsv::default(),
            }),
        };
        assert!(uploader.settle(late).is_none());
        assert!(uploader.store().read(&record.handle()).is_err());
    }

    #[test]
    fn cancelled_upload_is_never_delivered() {
        let (_dir, mut uploader) = uploader();
        uploader.begin(upload("a.csv", "x\n1\n"));
        uploader.cancel();
        assert!(!uploader.is_pending());
        assert!(uploader.wait(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn shutdown_releases_uploads_in_flight() {
        let (_dir, mut uploader) = uploader();
        uploader.begin(upload("a.csv", "x\n1\n"));
        uploader.begin(upload("b.csv", "y\n2\n"));
        uploader.shutdown();
        assert!(!uploader.is_pending());
        assert!(uploader.store().records().is_empty());
        assert!(uploader.poll().is_none());
    }

    #[test]
    fn parse_failure_releases_the_stored_file() {
        let (_dir, mut uploader) = uploader();
        uploader.begin(upload("bad.csv", "a,b\n1,2,3\n"));
        let result = uploader.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(BrowseError::ParseFailed(_))));
        assert!(uploader.store().records().is_empty());
    }

    #[test]
    fn rejected_upload_reports_the_reason() {
        let (_dir, mut uploader) = uploader();
        uploader.begin(upload("notes.txt", "a\n"));
        let result = uploader.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(BrowseError::UnknownFileType)));
    }
}
