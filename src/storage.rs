//! Transient store for uploaded files.
//!
//! An upload is validated (CSV by extension or mime type, at most
//! [`MAX_UPLOAD_SIZE`] bytes), written under a generated unique name and
//! registered with an incrementing id. Its handle is the stored file name.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, instrument, warn};

use crate::domain::{BrowseError, MAX_UPLOAD_SIZE};

pub const CSV_MIME: &str = "text/csv";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(String);

impl FileHandle {
    pub fn new(filename: impl Into<String>) -> Self {
        FileHandle(filename.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: u64,
    pub filename: String,
    pub original_filename: String,
    pub size: u64,
    pub created_at: u64, // Seconds since the unix epoch
}

impl FileRecord {
    pub fn handle(&self) -> FileHandle {
        FileHandle::new(self.filename.clone())
    }
}

pub struct Upload {
    pub original_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(original_name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Upload {
            original_name: original_name.into(),
            mime,
            bytes,
        }
    }

    /// Reads a local file as an upload. Type and size are checked on the
    /// metadata before any content is read.
    pub fn from_path(path: &Path) -> Result<Self, BrowseError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BrowseError::FileNotFound,
            ErrorKind::PermissionDenied => BrowseError::PermissionDenied,
            _ => BrowseError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(BrowseError::NotAFile);
        }
        let original_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = has_csv_extension(&original_name).then(|| CSV_MIME.to_string());
        validate(&original_name, mime.as_deref(), metadata.len())?;

        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => BrowseError::PermissionDenied,
            _ => BrowseError::IoError(e),
        })?;
        Ok(Upload::new(original_name, mime, bytes))
    }
}

/// Storage collaborator of the upload flow.
pub trait FileStore: Send + Sync {
    fn save(&self, upload: Upload) -> Result<FileRecord, BrowseError>;
    fn read(&self, handle: &FileHandle) -> Result<String, BrowseError>;
    fn remove(&self, handle: &FileHandle) -> Result<(), BrowseError>;
    fn records(&self) -> Vec<FileRecord>;
}

fn has_csv_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

pub fn validate(original_name: &str, mime: Option<&str>, size: u64) -> Result<(), BrowseError> {
    if mime != Some(CSV_MIME) && !has_csv_extension(original_name) {
        return Err(BrowseError::UnknownFileType);
    }
    if size > MAX_UPLOAD_SIZE {
        return Err(BrowseError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_SIZE,
        });
    }
    Ok(())
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    sequence: u64,
    records: BTreeMap<u64, FileRecord>,
}

pub struct DiskStore {
    dir: PathBuf,
    registry: Mutex<Registry>,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DiskStore {
            dir: dir.into(),
            registry: Mutex::new(Registry {
                next_id: 1,
                ..Registry::default()
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Handles are bare file names inside the store directory.
    fn path_of(&self, handle: &FileHandle) -> Result<PathBuf, BrowseError> {
        let name = handle.as_str();
        let is_plain = !name.is_empty()
            && Path::new(name).file_name().and_then(|s| s.to_str()) == Some(name);
        if !is_plain {
            return Err(BrowseError::UnknownFileHandle(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileStore for DiskStore {
    #[instrument(skip_all, fields(name = %upload.original_name))]
    fn save(&self, upload: Upload) -> Result<FileRecord, BrowseError> {
        let size = upload.bytes.len() as u64;
        validate(&upload.original_name, upload.mime.as_deref(), size)?;

        fs::create_dir_all(&self.dir)?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();

        let mut registry = self.registry();
        registry.sequence += 1;
        let filename = format!("{}-{}.csv", now.as_millis(), registry.sequence);
        fs::write(self.dir.join(&filename), &upload.bytes)?;

        let record = FileRecord {
            id: registry.next_id,
            filename,
            original_filename: upload.original_name,
            size,
            created_at: now.as_secs(),
        };
        registry.next_id += 1;
        registry.records.insert(record.id, record.clone());
        info!("Stored {} bytes as {}", size, record.filename);
        Ok(record)
    }

    fn read(&self, handle: &FileHandle) -> Result<String, BrowseError> {
        let path = self.path_of(handle)?;
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BrowseError::FileNotFound,
            ErrorKind::PermissionDenied => BrowseError::PermissionDenied,
            _ => BrowseError::IoError(e),
        })?;
        debug!("Read {} bytes from {}", bytes.len(), handle);
        String::from_utf8(bytes)
            .map_err(|_| BrowseError::ParseFailed("File is not valid UTF-8".into()))
    }

    fn remove(&self, handle: &FileHandle) -> Result<(), BrowseError> {
        let path = self.path_of(handle)?;
        self.registry()
            .records
            .retain(|_, record| record.filename != handle.as_str());
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", handle);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Stored file {} was already gone", handle);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn records(&self) -> Vec<FileRecord> {
        self.registry().records.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_upload(name: &str, text: &str) -> Upload {
        Upload::new(name, None, text.as_bytes().to_vec())
    }

    #[test]
    fn save_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("uploads"));

        let record = store.save(csv_upload("people.csv", "name\nBob\n")).unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.original_filename, "people.csv");
        assert_eq!(record.size, 9);
        assert!(record.filename.ends_with(".csv"));
        assert_eq!(store.read(&record.handle()).unwrap(), "name\nBob\n");

        let second = store.save(csv_upload("other.csv", "a\n")).unwrap();
        assert_eq!(second.id, 2);
        assert_ne!(second.filename, record.filename);
        assert_eq!(store.records().len(), 2);

        store.remove(&record.handle()).unwrap();
        assert!(matches!(
            store.read(&record.handle()),
            Err(BrowseError::FileNotFound)
        ));
        assert_eq!(store.records(), vec![second]);
    }

    #[test]
    fn rejects_non_csv_and_oversized_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        assert!(matches!(
            store.save(csv_upload("notes.txt", "a\n")),
            Err(BrowseError::UnknownFileType)
        ));
        let big = Upload::new("big.CSV", None, vec![b'a'; MAX_UPLOAD_SIZE as usize + 1]);
        assert!(matches!(
            store.save(big),
            Err(BrowseError::FileTooLarge { .. })
        ));
        assert!(store.records().is_empty());
    }

    #[test]
    fn mime_type_is_enough() {
        assert!(validate("export", Some(CSV_MIME), 10).is_ok());
        assert!(validate("export", Some("text/plain"), 10).is_err());
    }

    #[test]
    fn handles_cannot_escape_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let handle = FileHandle::new("../secret.csv");
        assert!(matches!(
            store.read(&handle),
            Err(BrowseError::UnknownFileHandle(_))
        ));
    }

    #[test]
    fn upload_from_path_checks_the_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Upload::from_path(&dir.path().join("missing.csv")),
            Err(BrowseError::FileNotFound)
        ));
        assert!(matches!(
            Upload::from_path(dir.path()),
            Err(BrowseError::NotAFile)
        ));
        let path = dir.path().join("data.csv");
        fs::write(&path, "x\n1\n").unwrap();
        let upload = Upload::from_path(&path).unwrap();
        assert_eq!(upload.original_name, "data.csv");
        assert_eq!(upload.mime.as_deref(), Some(CSV_MIME));
        assert_eq!(upload.bytes, b"x\n1\n");
    }
}
