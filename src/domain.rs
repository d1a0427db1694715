use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

/// Largest file accepted by the upload boundary (10 MB).
pub const MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Page sizes cycled through by the page size shortcut.
pub const PAGE_SIZE_CHOICES: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug)]
pub enum BrowseError {
    IoError(Error),
    CsvError(csv::Error),
    ParseFailed(String),
    FileTooLarge { size: u64, limit: u64 },
    UnknownFileHandle(String),
    InvalidPath(String),
    FileNotFound,
    PermissionDenied,
    NotAFile,
    UnknownFileType,
}

impl fmt::Display for BrowseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowseError::IoError(e) => write!(f, "I/O error: {e}"),
            BrowseError::CsvError(e) => write!(f, "CSV error: {e}"),
            BrowseError::ParseFailed(msg) => write!(f, "Error parsing CSV: {msg}"),
            BrowseError::FileTooLarge { size, limit } => {
                write!(f, "File is too large ({size} bytes, limit is {limit} bytes)")
            }
            BrowseError::UnknownFileHandle(handle) => write!(f, "Unknown file handle {handle}"),
            BrowseError::InvalidPath(msg) => write!(f, "Invalid path: {msg}"),
            BrowseError::FileNotFound => write!(f, "File not found"),
            BrowseError::PermissionDenied => write!(f, "Permission denied"),
            BrowseError::NotAFile => write!(f, "Not a file"),
            BrowseError::UnknownFileType => write!(f, "Only CSV files are allowed"),
        }
    }
}

impl std::error::Error for BrowseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowseError::IoError(e) => Some(e),
            BrowseError::CsvError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for BrowseError {
    fn from(err: Error) -> Self {
        BrowseError::IoError(err)
    }
}

impl From<csv::Error> for BrowseError {
    fn from(err: csv::Error) -> Self {
        BrowseError::CsvError(err)
    }
}

/// Runtime settings, assembled from the command line in `main`.
#[derive(Debug, Clone, Setters)]
pub struct BrowseConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_size: usize,
    pub uploads_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            page_size: DEFAULT_PAGE_SIZE,
            uploads_dir: std::env::temp_dir().join("csvbrowse-uploads"),
            export_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    Filter,
    Open,
    GotoPage,
    Raw,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Search => "Search: ",
            CMDMode::Filter => "Filter: ",
            CMDMode::Open => "Open: ",
            CMDMode::GotoPage => "Page: ",
            CMDMode::Raw => ":",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Search,
    Filter,
    RemoveFilter,
    ClearFilters,
    Sort,
    ClearSort,
    HideColumn,
    ShowAllColumns,
    MoveColumnLeft,
    MoveColumnRight,
    CyclePageSize,
    GotoPage,
    Open,
    RemoveFile,
    Export,
    CopyCell,
    CopyRow,
    EnterCommand,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  ←↓↑→ / hjkl     move the cursor
  n / PgDn        next page
  p / PgUp        previous page
  g / Home        first page
  G / End         last page
  P               go to page ...

Data
  /               search all columns
  f               filter current column
  F               remove filter of current column
  c               clear search and all filters
  s               sort by current column (again to flip)
  S               remove sorting
  +               cycle page size

Columns
  x               hide current column
  a               show all columns
  < / >           move current column left / right

Files
  o               open a CSV file
  D               remove the current file
  e               export filtered view

Other
  y / Y           copy cell / row to clipboard
  :               command (show, hide, showall, hideall,
                  order, pagesize, sort, unsort, clear,
                  export, remove)
  ?               this help
  Esc             close popup / cancel input
  q               quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_facing() {
        let err = BrowseError::ParseFailed("Too many fields on line 3".into());
        assert_eq!(err.to_string(), "Error parsing CSV: Too many fields on line 3");
        assert_eq!(
            BrowseError::UnknownFileType.to_string(),
            "Only CSV files are allowed"
        );
        let err = BrowseError::FileTooLarge {
            size: MAX_UPLOAD_SIZE + 1,
            limit: MAX_UPLOAD_SIZE,
        };
        assert_eq!(
            err.to_string(),
            "File is too large (10485761 bytes, limit is 10485760 bytes)"
        );
    }

    #[test]
    fn config_setters_chain() {
        let cfg = BrowseConfig::default().page_size(25).max_column_width(12);
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.max_column_width, 12);
        assert_eq!(cfg.event_poll_time, 100);
    }
}
