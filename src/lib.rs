//! Browse a CSV file: search, column filters, sorting, paging, column
//! visibility and order, and export of the filtered view.

pub mod browser;
pub mod codec;
pub mod dataset;
pub mod domain;
pub mod exporter;
pub mod paginator;
pub mod query;
pub mod session;
pub mod storage;
pub mod upload;
pub mod view;

pub use browser::{Browser, LoadEvent};
pub use dataset::{ColumnDescriptor, Dataset, Row};
pub use domain::{BrowseConfig, BrowseError};
pub use session::{Session, Statistics};
pub use view::{Shift, SortDirection, SortSpec, ViewConfig};
