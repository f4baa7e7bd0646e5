//! Reference catalog: lookup by serial and bulk import.

pub mod import;
pub mod index;

pub use import::{import_csv, CatalogImportError, ImportSummary};
pub use index::{CatalogIndex, ItemNotFound, ItemResolver};
