pub mod catalog;
pub mod history;
pub mod ingest;

pub use catalog::{Catalog, CatalogService, FilterQuery, FilteredPage};
pub use history::{HistoryQuery, HistoryService, PriceHistory};
pub use ingest::IngestService;
