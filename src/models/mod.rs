//! Domain models for the pricewatch backend.
//!
//! This module contains the database-backed records of the price
//! reconciliation engine plus the inbound observation payload.

pub mod archived_item;
pub mod item;
pub mod observation;

// Re-export all models for convenient access
pub use archived_item::ArchivedItem;
pub use item::Item;
pub use observation::{ArchivePolicy, IngestOutcome, Observation};
