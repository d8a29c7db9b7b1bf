/// Ingestion pipeline: clone repositories, discover source files, embed
/// them, and persist the snapshot.
pub mod core;
pub mod files;
pub mod repos;

pub use core::{IngestReport, Ingestor};
