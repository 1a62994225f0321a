//! Record ingestion — reads raw visit records from delimited files into the
//! in-memory relation the reporting pipeline consumes.

pub mod loader;

pub use loader::RecordLoader;
