pub mod config;
pub mod error;
pub mod types;

pub use crate::config::AppConfig;
pub use error::{ReadoutError, ReadoutResult};
pub use types::{CleanRecord, DataQualityWarning, GroupName, LandingPage, VisitRecord};
