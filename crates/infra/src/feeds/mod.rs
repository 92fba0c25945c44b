//! Calendar feed adapters: iCal import and export

pub mod export;
pub mod import;

pub use export::IcalExporter;
pub use import::{parse_feed, HttpFeedImporter};
