//! Request-scoped sizing: one uploaded workbook in, one report per policy out.

pub mod config;
pub mod engine;
pub mod report;
pub mod session;

pub use config::SizerConfig;
pub use engine::{SizingEngine, SizingOutcome};
pub use report::{PolicyReport, Section, SizingReport};
pub use session::{SizingSession, VmListing};
