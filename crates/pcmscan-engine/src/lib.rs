//! # pcmscan-engine
//!
//! The extraction engine: per-sheet field extraction, folder scanning with
//! duplicate detection, and the generate step (renamed copies plus the
//! summary report). Format backends are behind a closed adapter so the
//! extraction logic is written once against cell coordinates.

pub mod adapter;
pub mod batch;
pub mod cancel;
pub mod error;
pub mod export;
pub mod extract;

pub use adapter::SheetAdapter;
pub use batch::{extract_file, scan_folder};
pub use cancel::CancelFlag;
pub use error::{EngineError, EngineResult};
pub use export::{generate, GenerateOutcome};
pub use extract::{extract, Anchors};

// Re-exported so engine consumers don't need a direct core dependency
pub use pcmscan_core::{ProjectRecord, RecordStatus};
