// Formaliza - Core Library
// Exposes the data pipeline for the CLI, the API server, and tests

pub mod config;
pub mod editor;
pub mod engine;
pub mod export;
pub mod loader;
pub mod normalize;
pub mod record;
pub mod source;

// Re-export commonly used types
pub use config::Config;
pub use editor::{BatchEditor, FlushFailure, PartialFlushError};
pub use engine::{
    AggregateBundle, CrossFilterEngine, FilterState, RegionCount, StatusCount, YearTotal,
    DEFAULT_COMPLETED_STATUSES,
};
pub use export::export_csv;
pub use loader::{load_all, load_collection, Collection, DEFAULT_PAGE_SIZE};
pub use normalize::normalize;
pub use record::{RawRow, Record};
pub use source::{RowStore, SupabaseSource, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
