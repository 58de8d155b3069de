// Pokedex - Core Library
// Exposes the acquisition + projection pipeline for the TUI, API server, and tests

pub mod model;
pub mod error;
pub mod config;
pub mod acquisition;
pub mod store;
pub mod projection;
pub mod export;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use model::{CatalogEntry, CatalogPage, NamedRef, PageRequest, Record, StatSlot, TypeSlot};
pub use error::FetchError;
pub use config::{AcquisitionConfig, Aggregation, ApiConfig, OverlapPolicy, PokedexConfig};
pub use acquisition::{AcquisitionService, BatchOutcome, EntryFailure, HttpSource, RecordSource};
pub use store::{RecordStore, RefreshOutcome, RefreshStart, RefreshSummary, RefreshTicket};
pub use projection::{
    artwork_url, project, project_with, type_color, DisplayCard, StatBar, StatKind, TagColor,
    TypeTag, ViewStatus,
};
pub use export::{write_cards, OutputFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
