//! Client-side review of an uploaded chess game: per-ply engine
//! evaluations, move-quality labels, explanations, and alternate lines,
//! fetched from a remote analysis service.

pub mod api;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod navigation;
pub mod orchestrator;
pub mod panel;
pub mod requests;

pub use clients::{AnalysisClient, AnalysisService};
pub use config::ReviewConfig;
pub use error::{FetchError, NavigationError, ReviewError};
pub use navigation::{NavCommand, ViewMode};
pub use orchestrator::{Lookup, Orchestrator, ReviewEvent};
pub use panel::ReviewPanel;
