//! recsnatch library
//!
//! Resolves listening-history recommendations into releases on a private tracker,
//! picks the best edition according to a ranked list of format preferences and
//! downloads its torrent file.

pub mod api_client;
pub mod app;
pub mod cache;
pub mod config;
pub mod eligibility;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use models::{AcquisitionOutcome, Recommendation, RunSummary};
pub use orchestrator::{OrchestratorConfig, RunError, RunOrchestrator};
