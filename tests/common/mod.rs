//! Common test infrastructure
//!
//! In-memory upstream services and fixtures for running the whole pipeline
//! without touching the network. Tests should only import from this module,
//! not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{album, TestRun, MHTRTC, MHTRTC_WEB_ID};
//!
//! #[tokio::test]
//! async fn test_snatch() {
//!     let run = TestRun::new();
//!     let summary = run.orchestrator().run(vec![album(MHTRTC)]).await.unwrap();
//!     assert_eq!(summary.snatched[0].chosen_release_id, Some(MHTRTC_WEB_ID));
//! }
//! ```

mod constants;
mod fakes;
mod fixtures;

// Public API - this is what tests import
pub use constants::*;
#[allow(unused_imports)]
pub use fakes::{torrent_bytes, FakeCatalog, FakeHistory, FakeRegistry};
#[allow(unused_imports)]
pub use fixtures::*;
