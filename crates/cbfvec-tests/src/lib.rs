//! cbfvec Integration Test Infrastructure
//!
//! Fixtures and store doubles shared by the integration tests:
//!
//! - [`ContainerFixture`]: temp directories of synthetic CBF containers
//! - [`RecordingStore`]: in-memory store that logs calls and tracks concurrency
//! - [`FailingStore`]: store that fails at a chosen step
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cbfvec-tests
//! ```

pub mod fixtures;
pub mod stores;

pub use fixtures::{header_lines, pattern_pixels, raw_container, ContainerFixture};
pub use stores::{FailingStore, FailureMode, RecordedUpsert, RecordingStore};
