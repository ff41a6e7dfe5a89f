// Library root: the analysis pipeline, shared by the binary and by the
// integration tests in `tests/`. The entry point is `src/main.rs`.

pub mod analysis;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod repository;

// Binary plumbing. Public so tests can build a `Config` directly.
pub mod cli;
pub mod config;
pub mod logging;
