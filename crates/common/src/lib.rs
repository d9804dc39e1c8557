//! Shared infrastructure for memoryless binaries.

pub mod logging;
