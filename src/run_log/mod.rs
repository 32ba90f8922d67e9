//! Structured audit trail for a single scrape run.
//!
//! A [`RunLogger`] is created per run and handed by reference to every
//! component that wants to record something. At the end of the run it is
//! flushed to an [`ArtifactStore`] as three kinds of JSON documents: the full
//! run, a WARN/ERROR summary, and one file per product.

pub mod artifacts;
pub mod logger;

pub use artifacts::{
    build_artifact_store, ArtifactStore, BucketArtifactStore, LocalArtifactStore,
    MemoryArtifactStore,
};
pub use logger::{sanitize_key, FlushReport, LogEntry, LogLevel, RunLogger};
