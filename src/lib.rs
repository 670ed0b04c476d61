//! Slices GTFS-Realtime feeds down to the stops sharing an identifier prefix.
//!
//! A run acquires one payload (a bare feed or a ZIP of sub-feeds), decodes
//! every buffer and then either fans the matching fragments out per stop or
//! prunes the feed to the matching entities. See [`pipeline::run`].

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod redact;
pub mod serde_helpers;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}

pub use error::{PipelineError, Result};
