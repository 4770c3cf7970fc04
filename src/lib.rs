//! Decoder for Alchemy engine IGZ scene containers.
//!
//! IGZ files are serialized object graphs spanning six schema generations
//! and several console platforms (32/64-bit pointers, both byte orders).
//! Parsing loads the container tables, walks the typed object graph with the
//! schema variant matching the file's version, and produces model records
//! whose geometry decodes on demand through the vertex codecs.

/// Low-level file access: byte cursor and container loader
pub mod data;
/// Error definitions
pub mod error;
/// Object-graph walker and per-title schema variant tables
pub mod graph;
/// Top-level parse entry points and decode options
pub mod igz;
/// Model/mesh/skeleton records and the vertex codecs
pub mod models;

pub use igz::{DecodeOptions, IgzFile};
