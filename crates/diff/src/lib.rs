//! Structural diff engine for resource snapshots.
//!
//! This crate provides:
//! - Noise exclusion for server-managed sub-trees (status, managedFields, ...)
//! - One-way hashing of Secret payload leaves
//! - A recursive map diff emitting RFC-6902 shaped patch operations
//!
//! Sequences are never diffed element-wise: a changed sequence is replaced
//! whole, and downstream consumers rely on that.

pub mod engine;
pub mod noise;
pub mod redact;

pub use engine::{compute_diff, filtered_snapshot};
pub use noise::{exclude_noise, is_noise_path};
pub use redact::{hash_leaf, redact_sensitive};
