//! Admission decision pipeline.
//!
//! This crate provides:
//! - AdmissionReview-style wire envelope types and decoding
//! - Actor and provenance extraction from a decoded request
//! - `AdmissionHandler`: decode, build the change event, check block rules,
//!   check ignore rules, respond, and hand the event to the async queue
//!
//! The handler never returns an error. Every internal failure resolves to
//! an allow decision; the only deny path is a block-rule match.

pub mod envelope;
pub mod handler;
pub mod provenance;

pub use envelope::{
    decode_review, AdmissionRequest, AdmissionResponse, AdmissionReview, DecodeError,
    GroupVersionKind, ResponseStatus, UserInfo,
};
pub use handler::{AdmissionHandler, Decision, Outcome};
pub use provenance::{actor_from_user_info, detect_source_tool};
