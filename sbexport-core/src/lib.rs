//! SbExport Core Library
//!
//! This crate provides the core functionality for SbExport:
//! - Export envelope codec (base64 + gzip token format)
//! - Recursive payload extraction from export documents
//! - Payload injection for rebuilding export tokens
//! - Collision-safe script filename derivation

pub mod envelope;
pub mod naming;
pub mod walker;

// Re-export commonly used types
pub use envelope::{decode_token, encode_document, EnvelopeError, ENVELOPE_MAGIC};
pub use naming::{derive_filename, sanitize_script_name, SCRIPT_EXTENSION};
pub use walker::{
    extract, inject, Extraction, FileSource, Injection, PayloadSet, SkipReason, SkippedRecord,
    BYTECODE_KEY, NAME_KEY,
};
