//! Ingestion pipeline stages.
//!
//! Each submodule implements exactly one step, so each is testable alone.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ analyze ──────────────▶ encode
//! (name, header)  (caption → enhance)   (canonical JPEG + base64)
//!                      │
//!                  postprocess
//! ```
//!
//! 1. [`validate`]   : admit png/jpg/jpeg/gif uploads, stage them on disk
//! 2. [`analyze`]    : the captioning/description collaborator
//! 3. [`postprocess`]: strip packaging the model adds around its answer
//! 4. [`encode`]     : canonical JPEG re-encode and base64 transport form

pub mod analyze;
pub mod encode;
pub mod postprocess;
pub mod validate;
