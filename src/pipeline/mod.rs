//! Pipeline stages for turning one report PDF into a validated fragment.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering or model backend can be swapped
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ llm ──▶ parse ──▶ validate
//! (pdfium)   (base64)   (VLM)   (JSON)    (typed records)
//! ```
//!
//! 1. [`render`]: rasterise the first pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 2. [`encode`]: PNG-encode and base64-wrap each page for the request body
//! 3. [`llm`]: one multimodal call per document; the only stage with
//!    network I/O
//! 4. [`parse`]: cut the JSON object out of the free-form reply
//! 5. [`validate`]: coerce every field onto the record types, never failing
//!
//! [`crate::processor::DocumentProcessor`] chains the stages.

pub mod encode;
pub mod llm;
pub mod parse;
pub mod render;
pub mod validate;
