//! # edgequake-ocr
//!
//! Extract text from images and PDF documents with a hosted Vision Language
//! Model behind an OpenAI-compatible chat-completions endpoint.
//!
//! ## Why this crate?
//!
//! Classic OCR engines struggle with handwriting, stamps, rotated scans and
//! mixed-language forms. A VLM such as Qwen2-VL reads a page the way a person
//! does, and can be asked for more than raw text ("summarise the key fields").
//! This crate does the plumbing: rasterise PDFs, bound and re-encode images,
//! build the request, call the model, and report every page's outcome.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / URL
//!  │
//!  ├─ 1. Input      classify, upload checks (extension allow-list, size cap)
//!  ├─ 2. Render     PDF → one image per page (pdfium or pdftoppm, spawn_blocking)
//!  ├─ 3. Normalise  alpha over white, RGB, fit within 1024 × 1024
//!  ├─ 4. Encode     JPEG q85 → base64 data URI (URLs pass through untouched)
//!  ├─ 5. Request    chat-completions body, prompt suffixed "(Page i/N)" in batches
//!  ├─ 6. Client     bearer POST, failures captured per page
//!  └─ 7. Extract    choices[0].message.content, or a diagnostic
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr::{ApiConfig, OcrConfig, OcrPipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint, key and model from API_URL / API_KEY / MODEL
//!     let pipeline = OcrPipeline::connect(ApiConfig::from_env(), OcrConfig::from_env()?)?;
//!     for page in pipeline.process_pdf(Path::new("scan.pdf"), None, None).await? {
//!         println!("--- Page {} ---\n{}", page.page, page.text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `edgeocr` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-ocr = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF backends
//!
//! PDFs are rasterised through pdfium when the library can be bound
//! (`PDFIUM_LIB_PATH`, or the system library path), otherwise through the
//! `pdftoppm` executable from poppler-utils. With neither present, PDF inputs
//! fail with [`OcrError::UnsupportedFormat`] while images keep working.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod aggregate;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use aggregate::OcrPipeline;
pub use config::{ApiConfig, ModelProfile, ModelRegistry, OcrConfig, OcrConfigBuilder};
pub use error::{OcrError, RemoteApiError};
pub use output::{render_json, render_text, BatchEntry, FileReport, OcrResult};
pub use pipeline::client::{ApiResult, HttpOcrClient, OcrBackend};
pub use pipeline::extract::extract_text;
pub use pipeline::render::{select_rasterizer, Rasterizer};
pub use progress::{NoopProgressCallback, OcrProgressCallback, ProgressCallback};
