//! Pipeline stages for image/PDF OCR.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested alone and the rasterisation backend can change without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ normalize ──▶ encode ──▶ request ──▶ client ──▶ extract
//! (path/URL) (PDF→img)  (bound/RGB)   (JPEG/b64)  (JSON body)  (HTTP)    (text)
//! ```
//!
//! 1. [`input`]:     classify the source, run upload checks before any read
//! 2. [`render`]:    rasterise PDF pages through a [`render::Rasterizer`]
//! 3. [`normalize`]: flatten alpha, convert to RGB, cap dimensions
//! 4. [`encode`]:    JPEG + base64 data URI, or pass a remote URL through
//! 5. [`request`]:   the chat-completions body for one image
//! 6. [`client`]:    bearer-auth POST; failures captured, never raised
//! 7. [`extract`]:   `choices[0].message.content` with a diagnostic fallback

pub mod client;
pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod render;
pub mod request;
