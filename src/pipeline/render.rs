//! PDF rasterisation: render every page to a `DynamicImage`.
//!
//! Two interchangeable backends sit behind the [`Rasterizer`] trait:
//!
//! * [`PdfiumRasterizer`]: in-process via `pdfium-render`. Bound from
//!   `PDFIUM_LIB_PATH` when set, otherwise from the system library.
//! * [`PdftoppmRasterizer`]: shells out to poppler's `pdftoppm`, writing PNGs
//!   into a self-deleting temp directory and reading them back.
//!
//! [`select_rasterizer`] probes both once at startup and returns the first
//! that works. When neither is available the pipeline still handles images
//! and URLs; only PDFs fail, with [`OcrError::UnsupportedFormat`].
//!
//! Both backends render at `dpi / 72` pixels per PDF point and are
//! CPU-bound, so [`render_pdf`] runs them inside `spawn_blocking`.

use crate::error::OcrError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// A PDF-to-images backend.
pub trait Rasterizer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Render every page of `pdf_path`, in document order.
    ///
    /// Blocking; call through [`render_pdf`] from async code.
    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, OcrError>;
}

/// Probe the available backends, preferring pdfium.
pub fn select_rasterizer() -> Option<Arc<dyn Rasterizer>> {
    match PdfiumRasterizer::detect() {
        Some(r) => {
            info!("PDF backend: pdfium");
            return Some(Arc::new(r));
        }
        None => debug!("pdfium library not found"),
    }
    match PdftoppmRasterizer::detect() {
        Some(r) => {
            info!("PDF backend: pdftoppm");
            return Some(Arc::new(r));
        }
        None => debug!("pdftoppm not found - install poppler-utils for the fallback backend"),
    }
    warn!("No PDF backend available; PDF inputs will be rejected");
    None
}

/// Rasterise a PDF off the async executor.
///
/// Fails with [`OcrError::UnsupportedFormat`] when `rasterizer` is `None`,
/// then with [`OcrError::NotFound`] when the file is missing.
pub async fn render_pdf(
    rasterizer: Option<Arc<dyn Rasterizer>>,
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<DynamicImage>, OcrError> {
    let rasterizer = rasterizer.ok_or_else(|| OcrError::UnsupportedFormat {
        detail: "No PDF backend available. Install libpdfium (or set PDFIUM_LIB_PATH) \
                 or poppler-utils (pdftoppm)."
            .into(),
    })?;
    if !pdf_path.exists() {
        return Err(OcrError::NotFound {
            path: pdf_path.to_path_buf(),
        });
    }

    let path = pdf_path.to_path_buf();
    let images = tokio::task::spawn_blocking(move || rasterizer.rasterize(&path, dpi))
        .await
        .map_err(|e| OcrError::Internal(format!("Render task panicked: {}", e)))??;

    info!("Rendered {} page(s) at {} DPI", images.len(), dpi);
    Ok(images)
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// In-process rendering through the pdfium C++ library.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    /// Explicit library file; `None` means the system library.
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind once to confirm the library loads, then release it.
    pub fn detect() -> Option<Self> {
        let library = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
        let candidate = Self { library };
        match candidate.bind() {
            Ok(_) => Some(candidate),
            Err(e) => {
                debug!("pdfium bind failed: {:?}", e);
                None
            }
        }
    }

    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        let bindings = match &self.library {
            Some(path) => Pdfium::bind_to_library(path)?,
            None => Pdfium::bind_to_system_library()?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, OcrError> {
        let pdfium = self.bind().map_err(|e| OcrError::UnsupportedFormat {
            detail: format!("Failed to bind to pdfium: {:?}", e),
        })?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| OcrError::RasterisationFailed {
                page: 0,
                detail: format!("{:?}", e),
            })?;

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut images = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                OcrError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }
        Ok(images)
    }
}

// ── pdftoppm ─────────────────────────────────────────────────────────────

/// Rendering through poppler's `pdftoppm` command.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `pdftoppm -v` exits successfully when poppler-utils is installed.
    pub fn detect() -> Option<Self> {
        let candidate = Self::new("pdftoppm");
        let ok = Command::new(&candidate.program)
            .arg("-v")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        ok.then_some(candidate)
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    fn rasterize(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, OcrError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| OcrError::Internal(format!("Failed to create temp dir: {}", e)))?;
        let prefix = temp_dir.path().join("page");

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| OcrError::UnsupportedFormat {
                detail: format!("Failed to run pdftoppm: {}", e),
            })?;

        if !output.status.success() {
            return Err(OcrError::RasterisationFailed {
                page: 0,
                detail: format!(
                    "pdftoppm failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        // pdftoppm zero-pads page numbers to a common width, so lexical
        // order is page order.
        let mut files: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())
            .map_err(|e| OcrError::Internal(format!("Failed to list rendered pages: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        files.sort();

        files
            .iter()
            .enumerate()
            .map(|(idx, file)| {
                image::open(file).map_err(|e| OcrError::RasterisationFailed {
                    page: idx + 1,
                    detail: e.to_string(),
                })
            })
            .collect()
    }
}
