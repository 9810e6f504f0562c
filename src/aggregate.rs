//! Page aggregation: drive the pipeline over one input or a batch.
//!
//! [`OcrPipeline`] is the library's entry point. It owns the OCR backend, the
//! optional PDF backend, and the processing config, and walks inputs strictly
//! in order, one request in flight at a time. Expected batches are a handful
//! of pages, so sequential processing keeps results trivially ordered and the
//! remote server unloaded.
//!
//! ## Failure policy
//!
//! * A remote failure on one page is recorded in that page's
//!   [`OcrResult`] and the batch continues.
//! * A failure while *assembling* a request (unreadable file, encoder error)
//!   aborts the call with an [`OcrError`], since the input itself is bad.
//! * [`OcrPipeline::process_file`] and [`OcrPipeline::process_files`] turn
//!   even those into report entries, so a caller rendering a response never
//!   has to handle `Err`.

use crate::config::{clamp_dpi, ApiConfig, OcrConfig};
use crate::error::{OcrError, RemoteApiError};
use crate::output::{is_error_response, BatchEntry, FileReport, OcrResult};
use crate::pipeline::client::{ApiResult, HttpOcrClient, OcrBackend};
use crate::pipeline::extract::error_message;
use crate::pipeline::encode::{encode_image, encode_source, EncodeOptions, EncodedImageRef};
use crate::pipeline::input::{
    check_upload, classify, is_url, local_file_size, secure_filename, ImageSource, InputKind,
};
use crate::pipeline::render::{render_pdf, select_rasterizer, Rasterizer};
use crate::pipeline::request::OcrRequest;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Sequential OCR over images, PDFs and batches.
#[derive(Clone)]
pub struct OcrPipeline {
    backend: Arc<dyn OcrBackend>,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    model: String,
    config: OcrConfig,
}

impl OcrPipeline {
    /// A pipeline over an arbitrary backend, with no PDF support until
    /// [`Self::with_rasterizer`] is called.
    pub fn new(backend: Arc<dyn OcrBackend>, model: impl Into<String>, config: OcrConfig) -> Self {
        Self {
            backend,
            rasterizer: None,
            model: model.into(),
            config,
        }
    }

    /// The production pipeline: HTTP client from `api`, PDF backend probed
    /// from the system.
    pub fn connect(api: ApiConfig, config: OcrConfig) -> Result<Self, OcrError> {
        let model = api.model.clone();
        let client = HttpOcrClient::new(api)?;
        Ok(Self::new(Arc::new(client), model, config).with_rasterizer(select_rasterizer()))
    }

    pub fn with_rasterizer(mut self, rasterizer: Option<Arc<dyn Rasterizer>>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Name of the active PDF backend, if any.
    pub fn pdf_backend(&self) -> Option<&'static str> {
        self.rasterizer.as_ref().map(|r| r.name())
    }

    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions::from(&self.config)
    }

    fn prompt<'a>(&'a self, prompt: Option<&'a str>) -> &'a str {
        prompt.unwrap_or(&self.config.prompt)
    }

    // ── Single image ─────────────────────────────────────────────────────

    /// OCR one image path or URL. The prompt is sent without a page suffix.
    pub async fn ocr_image(&self, source: &str, prompt: Option<&str>) -> Result<ApiResult, OcrError> {
        self.ocr_source(&ImageSource::parse(source), prompt).await
    }

    async fn ocr_source(
        &self,
        source: &ImageSource,
        prompt: Option<&str>,
    ) -> Result<ApiResult, OcrError> {
        let image = encode_source(source, &self.encode_options())?;
        let request = OcrRequest::build(&self.model, self.prompt(prompt), image, None);

        self.notify_batch_start(1);
        let response = self.send(1, 1, &request).await;
        self.notify_batch_complete(1, usize::from(!is_error_response(&response)));
        Ok(response)
    }

    // ── Batches ──────────────────────────────────────────────────────────

    /// OCR already-decoded pages, annotating each prompt with `(Page i/N)`.
    pub async fn ocr_images(
        &self,
        images: &[DynamicImage],
        prompt: Option<&str>,
    ) -> Result<Vec<OcrResult>, OcrError> {
        let options = self.encode_options();
        self.run_batch(images.len(), self.prompt(prompt), |i| {
            encode_image(&images[i], &options)
        })
        .await
    }

    /// OCR a list of image paths and/or URLs as one page-annotated batch.
    pub async fn ocr_sources(
        &self,
        sources: &[String],
        prompt: Option<&str>,
    ) -> Result<Vec<OcrResult>, OcrError> {
        let options = self.encode_options();
        self.run_batch(sources.len(), self.prompt(prompt), |i| {
            encode_source(&ImageSource::parse(&sources[i]), &options)
        })
        .await
    }

    /// Rasterise a PDF at `dpi` (default from config) and OCR every page.
    pub async fn process_pdf(
        &self,
        pdf_path: &Path,
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> Result<Vec<OcrResult>, OcrError> {
        let dpi = clamp_dpi(dpi.unwrap_or(self.config.dpi));
        info!("Converting PDF to images (DPI: {})", dpi);
        let pages = render_pdf(self.rasterizer.clone(), pdf_path, dpi).await?;
        info!("Found {} page(s)", pages.len());
        self.ocr_images(&pages, prompt).await
    }

    /// The per-item loop shared by every batch entry point.
    ///
    /// `encode(i)` is called lazily, just before item `i` is sent, so only
    /// one encoded image is held at a time.
    async fn run_batch<F>(
        &self,
        total: usize,
        prompt: &str,
        mut encode: F,
    ) -> Result<Vec<OcrResult>, OcrError>
    where
        F: FnMut(usize) -> Result<EncodedImageRef, OcrError>,
    {
        let start = Instant::now();
        self.notify_batch_start(total);

        let mut results = Vec::with_capacity(total);
        for i in 0..total {
            let page = i + 1;
            info!("Processing image {}/{}...", page, total);
            let image = encode(i)?;
            let request = OcrRequest::build(&self.model, prompt, image, Some((page, total)));
            let response = self.send(page, total, &request).await;
            results.push(OcrResult { page, response });
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.notify_batch_complete(total, succeeded);
        info!(
            "Batch complete: {}/{} succeeded in {}ms",
            succeeded,
            total,
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    async fn send(&self, index: usize, total: usize, request: &OcrRequest) -> ApiResult {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_start(index, total);
        }
        let response = self.backend.send(request).await;
        if let Some(ref cb) = self.config.progress_callback {
            match &response {
                Err(e) => cb.on_item_error(index, total, &e.error),
                Ok(v) => match error_message(v) {
                    Some(msg) => cb.on_item_error(index, total, &msg),
                    None => cb.on_item_complete(index, total),
                },
            }
        }
        response
    }

    fn notify_batch_start(&self, total: usize) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }
    }

    fn notify_batch_complete(&self, total: usize, succeeded: usize) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(total, succeeded);
        }
    }

    // ── Files ────────────────────────────────────────────────────────────

    /// Process an uploaded file stored at `path` under its original name.
    ///
    /// The name is sanitised and checked against the extension allow-list
    /// and size cap before the file is opened. Never fails: errors become a
    /// `{"success": false}` report.
    pub async fn process_upload(
        &self,
        original_name: &str,
        path: &Path,
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> FileReport {
        let filename = secure_filename(original_name);
        match self.process_upload_inner(&filename, path, prompt, dpi).await {
            Ok(report) => report,
            Err(e) => {
                error!("OCR processing failed for {}: {}", filename, e);
                FileReport::failure(e.to_string())
            }
        }
    }

    async fn process_upload_inner(
        &self,
        filename: &str,
        path: &Path,
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> Result<FileReport, OcrError> {
        let size = local_file_size(path)?;
        let kind = check_upload(filename, size, self.config.max_file_size_bytes)?;
        debug!("Processing {} as {}", filename, kind.as_str());

        let results = match kind {
            InputKind::Pdf => self.process_pdf(path, prompt, dpi).await?,
            InputKind::Image => {
                let source = ImageSource::Local(path.to_path_buf());
                let response = self.ocr_source(&source, prompt).await?;
                vec![OcrResult { page: 1, response }]
            }
        };
        Ok(FileReport::processed(filename, kind, results))
    }

    /// [`Self::process_upload`] for a file already on disk under its own name.
    pub async fn process_file(
        &self,
        path: &Path,
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> FileReport {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.process_upload(&name, path, prompt, dpi).await
    }

    /// Blocking wrapper around [`Self::process_file`].
    ///
    /// Creates a temporary tokio runtime; do not call from async code.
    pub fn process_file_sync(
        &self,
        path: &Path,
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> Result<FileReport, OcrError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| OcrError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
        Ok(runtime.block_on(self.process_file(path, prompt, dpi)))
    }

    /// Process several inputs (image paths, URLs, local PDFs) in order.
    ///
    /// PDF pages become [`BatchEntry::Page`]s; images and failed files become
    /// [`BatchEntry::File`]s. Local inputs over the size cap are rejected
    /// before they are read. A failing file never stops the rest.
    pub async fn process_files(
        &self,
        inputs: &[String],
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> Vec<BatchEntry> {
        let mut entries = Vec::new();
        for (i, input) in inputs.iter().enumerate() {
            info!("[File {}/{}]: {}", i + 1, inputs.len(), input);

            match self.process_input(input, prompt, dpi).await {
                Ok(mut batch) => entries.append(&mut batch),
                Err(e) => {
                    error!("Error processing {}: {}", input, e);
                    entries.push(BatchEntry::File {
                        file: input.clone(),
                        response: Err(RemoteApiError::new(e.to_string(), None)),
                    });
                }
            }
        }
        entries
    }

    async fn process_input(
        &self,
        input: &str,
        prompt: Option<&str>,
        dpi: Option<u32>,
    ) -> Result<Vec<BatchEntry>, OcrError> {
        if !is_url(input) {
            let size = local_file_size(Path::new(input))?;
            let max = self.config.max_file_size_bytes;
            if size > max {
                return Err(OcrError::FileTooLarge { size, max });
            }
        }

        match classify(input) {
            InputKind::Pdf => {
                let pages = self.process_pdf(Path::new(input), prompt, dpi).await?;
                Ok(pages.into_iter().map(BatchEntry::Page).collect())
            }
            InputKind::Image => {
                let response = self.ocr_image(input, prompt).await?;
                Ok(vec![BatchEntry::File {
                    file: input.to_string(),
                    response,
                }])
            }
        }
    }
}
