//! CLI binary for edgequake-ocr.
//!
//! A thin shim over the library crate that maps CLI flags to `ApiConfig` /
//! `OcrConfig`, runs the batch and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ocr::output::has_errors;
use edgequake_ocr::prompts::SUMMARIZE_FIELDS_PROMPT;
use edgequake_ocr::{
    render_json, render_text, ApiConfig, ModelRegistry, OcrConfig, OcrPipeline,
    OcrProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────

/// Progress bar over the items of the current batch. A PDF is one batch of
/// pages; a single image is a batch of one.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(SPINNER),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn item_elapsed(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_items: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_position(0);
        self.bar.set_length(total_items as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    fn on_item_start(&self, index: usize, _total: usize) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("item {index}"));
    }

    fn on_item_complete(&self, index: usize, total: usize) {
        let secs = self.item_elapsed();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.item_elapsed();

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR an image
  edgeocr receipt.jpg

  # OCR a PDF, one section per page
  edgeocr --separate-pages contract.pdf -o contract.txt

  # Several inputs, remote images included
  edgeocr scan1.png https://example.com/scan2.png

  # Custom prompt, higher rasterisation DPI
  edgeocr -p "Extract the table as CSV" --dpi 300 report.pdf

  # Raw model responses as JSON
  edgeocr --json invoice.pdf > invoice.json

  # Use the Hugging Face profile
  edgeocr --profile qwen2.5-vl-7b photo.webp

ENVIRONMENT VARIABLES:
  API_URL            Chat-completions endpoint of the default profile
  API_KEY            Bearer key of the default profile
  MODEL              Model of the default profile (qwen2-vl-32b-instruct-awq)
  HF_API_URL         Endpoint of the qwen2.5-vl-7b profile
  HF_API_KEY         Bearer key of the qwen2.5-vl-7b profile
  HF_MODEL           Model of the qwen2.5-vl-7b profile
  DEFAULT_DPI        PDF rasterisation DPI (200)
  MAX_FILE_SIZE_MB   Local input size cap in MB (16)
  PDFIUM_LIB_PATH    Path to libpdfium; otherwise the system library or pdftoppm is used
  RUST_LOG           Log filter, overrides -v / -q
"#;

/// Extract text from images and PDFs with a Vision Language Model.
#[derive(Parser, Debug)]
#[command(
    name = "edgeocr",
    version,
    about = "Extract text from images and PDFs with a Vision Language Model",
    long_about = "Send images (local files or URLs) and PDF pages to an OpenAI-compatible \
chat-completions endpoint serving a vision model such as Qwen2-VL, and print the text it reads.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image paths, image URLs, or PDF paths.
    #[arg(required_unless_present = "list_models")]
    files: Vec<String>,

    /// Prompt sent with every image.
    #[arg(short, long)]
    prompt: Option<String>,

    /// Ask for a summary of key fields instead of the full text.
    #[arg(long, conflicts_with = "prompt")]
    fields: bool,

    /// Named API profile (see --list-models).
    #[arg(long)]
    profile: Option<String>,

    /// Chat-completions endpoint URL. Default: `API_URL`, or the profile's.
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer key for the endpoint. Default: `API_KEY`, or the profile's.
    #[arg(long)]
    api_key: Option<String>,

    /// Model identifier sent in the request. Default: `MODEL`, or the profile's.
    #[arg(long)]
    model: Option<String>,

    /// Also save the printed results to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print raw model responses as JSON.
    #[arg(long)]
    json: bool,

    /// PDF rasterisation DPI (36–600).
    #[arg(long, env = "DEFAULT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: u32,

    /// Print a header before each PDF page.
    #[arg(long)]
    separate_pages: bool,

    /// Reject local inputs larger than this many MB.
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = 16)]
    max_size: u64,

    /// Print the configured model profiles and exit.
    #[arg(long)]
    list_models: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_models;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let registry = ModelRegistry::from_env();

    if cli.list_models {
        let summary = registry.summary();
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise model list")?
        );
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let api = resolve_api(&cli, &registry)?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn OcrProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    let pipeline = OcrPipeline::connect(api, config).context("Cannot start OCR")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let prompt = if cli.fields {
        Some(SUMMARIZE_FIELDS_PROMPT)
    } else {
        cli.prompt.as_deref()
    };
    let entries = pipeline
        .process_files(&cli.files, prompt, Some(cli.dpi))
        .await;
    drop(pipeline);

    let rendered = if cli.json {
        render_json(&entries).context("Failed to serialise results")?
    } else {
        render_text(&entries, cli.separate_pages, cli.files.len())
    };

    {
        let mut out = io::stdout().lock();
        out.write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            out.write_all(b"\n").ok();
        }
    }

    if let Some(ref path) = cli.output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!("Results saved to {}", bold(&path.display().to_string()));
        }
    }

    let failed = entries.iter().filter(|e| e.is_error()).count();
    if !cli.quiet {
        if failed == 0 {
            eprintln!("{} {} result(s)", green("✔"), entries.len());
        } else {
            eprintln!(
                "{} {}/{} result(s) failed",
                red("✘"),
                red(&failed.to_string()),
                entries.len()
            );
        }
    }

    if has_errors(&entries) {
        std::process::exit(1);
    }
    Ok(())
}

/// Start from the chosen profile (or `API_URL` / `API_KEY` / `MODEL`) and
/// apply any explicit `--api-url` / `--api-key` / `--model`.
///
/// The profile's own values win over the default-profile environment, so
/// these flags take no clap `env` fallback.
fn resolve_api(cli: &Cli, registry: &ModelRegistry) -> Result<ApiConfig> {
    let mut api = match cli.profile {
        Some(ref id) => registry.get(id)?.api.clone(),
        None => ApiConfig::from_env(),
    };
    if let Some(ref url) = cli.api_url {
        api.endpoint = url.clone();
    }
    if let Some(ref key) = cli.api_key {
        api.api_key = key.clone();
    }
    if let Some(ref model) = cli.model {
        api.model = model.clone();
    }
    api.validate()
        .context("API URL and API key must be configured (--api-url/--api-key or API_URL/API_KEY)")?;
    Ok(api)
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .dpi(cli.dpi)
        .max_file_size_mb(cli.max_size);
    if let Some(ref prompt) = cli.prompt {
        builder = builder.prompt(prompt.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}
