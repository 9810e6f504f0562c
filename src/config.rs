//! Configuration types for OCR requests.
//!
//! Two kinds of configuration exist and are kept apart:
//!
//! * [`ApiConfig`]: *where* requests go: endpoint, bearer key, model. Loaded
//!   once at startup and passed by value into [`crate::pipeline::client::HttpOcrClient`].
//!   Never read from ambient globals after construction, so tests can point a
//!   client at a fake server without touching the environment.
//! * [`OcrConfig`]: *how* inputs are processed: DPI, size bounds, JPEG
//!   quality, default prompt, upload cap. Built via [`OcrConfigBuilder`].
//!
//! [`ModelRegistry`] maps short profile ids to `ApiConfig`s so a caller can
//! switch between a self-hosted model and a hosted router by name.

use crate::error::OcrError;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_PROMPT;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Every outbound OCR call is bounded by this timeout. Not configurable.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Default model when `MODEL` is unset.
pub const DEFAULT_MODEL: &str = "qwen2-vl-32b-instruct-awq";

/// Accepted rasterisation DPI range.
pub const MIN_DPI: u32 = 36;
pub const MAX_DPI: u32 = 600;

/// Bring a DPI into [`MIN_DPI`]..=[`MAX_DPI`].
pub fn clamp_dpi(dpi: u32) -> u32 {
    dpi.clamp(MIN_DPI, MAX_DPI)
}

/// Default upload cap in megabytes when `MAX_FILE_SIZE_MB` is unset.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 16;

/// Remote model endpoint, credentials, and model identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Full chat-completions URL, e.g. `https://host/v1/chat/completions`.
    pub endpoint: String,
    /// Bearer token sent in the `Authorization` header.
    pub api_key: String,
    /// Model identifier placed in every request body.
    pub model: String,
}

impl ApiConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Read `API_URL`, `API_KEY` and `MODEL` from the environment.
    ///
    /// Missing values become empty strings; check [`Self::is_configured`].
    pub fn from_env() -> Self {
        Self::new(
            env_or("API_URL", ""),
            env_or("API_KEY", ""),
            env_or("MODEL", DEFAULT_MODEL),
        )
    }

    /// True when both the endpoint and the key are present.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Fail with [`OcrError::ApiNotConfigured`] unless [`Self::is_configured`].
    pub fn validate(&self) -> Result<(), OcrError> {
        if self.endpoint.trim().is_empty() {
            return Err(OcrError::ApiNotConfigured {
                hint: "Missing API URL. Set API_URL or pass --api-url.".into(),
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(OcrError::ApiNotConfigured {
                hint: "Missing API key. Set API_KEY or pass --api-key.".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" },
            )
            .field("model", &self.model)
            .finish()
    }
}

// ── Model registry ───────────────────────────────────────────────────────

/// Profile id used when the caller does not pick one.
pub const DEFAULT_PROFILE: &str = "qwen2-vl-32b";

/// A named API configuration.
#[derive(Debug, Clone)]
pub struct ModelProfile {
    pub id: String,
    /// Human-readable name, e.g. "Qwen2-VL 32B (Local)".
    pub name: String,
    pub api: ApiConfig,
}

/// Public view of a profile; never exposes the key.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub configured: bool,
    pub api_url: String,
}

/// Availability report over every registered profile.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySummary {
    pub models: Vec<ProfileSummary>,
    /// `"ready"` when at least one profile is configured, else `"missing_config"`.
    pub status: &'static str,
}

/// Ordered set of model profiles.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    profiles: Vec<ModelProfile>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two built-in profiles, read from the environment.
    ///
    /// | id | env vars |
    /// |----|----------|
    /// | `qwen2-vl-32b`  | `API_URL`, `API_KEY`, `MODEL` |
    /// | `qwen2.5-vl-7b` | `HF_API_URL`, `HF_API_KEY`, `HF_MODEL` |
    pub fn from_env() -> Self {
        Self::new()
            .with_profile(ModelProfile {
                id: DEFAULT_PROFILE.into(),
                name: "Qwen2-VL 32B (Local)".into(),
                api: ApiConfig::from_env(),
            })
            .with_profile(ModelProfile {
                id: "qwen2.5-vl-7b".into(),
                name: "Qwen2.5-VL 7B (Hugging Face)".into(),
                api: ApiConfig::new(
                    env_or(
                        "HF_API_URL",
                        "https://router.huggingface.co/v1/chat/completions",
                    ),
                    env_or("HF_API_KEY", ""),
                    env_or("HF_MODEL", "Qwen/Qwen2.5-VL-7B-Instruct:hyperbolic"),
                ),
            })
    }

    /// Add or replace a profile, keeping registration order.
    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        self
    }

    pub fn ids(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.id.clone()).collect()
    }

    /// Look a profile up by id.
    pub fn get(&self, id: &str) -> Result<&ModelProfile, OcrError> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| OcrError::UnknownModel {
                id: id.to_string(),
                available: self.ids(),
            })
    }

    /// Look a profile up and require that it is usable.
    pub fn configured(&self, id: &str) -> Result<&ModelProfile, OcrError> {
        let profile = self.get(id)?;
        if !profile.api.is_configured() {
            return Err(OcrError::ApiNotConfigured {
                hint: format!("Model {} is not configured. Missing API key.", profile.name),
            });
        }
        Ok(profile)
    }

    pub fn summary(&self) -> RegistrySummary {
        let models: Vec<ProfileSummary> = self
            .profiles
            .iter()
            .map(|p| {
                let configured = p.api.is_configured();
                ProfileSummary {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    configured,
                    api_url: if configured {
                        p.api.endpoint.clone()
                    } else {
                        "NOT_CONFIGURED".into()
                    },
                }
            })
            .collect();
        let status = if models.iter().any(|m| m.configured) {
            "ready"
        } else {
            "missing_config"
        };
        RegistrySummary { models, status }
    }
}

// ── Processing configuration ─────────────────────────────────────────────

/// Processing options for a single OCR run.
///
/// # Example
/// ```rust
/// use edgequake_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .dpi(300)
///     .max_dimensions(1536, 1536)
///     .prompt("Extract all text from this invoice")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// PDF rasterisation DPI. Range: 36–600. Default: 200.
    ///
    /// Scale is `dpi / 72`, so 200 DPI renders an A4 page at roughly
    /// 1654 × 2339 px before the size bound brings it back down.
    pub dpi: u32,

    /// Maximum width sent to the model. Default: 1024.
    pub max_width: u32,

    /// Maximum height sent to the model. Default: 1024.
    ///
    /// Vision models bill per image tile, so the bound caps token cost per
    /// page regardless of how large the source was.
    pub max_height: u32,

    /// JPEG quality for re-encoded images. Range: 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Prompt used when the caller does not supply one.
    pub prompt: String,

    /// Uploads larger than this are rejected before being read. Default: 16 MiB.
    pub max_file_size_bytes: u64,

    /// Per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_width: 1024,
            max_height: 1024,
            jpeg_quality: 85,
            prompt: DEFAULT_PROMPT.to_string(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("dpi", &self.dpi)
            .field("max_width", &self.max_width)
            .field("max_height", &self.max_height)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("prompt", &self.prompt)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn OcrProgressCallback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, overridden by `DEFAULT_DPI` and `MAX_FILE_SIZE_MB` when set
    /// and parseable.
    pub fn from_env() -> Result<Self, OcrError> {
        let mut builder = Self::builder();
        if let Some(dpi) = env_parse::<u32>("DEFAULT_DPI")? {
            builder = builder.dpi(dpi);
        }
        if let Some(mb) = env_parse::<u64>("MAX_FILE_SIZE_MB")? {
            builder = builder.max_file_size_mb(mb);
        }
        builder.build()
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = clamp_dpi(dpi);
        self
    }

    pub fn max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.config.max_width = width;
        self.config.max_height = height;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.max_width == 0 || c.max_height == 0 {
            return Err(OcrError::InvalidConfig(format!(
                "Maximum dimensions must be non-zero, got {}x{}",
                c.max_width, c.max_height
            )));
        }
        if c.prompt.trim().is_empty() {
            return Err(OcrError::InvalidConfig("Prompt must not be empty".into()));
        }
        if c.max_file_size_bytes == 0 {
            return Err(OcrError::InvalidConfig(
                "Maximum file size must be ≥ 1 MB".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Env helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, OcrError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| OcrError::InvalidConfig(format!("{key} must be a number, got '{v}'"))),
        _ => Ok(None),
    }
}
