//! Configuration types for PDF table extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Stage-specific knobs that travel
//! together live in small value types ([`CleanOptions`], [`ChunkingOptions`])
//! so they can be handed to a single stage function on their own.

use crate::error::Pdf2TablesError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use pdf2tables::{ExtractionConfig, PartitionStrategy, TableMode};
///
/// let config = ExtractionConfig::builder()
///     .strategy(PartitionStrategy::Fast)
///     .table_mode(TableMode::All)
///     .max_characters(2048)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// How the PDF is turned into elements. Default: [`PartitionStrategy::HiRes`].
    pub strategy: PartitionStrategy,

    /// Resolution used for page renders and for the pixel space of element
    /// coordinates. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Cap on the longest edge of a rendered page, in pixels. Default: 4000,
    /// which keeps A3 and smaller pages at the full `dpi` so the figure size
    /// gate is measured at that resolution.
    pub max_rendered_pixels: u32,

    /// Write embedded figures to [`Self::image_output_dir`]. Default: true.
    ///
    /// Captioning needs the saved file, so turning this off also turns off
    /// captioning.
    pub extract_images: bool,

    /// Directory that extracted figures are written to. Default: the OS
    /// temp directory.
    pub image_output_dir: PathBuf,

    /// File extensions for which table inference is skipped.
    /// Default: `["jpg", "png", "xls", "xlsx"]`.
    pub skip_infer_table_types: Vec<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Text normalisation applied to every element with text.
    pub clean: CleanOptions,

    /// Minimum figure width (pixels) for captioning. Default: 250.
    pub min_image_width: f32,

    /// Minimum figure height (pixels) for captioning. Default: 270.
    pub min_image_height: f32,

    /// Title-based chunking parameters.
    pub chunking: ChunkingOptions,

    /// Which assembled texts become records. Default: [`RecordPolicy::UntitledOnly`].
    pub record_policy: RecordPolicy,

    /// Keep the first or all tables of each HTML record. Default: [`TableMode::First`].
    pub table_mode: TableMode,

    /// Vision model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// Vision provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed vision provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for captions and layout calls. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts on a failed vision call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom caption prompt. If None, uses the built-in default.
    pub caption_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per vision call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional progress events sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: PartitionStrategy::default(),
            dpi: 200,
            max_rendered_pixels: 4000,
            extract_images: true,
            image_output_dir: std::env::temp_dir(),
            skip_infer_table_types: ["jpg", "png", "xls", "xlsx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            password: None,
            clean: CleanOptions::default(),
            min_image_width: 250.0,
            min_image_height: 270.0,
            chunking: ChunkingOptions::default(),
            record_policy: RecordPolicy::default(),
            table_mode: TableMode::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            caption_prompt: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("strategy", &self.strategy)
            .field("dpi", &self.dpi)
            .field("extract_images", &self.extract_images)
            .field("image_output_dir", &self.image_output_dir)
            .field("skip_infer_table_types", &self.skip_infer_table_types)
            .field("clean", &self.clean)
            .field("min_image_width", &self.min_image_width)
            .field("min_image_height", &self.min_image_height)
            .field("chunking", &self.chunking)
            .field("record_policy", &self.record_policy)
            .field("table_mode", &self.table_mode)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether table inference is skipped for a file with this extension.
    pub fn skips_tables_for(&self, extension: &str) -> bool {
        self.skip_infer_table_types
            .iter()
            .any(|t| t.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn image_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.image_output_dir = dir.into();
        self
    }

    pub fn skip_infer_table_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.skip_infer_table_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn clean(mut self, options: CleanOptions) -> Self {
        self.config.clean = options;
        self
    }

    pub fn min_image_size(mut self, width: f32, height: f32) -> Self {
        self.config.min_image_width = width.max(0.0);
        self.config.min_image_height = height.max(0.0);
        self
    }

    pub fn chunking(mut self, options: ChunkingOptions) -> Self {
        self.config.chunking = options;
        self
    }

    pub fn max_characters(mut self, n: usize) -> Self {
        self.config.chunking.max_characters = n;
        self
    }

    pub fn new_after_n_chars(mut self, n: Option<usize>) -> Self {
        self.config.chunking.new_after_n_chars = n;
        self
    }

    pub fn combine_text_under_n_chars(mut self, n: usize) -> Self {
        self.config.chunking.combine_text_under_n_chars = n;
        self
    }

    pub fn multipage_sections(mut self, v: bool) -> Self {
        self.config.chunking.multipage_sections = v;
        self
    }

    pub fn record_policy(mut self, policy: RecordPolicy) -> Self {
        self.config.record_policy = policy;
        self
    }

    pub fn table_mode(mut self, mode: TableMode) -> Self {
        self.config.table_mode = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.caption_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2TablesError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Pdf2TablesError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        c.chunking.validate()?;
        if c.api_timeout_secs == 0 {
            return Err(Pdf2TablesError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Stage option types ───────────────────────────────────────────────────

/// Text normalisation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Regroup paragraphs broken by hard line wraps. Default: true.
    pub group_broken_paragraphs: bool,
    /// Strip a leading bullet glyph. Default: false.
    pub bullets: bool,
    /// Turn newlines into spaces, collapse runs of spaces, trim. Default: true.
    pub extra_whitespace: bool,
    /// Replace `-` and `–` with spaces. Default: false.
    pub dashes: bool,
    /// Drop trailing `.,:;`. Default: false.
    pub trailing_punctuation: bool,
    /// Lowercase the text. Default: false.
    pub lowercase: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            group_broken_paragraphs: true,
            bullets: false,
            extra_whitespace: true,
            dashes: false,
            trailing_punctuation: false,
            lowercase: false,
        }
    }
}

/// Parameters of the title-based chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingOptions {
    /// Let a section continue across page breaks. Default: true.
    pub multipage_sections: bool,
    /// Merge a section shorter than this into the next one. Default: 0 (off).
    pub combine_text_under_n_chars: usize,
    /// Soft limit: start a new chunk once this length is reached.
    /// Default: None (same as `max_characters`).
    pub new_after_n_chars: Option<usize>,
    /// Hard limit on chunk text length. Default: 4096.
    pub max_characters: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            multipage_sections: true,
            combine_text_under_n_chars: 0,
            new_after_n_chars: None,
            max_characters: 4096,
        }
    }
}

impl ChunkingOptions {
    /// Soft chunk limit, never above the hard one.
    pub fn soft_max(&self) -> usize {
        self.new_after_n_chars
            .unwrap_or(self.max_characters)
            .min(self.max_characters)
    }

    pub fn validate(&self) -> Result<(), Pdf2TablesError> {
        if self.max_characters == 0 {
            return Err(Pdf2TablesError::InvalidConfig(
                "max_characters must be ≥ 1".into(),
            ));
        }
        if let Some(n) = self.new_after_n_chars {
            if n > self.max_characters {
                return Err(Pdf2TablesError::InvalidConfig(format!(
                    "new_after_n_chars ({n}) must not exceed max_characters ({})",
                    self.max_characters
                )));
            }
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the PDF is partitioned into elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionStrategy {
    /// Read the embedded text layer. No model calls; no tables on scans.
    Fast,
    /// Render each page and let the vision model infer the layout. (default)
    #[default]
    HiRes,
    /// `Fast` when the document has a text layer, otherwise `HiRes`.
    Auto,
}

/// Which assembled chunk texts become records.
///
/// By default only texts that do **not** split into a title and a body are
/// recorded. Texts that do are dropped and counted in
/// [`ExtractionStats::titled_dropped`](crate::ExtractionStats); `All` records
/// both shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordPolicy {
    /// Only texts without a blank-line separator, titled "Unknown". (default)
    #[default]
    UntitledOnly,
    /// Every text, with a real title when one was split off.
    All,
}

/// How many tables to keep from one HTML body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableMode {
    /// The first table only. (default)
    #[default]
    First,
    /// Every table found.
    All,
}
