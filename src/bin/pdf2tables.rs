//! CLI binary for pdf2tables.
//!
//! Maps flags onto `ExtractionConfig`, runs the extraction and sends the
//! tables to a workbook or the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2tables::{
    export, extract, ChunkingOptions, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, OutputMode, PartitionStrategy, ProgressCallback, RecordPolicy,
    Stage, TableMode,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Spinner while a stage runs, a bar for pages and for captions.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn counting(&self, prefix: &'static str, unit: &str, total: usize) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  ⏱ {{elapsed_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(prefix);
        self.bar.set_message("");
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        if stage != Stage::Partition {
            self.bar.set_style(spinner_style());
        }
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_page_partitioned(&self, page_num: usize, total_pages: usize, elements: usize) {
        if self.bar.length() != Some(total_pages as u64) {
            self.counting("Partitioning", "pages", total_pages);
        }
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{elements:>4} elements")),
        ));
        self.bar.inc(1);
    }

    fn on_captioning_start(&self, total: usize) {
        if total > 0 {
            self.counting("Captioning", "figures", total);
        }
    }

    fn on_image_captioned(&self, index: usize, total: usize, caption_len: usize) {
        self.bar.println(format!(
            "  {} Figure {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{caption_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, records: usize, tables: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} records, {} tables",
            green("✔"),
            bold(&records.to_string()),
            bold(&tables.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Tables to output_tables.xlsx (one sheet per table)
  pdf2tables report.pdf

  # Print every table instead of writing a workbook
  pdf2tables --print --all-tables report.pdf

  # No vision model for layout: read the text layer
  pdf2tables --strategy fast report.pdf -o tables.xlsx

  # Keep titled sections too, and dump the records
  pdf2tables --keep-titled --print-records --records-csv records.csv report.pdf

  # Everything as JSON
  pdf2tables --json https://example.com/report.pdf > report.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_PROVIDER      Vision provider for --provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_LLM_PROVIDER  Vision provider picked by the library when --provider is unset
  EDGEQUAKE_MODEL         Vision model ID
  PDFIUM_LIB_PATH         libpdfium file, or the directory holding it
  RUST_LOG                Log filter, e.g. pdf2tables=debug
"#;

/// Extract tables from PDF documents into an XLSX workbook.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2tables",
    version,
    about = "Extract tables from PDF files and URLs into an XLSX workbook",
    long_about = "Partition a PDF into typed elements, drop running headers and footers, \
caption large figures with a vision model, chunk the text by section title and turn the \
HTML tables found in untitled chunks into spreadsheet sheets.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Workbook path.
    #[arg(short, long, env = "PDF2TABLES_OUTPUT", default_value = export::DEFAULT_WORKBOOK)]
    output: PathBuf,

    /// Print the tables instead of writing a workbook.
    #[arg(long, env = "PDF2TABLES_PRINT")]
    print: bool,

    /// Keep every table of a record, not just the first.
    #[arg(long, env = "PDF2TABLES_ALL_TABLES")]
    all_tables: bool,

    /// Also record texts that split into a title and a body.
    #[arg(long, env = "PDF2TABLES_KEEP_TITLED")]
    keep_titled: bool,

    /// Print the record frame.
    #[arg(long, env = "PDF2TABLES_PRINT_RECORDS")]
    print_records: bool,

    /// Write the records to this CSV file.
    #[arg(long, env = "PDF2TABLES_RECORDS_CSV")]
    records_csv: Option<PathBuf>,

    /// Print the full result as JSON on stdout.
    #[arg(long, env = "PDF2TABLES_JSON", conflicts_with_all = ["print", "print_records"])]
    json: bool,

    /// Partitioning strategy.
    #[arg(long, env = "PDF2TABLES_STRATEGY", value_enum, default_value = "hi-res")]
    strategy: StrategyArg,

    /// Rendering DPI (72–400); also the pixel space of figure sizes.
    #[arg(long, env = "PDF2TABLES_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Do not save embedded figures (disables captioning).
    #[arg(long, env = "PDF2TABLES_NO_EXTRACT_IMAGES")]
    no_extract_images: bool,

    /// Directory for extracted figures. Default: the OS temp directory.
    #[arg(long, env = "PDF2TABLES_IMAGE_DIR")]
    image_dir: Option<PathBuf>,

    /// Minimum figure width in pixels for captioning.
    #[arg(long, env = "PDF2TABLES_MIN_IMAGE_WIDTH", default_value_t = 250.0)]
    min_image_width: f32,

    /// Minimum figure height in pixels for captioning.
    #[arg(long, env = "PDF2TABLES_MIN_IMAGE_HEIGHT", default_value_t = 270.0)]
    min_image_height: f32,

    /// Hard limit on chunk length in characters.
    #[arg(long, env = "PDF2TABLES_MAX_CHARACTERS", default_value_t = 4096)]
    max_characters: usize,

    /// Soft limit: start a new chunk once this length is reached.
    #[arg(long, env = "PDF2TABLES_NEW_AFTER_N_CHARS")]
    new_after_n_chars: Option<usize>,

    /// Merge sections shorter than this into the next one.
    #[arg(long, env = "PDF2TABLES_COMBINE_UNDER_N_CHARS", default_value_t = 0)]
    combine_under_n_chars: usize,

    /// Start a new chunk at every page break.
    #[arg(long, env = "PDF2TABLES_NO_MULTIPAGE_SECTIONS")]
    no_multipage_sections: bool,

    /// Vision model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Vision provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2TABLES_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per vision call.
    #[arg(long, env = "PDF2TABLES_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Retries per vision call (0-10).
    #[arg(long, env = "PDF2TABLES_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TABLES_PASSWORD")]
    password: Option<String>,

    /// Text file with a custom caption prompt.
    #[arg(long, env = "PDF2TABLES_CAPTION_PROMPT")]
    caption_prompt: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2TABLES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per vision call timeout in seconds.
    #[arg(long, env = "PDF2TABLES_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2TABLES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TABLES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TABLES_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Fast,
    HiRes,
    Auto,
}

impl From<StrategyArg> for PartitionStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Fast => PartitionStrategy::Fast,
            StrategyArg::HiRes => PartitionStrategy::HiRes,
            StrategyArg::Auto => PartitionStrategy::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Library INFO logs would tear the progress bar; keep them for -v.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let output = extract(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    let mode = if cli.print {
        OutputMode::Print
    } else {
        OutputMode::Workbook(cli.output.clone())
    };
    write_outputs(&cli, &mode, &output)?;

    if !cli.quiet {
        print_summary(&mode, &output);
    }
    Ok(())
}

fn write_outputs(cli: &Cli, mode: &OutputMode, output: &ExtractionOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if cli.json {
        let json = output.to_json().context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    }
    if cli.print_records {
        export::print_records(&output.records, &mut handle)
            .context("Failed to write to stdout")?;
    }

    match mode {
        OutputMode::Print => {
            export::print_tables(output.data_tables(), &mut handle)
                .context("Failed to write to stdout")?;
        }
        OutputMode::Workbook(path) => {
            export::write_workbook(output.data_tables(), path)
                .with_context(|| format!("Failed to write workbook {}", path.display()))?;
        }
    }

    if let Some(ref path) = cli.records_csv {
        export::write_records_csv(&output.records, path)
            .with_context(|| format!("Failed to write records to {}", path.display()))?;
    }
    Ok(())
}

fn print_summary(mode: &OutputMode, output: &ExtractionOutput) {
    let stats = &output.stats;
    if let OutputMode::Workbook(path) = mode {
        if stats.tables > 0 {
            eprintln!(
                "{}  {} sheet(s)  →  {}",
                green("✔"),
                stats.tables,
                bold(&path.display().to_string()),
            );
        } else {
            eprintln!("{}  no tables found; workbook not written", cyan("⚠"));
        }
    }
    if stats.titled_dropped > 0 {
        eprintln!(
            "{}  {} titled section(s) skipped; --keep-titled records them",
            cyan("⚠"),
            stats.titled_dropped
        );
    }
    eprintln!(
        "   {}",
        dim(&format!(
            "{} elements, {} chunks, {} records, {} figure caption(s), {}ms total",
            stats.elements, stats.chunks, stats.records, stats.images_captioned, stats.total_duration_ms
        ))
    );
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .strategy(cli.strategy.into())
        .dpi(cli.dpi)
        .extract_images(!cli.no_extract_images)
        .min_image_size(cli.min_image_width, cli.min_image_height)
        .chunking(ChunkingOptions {
            multipage_sections: !cli.no_multipage_sections,
            combine_text_under_n_chars: cli.combine_under_n_chars,
            new_after_n_chars: cli.new_after_n_chars,
            max_characters: cli.max_characters,
        })
        .record_policy(if cli.keep_titled {
            RecordPolicy::All
        } else {
            RecordPolicy::UntitledOnly
        })
        .table_mode(if cli.all_tables {
            TableMode::All
        } else {
            TableMode::First
        })
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref dir) = cli.image_dir {
        builder = builder.image_output_dir(dir);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.caption_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read caption prompt from {:?}", path))?;
        builder = builder.caption_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
