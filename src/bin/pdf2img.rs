//! CLI binary for pdf2img.
//!
//! A thin shim over the library crate: `serve` maps flags to a
//! `ServerConfig` and runs the HTTP server, `convert` rasterises one local
//! file with a progress bar.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2img::config::{DEFAULT_FILE_FIELD, DEFAULT_MAX_SCALE, DEFAULT_SCALE};
use pdf2img::{
    convert_to_file, server, ConversionConfig, ConversionProgressCallback, OutputMode,
    PdfiumBackend, ProgressCallback, RenderBackend, ServerConfig, UploadStorage,
    ARCHIVE_FILENAME,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner until the page count is known, then
/// a bar with one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently rendering.
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        *self
            .page_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, png_len: usize) {
        let elapsed = self.page_elapsed();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>8} bytes", png_len)),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(error),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve zip downloads on port 3001
  pdf2img serve

  # Serve base64 data URLs instead, spooling uploads to disk
  pdf2img serve --output-mode inline-array --upload-storage disk

  # Convert a local file to converted_images.zip
  pdf2img convert document.pdf

  # Twice the intrinsic size, JSON output
  pdf2img convert document.pdf --scale 2 --output-mode inline-array -o pages.json

ENVIRONMENT VARIABLES:
  PORT / PDF2IMG_PORT     Listen port (default 3001)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose
"#;

/// Rasterise PDF documents to PNG pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Rasterise PDF documents to PNG pages over HTTP or locally",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2IMG_QUIET")]
    quiet: bool,

    /// Path to the pdfium library, or the directory holding it.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP conversion server.
    Serve(ServeArgs),
    /// Convert one local PDF.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "PDF2IMG_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on. Falls back to $PORT, then 3001.
    #[arg(short, long, env = "PDF2IMG_PORT")]
    port: Option<u16>,

    /// How converted pages are returned.
    #[arg(long, env = "PDF2IMG_OUTPUT_MODE", value_enum, default_value = "archive")]
    output_mode: OutputModeArg,

    /// Default render scale when a request sends none.
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = DEFAULT_SCALE)]
    scale: f32,

    /// Largest accepted scale; larger requests are clamped.
    #[arg(long, env = "PDF2IMG_MAX_SCALE", default_value_t = DEFAULT_MAX_SCALE)]
    max_scale: f32,

    /// Multipart field carrying the PDF.
    #[arg(long, env = "PDF2IMG_FILE_FIELD", default_value = DEFAULT_FILE_FIELD)]
    file_field: String,

    /// Where uploads are held while being read.
    #[arg(long, env = "PDF2IMG_UPLOAD_STORAGE", value_enum, default_value = "memory")]
    upload_storage: StorageArg,

    /// Directory for disk-spooled uploads (default: system temp dir).
    #[arg(long, env = "PDF2IMG_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Request body limit in megabytes.
    #[arg(long, env = "PDF2IMG_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local PDF file.
    input: PathBuf,

    /// Output file. Default: converted_images.zip, or images.json in
    /// inline-array mode.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render scale relative to the page's intrinsic size.
    #[arg(long, default_value_t = DEFAULT_SCALE)]
    scale: f32,

    /// Output format.
    #[arg(long, value_enum, default_value = "archive")]
    output_mode: OutputModeArg,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputModeArg {
    Archive,
    InlineArray,
}

impl From<OutputModeArg> for OutputMode {
    fn from(v: OutputModeArg) -> Self {
        match v {
            OutputModeArg::Archive => OutputMode::Archive,
            OutputModeArg::InlineArray => OutputMode::InlineArray,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StorageArg {
    Memory,
    Disk,
}

impl From<StorageArg> for UploadStorage {
    fn from(v: StorageArg) -> Self {
        match v {
            StorageArg::Memory => UploadStorage::Memory,
            StorageArg::Disk => UploadStorage::Disk,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // During `convert` the progress bar is the feedback; keep library logs
    // at error level unless asked for more.
    let show_progress = !cli.quiet && matches!(cli.command, Command::Convert(_));
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

    let pdfium = PdfiumBackend::new(cli.pdfium_lib_path);
    pdfium
        .probe()
        .context("PDFium engine unavailable; set PDFIUM_LIB_PATH or --pdfium-lib-path")?;
    let backend: Arc<dyn RenderBackend> = Arc::new(pdfium);

    match cli.command {
        Command::Serve(args) => {
            let config = build_server_config(args)?;
            server::serve(config, backend).await.context("Server failed")?;
        }
        Command::Convert(args) => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
            } else {
                None
            };
            run_convert(args, progress, backend, cli.quiet).await?;
        }
    }

    Ok(())
}

/// Map `serve` flags to a `ServerConfig`.
fn build_server_config(args: ServeArgs) -> Result<ServerConfig> {
    let port = match args.port {
        Some(port) => port,
        None => match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{raw}'"))?,
            Err(_) => ServerConfig::default().port,
        },
    };

    let conversion = ConversionConfig::builder()
        .scale(args.scale)
        .max_scale(args.max_scale)
        .output_mode(args.output_mode.into())
        .build()
        .context("Invalid configuration")?;

    if args.max_upload_mb == 0 {
        anyhow::bail!("--max-upload-mb must be at least 1");
    }

    Ok(ServerConfig {
        host: args.host,
        port,
        conversion,
        file_field: args.file_field,
        upload_storage: args.upload_storage.into(),
        upload_dir: args.upload_dir,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
    })
}

async fn run_convert(
    args: ConvertArgs,
    progress: Option<ProgressCallback>,
    backend: Arc<dyn RenderBackend>,
    quiet: bool,
) -> Result<()> {
    let mode: OutputMode = args.output_mode.into();
    let mut builder = ConversionConfig::builder().scale(args.scale).output_mode(mode);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output_path = args.output.unwrap_or_else(|| match mode {
        OutputMode::Archive => PathBuf::from(ARCHIVE_FILENAME),
        OutputMode::InlineArray => PathBuf::from("images.json"),
    });

    let stats = convert_to_file(&args.input, &output_path, &config, backend)
        .await
        .with_context(|| format!("Conversion of {} failed", args.input.display()))?;

    if !quiet {
        eprintln!(
            "{}  {} pages  {} PNG bytes  {}ms  →  {}",
            green("✔"),
            bold(&stats.total_pages.to_string()),
            stats.total_png_bytes,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }
    Ok(())
}
