//! CLI binary for pdf-to-images.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and `ToolParameters`, writes images to disk and
//! prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_to_images::{
    convert_stream, save_image, ConversionConfig, ConversionProgressCallback, FileRef,
    ProgressCallback, ToolMessage, ToolParameters,
};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────
// Colour only when stderr is a terminal; redirected logs stay plain text.

static STDERR_TTY: OnceLock<bool> = OnceLock::new();

fn stderr_is_tty() -> bool {
    *STDERR_TTY.get_or_init(|| io::stderr().is_terminal())
}

fn paint_if(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("\x1b[{code}m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn paint(code: &str, s: &str) -> String {
    paint_if(stderr_is_tty(), code, s)
}

fn green(s: &str) -> String {
    paint("32", s)
}
fn red(s: &str) -> String {
    paint("31", s)
}
fn dim(s: &str) -> String {
    paint("2", s)
}
fn bold(s: &str) -> String {
    paint("1", s)
}
fn cyan(s: &str) -> String {
    paint("36", s)
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. The bar's length grows as each document is
/// opened, since page counts are only known then.
struct CliProgressCallback {
    bar: ProgressBar,
    total_files: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Rendering");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            total_files: AtomicUsize::new(0),
        })
    }

    /// Print a line to stderr above the bar.
    ///
    /// `ProgressBar::println` is a no-op on a hidden draw target, so the
    /// bar is suspended around a plain `eprintln!` instead.
    fn println(&self, line: impl AsRef<str>) {
        self.bar.suspend(|| eprintln!("{}", line.as_ref()));
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_files: usize) {
        self.total_files.store(total_files, Ordering::SeqCst);
    }

    fn on_file_start(&self, file_index: usize, filename: &str) {
        let total = self.total_files.load(Ordering::SeqCst);
        self.bar
            .set_message(dim(&format!("file {file_index}/{total}: {filename}")));
    }

    fn on_file_opened(&self, _file_index: usize, total_pages: usize) {
        self.bar.inc_length(total_pages as u64);
    }

    fn on_page_rendered(&self, _file_index: usize, _page_num: usize, _total_pages: usize, _bytes: usize) {
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_images: usize, failed_files: usize) {
        self.bar.finish_and_clear();
        let total = self.total_files.load(Ordering::SeqCst);
        if total_images == 0 {
            eprintln!("{} no images generated", red("✘"));
        } else if failed_files == 0 {
            eprintln!(
                "{} {} images from {} file(s)",
                green("✔"),
                bold(&total_images.to_string()),
                total
            );
        } else {
            eprintln!(
                "{} {} images  ({}/{} files failed)",
                cyan("⚠"),
                bold(&total_images.to_string()),
                red(&failed_files.to_string()),
                total
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every page at 72 DPI as PNG into the current directory
  pdf2images report.pdf

  # Several files, 150 DPI JPEG, into ./pages
  pdf2images --dpi 150 --format jpeg -o pages a.pdf b.pdf

  # Download a PDF first
  pdf2images https://example.com/slides.pdf

  # Run a host-style request; server-relative paths use the file server
  pdf2images --files-base-url http://files.internal:5001 --request request.json

  # Emit the raw message stream (blobs base64-encoded)
  pdf2images --ndjson report.pdf > messages.ndjson

REQUEST FORMAT (--request):
  {
    "files": [
      { "filename": "a.pdf", "path": "/files/tools/abc.pdf" },
      { "filename": "b.pdf", "url": "https://example.com/b.pdf" },
      { "filename": "c.pdf", "data": "<base64>" }
    ],
    "dpi": 150,
    "image_format": "JPEG"
  }
  The request's own dpi and image_format are used; --dpi and --format
  apply to positional inputs only.

OUTPUT:
  Images:   {output-dir}/{basename}_page_{n}.{png|jpg}
  Messages: stderr
  Summary:  JSON on stdout

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH            pdfium library file or directory
  PDF2IMAGES_FILES_BASE_URL  Base URL for server-relative file paths
  RUST_LOG                   Override log filter (e.g. pdf_to_images=debug)
"#;

/// Render PDF pages to PNG or JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2images",
    version,
    about = "Render every page of PDF files to PNG or JPEG images",
    long_about = "Render every page of one or more PDF documents (local files, URLs, or a \
JSON request with inline/base64 data) to PNG or JPEG images at a chosen DPI.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF paths or HTTP/HTTPS URLs.
    #[arg(conflicts_with = "request", required_unless_present = "request")]
    inputs: Vec<String>,

    /// JSON request document (`-` for stdin).
    #[arg(long, value_name = "FILE")]
    request: Option<String>,

    /// Rendering DPI (1–2400).
    #[arg(long, env = "PDF2IMAGES_DPI", default_value_t = 72)]
    dpi: i64,

    /// Output image format: png or jpeg.
    #[arg(long, env = "PDF2IMAGES_FORMAT", default_value = "png")]
    format: String,

    /// Directory that receives the images.
    #[arg(short, long, env = "PDF2IMAGES_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Base URL for server-relative file paths (`/files/...`).
    #[arg(long, env = "PDF2IMAGES_FILES_BASE_URL")]
    files_base_url: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2IMAGES_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// JPEG quality (1–100).
    #[arg(long, default_value_t = 95)]
    jpeg_quality: u8,

    /// Cap on rendered width or height in pixels.
    #[arg(long, default_value_t = 16_384)]
    max_pixels: u32,

    /// pdfium library file or directory.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Write every message to stdout as one JSON line instead of saving images.
    #[arg(long)]
    ndjson: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the summary.
    #[arg(short, long)]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar and the message lines already say what is happening;
    // library INFO logs would only repeat them.
    let show_progress = progress_enabled(&cli, stderr_is_tty());
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

    // ── Build config and parameters ──────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )?;
    let params = build_params(&cli)?;

    if !cli.ndjson {
        std::fs::create_dir_all(&cli.output_dir).with_context(|| {
            format!("Failed to create output directory {}", cli.output_dir.display())
        })?;
    }

    // ── Consume the message stream ───────────────────────────────────────
    let mut stream = convert_stream(params, &config).await;
    let stdout = io::stdout();
    let mut summary = None;

    while let Some(msg) = stream.next().await {
        if cli.ndjson {
            let line = serde_json::to_string(&msg).context("Failed to serialise message")?;
            let mut handle = stdout.lock();
            writeln!(handle, "{line}").context("Failed to write to stdout")?;
            if let ToolMessage::Json { json } = msg {
                summary = Some(json);
            }
            continue;
        }

        match msg {
            ToolMessage::Text { text } => {
                if cli.quiet {
                    continue;
                }
                let line = if text.starts_with("Error") || text.starts_with("No PDF") {
                    red(&text)
                } else {
                    text
                };
                match progress {
                    Some(ref cb) => cb.println(line),
                    None => eprintln!("{line}"),
                }
            }
            ToolMessage::Blob { data, meta } => {
                let path = save_image(&cli.output_dir, &meta.filename, &data)
                    .await
                    .context("Failed to save image")?;
                if cli.verbose && progress.is_none() {
                    eprintln!("  {} {}", green("✓"), dim(&path.display().to_string()));
                }
            }
            ToolMessage::Json { json } => {
                let pretty =
                    serde_json::to_string_pretty(&json).context("Failed to serialise summary")?;
                let mut handle = stdout.lock();
                writeln!(handle, "{pretty}").context("Failed to write to stdout")?;
                summary = Some(json);
            }
        }
    }

    if let Some(ref cb) = progress {
        cb.bar.finish_and_clear();
    }

    // ── Exit status ──────────────────────────────────────────────────────
    // No summary means the request was rejected; a summary without images
    // means every file failed.
    let succeeded = summary
        .as_ref()
        .and_then(|s| s.get("success"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// The bar is drawn only on an interactive stderr and never alongside
/// `--quiet`, `--no-progress` or `--ndjson`.
fn progress_enabled(cli: &Cli, stderr_tty: bool) -> bool {
    stderr_tty && !cli.quiet && !cli.no_progress && !cli.ndjson
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .download_timeout_secs(cli.download_timeout)
        .jpeg_quality(cli.jpeg_quality)
        .max_rendered_pixels(cli.max_pixels);

    if let Some(ref url) = cli.files_base_url {
        builder = builder.files_base_url(url.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Build the tool parameters from `--request` or the positional inputs.
fn build_params(cli: &Cli) -> Result<ToolParameters> {
    if let Some(ref source) = cli.request {
        let raw = if source == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        } else {
            std::fs::read_to_string(source)
                .with_context(|| format!("Failed to read request from {source}"))?
        };
        let value: serde_json::Value =
            serde_json::from_str(&raw).context("Request is not valid JSON")?;
        return ToolParameters::from_value(value).context("Invalid request");
    }

    Ok(ToolParameters {
        files: Some(cli.inputs.iter().map(|i| FileRef::from_input(i)).collect()),
        dpi: cli.dpi,
        image_format: cli.format.clone(),
    })
}
