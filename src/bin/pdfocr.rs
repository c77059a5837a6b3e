//! CLI binary for edgequake-pdfocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OcrConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfocr::{
    convert, convert_to_file, inspect_with_config, FailurePolicy, InputSource, OcrConfig,
    OcrProgressCallback, PageSelection, ProgressCallback, TesseractEngine,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently being recognised.
    page_started: Mutex<Option<Instant>>,
    /// Problems reported for the current page.
    page_errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_conversion_start`,
    /// once rasterisation has produced the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            page_errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.page_errors.store(0, Ordering::SeqCst);
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.page_errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            let mut short: String = error.chars().take(79).collect();
            short.push('\u{2026}');
            short
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
        ));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let mark = if self.page_errors.load(Ordering::SeqCst) == 0 {
            green("✓")
        } else {
            cyan("⚠")
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            mark,
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{:.1}s", self.page_elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} empty after OCR failure)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a scan into output.txt, page images into ./images
  pdfocr scan.pdf

  # Different output file, no page images
  pdfocr scan.pdf -o notes/scan.txt --no-images

  # English only, sparse text layout
  pdfocr --lang eng --psm 11 receipt.pdf

  # Specific pages
  pdfocr --pages 3-15 book.pdf

  # JSON on stdout: {"texts": [...]} or, with --merge-pages, {"text": "..."}
  pdfocr --json scan.pdf > texts.json
  pdfocr --json --merge-pages scan.pdf > text.json

  # OCR a PDF from a URL
  pdfocr https://example.org/gazette.pdf

  # Inspect PDF metadata and the tesseract install
  pdfocr --inspect-only scan.pdf

OUTPUT FILE FORMAT:
  Image 1 - Full Page:
  <text of page 1>

  Image 2 - Full Page:
  <text of page 2>

  The output file is deleted and regenerated on every run.

ENVIRONMENT VARIABLES:
  PDFOCR_*                Every flag, e.g. PDFOCR_DPI=300, PDFOCR_LANG=eng
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides -v / -q

REQUIREMENTS:
  tesseract with the 'eng' and 'mar' traineddata installed
    Debian/Ubuntu: apt install tesseract-ocr tesseract-ocr-mar
  a pdfium shared library (https://github.com/bblanchon/pdfium-binaries)
"#;

/// OCR scanned PDF documents page by page with tesseract.
#[derive(Parser, Debug)]
#[command(
    name = "pdfocr",
    version,
    about = "OCR scanned PDF documents page by page with tesseract",
    long_about = "Render every page of a PDF at high resolution, clean it up with a fixed \
binarising filter chain, and recognise it with tesseract. Defaults are tuned for printed \
English and Marathi (Devanagari) scans.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Text file to write. Deleted and regenerated on every run.
    #[arg(short, long, env = "PDFOCR_OUTPUT", default_value = "output.txt")]
    output: PathBuf,

    /// Directory for the rendered page images (page_<n>.png).
    #[arg(long, env = "PDFOCR_IMAGES_DIR", default_value = "images")]
    images_dir: PathBuf,

    /// Do not save rendered page images.
    #[arg(long, env = "PDFOCR_NO_IMAGES")]
    no_images: bool,

    /// Rendering DPI (72–1200).
    #[arg(long, env = "PDFOCR_DPI", default_value_t = 600,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: u32,

    /// Tesseract language set, e.g. eng, eng+mar, eng+hin.
    #[arg(long, env = "PDFOCR_LANG", default_value = "eng+mar")]
    lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "PDFOCR_PSM", default_value_t = 6,
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: u8,

    /// Tesseract executable.
    #[arg(long, env = "PDFOCR_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDFOCR_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFOCR_PASSWORD")]
    password: Option<String>,

    /// Print the JSON payload to stdout instead of writing the text file.
    #[arg(long, env = "PDFOCR_JSON")]
    json: bool,

    /// With --json: one merged string instead of one string per page.
    #[arg(long, env = "PDFOCR_MERGE_PAGES")]
    merge_pages: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFOCR_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata and the tesseract version only, no OCR.
    #[arg(long, env = "PDFOCR_INSPECT_ONLY")]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFOCR_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFOCR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the progress bar; keep them for -v or
    // --no-progress runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
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

    let engine = TesseractEngine::new(&cli.tesseract, &cli.lang, cli.psm);
    let tesseract_version = engine.version();
    let input = InputSource::parse(&cli.input);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect_with_config(input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            let report = serde_json::json!({
                "metadata": meta,
                "tesseract": tesseract_version,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
            println!(
                "Tesseract:    {}",
                tesseract_version.as_deref().unwrap_or("not found")
            );
            println!("Languages:    {}", cli.lang);
        }
        return Ok(());
    }

    if tesseract_version.is_none() && !cli.quiet {
        eprintln!(
            "{} could not run '{}'; every page will come out empty",
            cyan("⚠"),
            cli.tesseract.display()
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn OcrProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run OCR ──────────────────────────────────────────────────────────
    if cli.json {
        let output = convert(input, &config).await.context("OCR failed")?;
        let json = serde_json::to_string_pretty(&output.payload(cli.merge_pages))
            .context("Failed to serialise output")?;
        println!("{json}");

        if !cli.quiet && !show_progress {
            eprintln!(
                "Recognised {}/{} pages in {}ms",
                output.report.stats.total_pages - output.report.stats.failed_pages,
                output.report.stats.total_pages,
                output.report.stats.total_duration_ms
            );
        }
    } else {
        let report = convert_to_file(input, &cli.output, &config)
            .await
            .context("OCR failed")?;

        if !cli.quiet {
            let stats = &report.stats;
            eprintln!(
                "{}  {}/{} pages  {}ms  →  {}",
                if stats.failed_pages == 0 && stats.processed_pages == stats.total_pages {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.processed_pages,
                stats.total_pages,
                stats.total_duration_ms,
                bold(&cli.output.display().to_string()),
            );
            if let Some(ref dir) = config.images_dir {
                eprintln!("   page images in {}", dim(&dir.display().to_string()));
            }
            if stats.degraded_pages > 0 {
                eprintln!(
                    "   {} page(s) only partially enhanced",
                    stats.degraded_pages
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = OcrConfig::builder()
        .dpi(cli.dpi)
        .ocr_languages(&cli.lang)
        .psm_mode(cli.psm)
        .tesseract_cmd(&cli.tesseract)
        .merge_pages(cli.merge_pages)
        .pages(pages)
        .sink_failure(FailurePolicy::Continue)
        .download_timeout_secs(cli.download_timeout);

    if !cli.no_images {
        builder = builder.images_dir(&cli.images_dir);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" ALL ").unwrap(), PageSelection::All);
        assert_eq!(parse_pages("5").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(
            parse_pages("1, 3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-3").is_err());
        assert!(parse_pages("1,0").is_err());
        assert!(parse_pages("two").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["pdfocr", "scan.pdf"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("output.txt"));
        assert_eq!(cli.images_dir, PathBuf::from("images"));
        assert_eq!(cli.dpi, 600);
        assert_eq!(cli.lang, "eng+mar");
        assert_eq!(cli.psm, 6);

        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.images_dir, Some(PathBuf::from("images")));
        assert_eq!(config.sink_failure, FailurePolicy::Continue);
    }

    #[test]
    fn cli_rejects_out_of_range_psm() {
        assert!(Cli::try_parse_from(["pdfocr", "--psm", "14", "scan.pdf"]).is_err());
    }

    #[test]
    fn no_images_skips_persisting() {
        let cli = Cli::try_parse_from(["pdfocr", "--no-images", "scan.pdf"]).unwrap();
        assert!(build_config(&cli, None).unwrap().images_dir.is_none());
    }
}
