//! Extract command - OCR every page of one or more PDF files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use pagescan_core::aggregate::package_with_prefix;
use pagescan_core::{
    run_extraction, Document, ExecutionMode, ExtractionConfig, ExtractionResult, LanguageSet,
    PageError, PagescanConfig, PdfDocument, Preset, Profile, RunState, RunStats,
    TesseractRecognizer,
};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Quality preset (speed, balanced, accuracy)
    #[arg(short, long)]
    preset: Option<Preset>,

    /// Rendering resolution, overrides the preset
    #[arg(long)]
    dpi: Option<u32>,

    /// Recognition languages joined by '+' (e.g. "rus+eng")
    #[arg(short, long)]
    lang: Option<LanguageSet>,

    /// Recognition profile (fast, accurate), overrides the preset
    #[arg(long)]
    profile: Option<Profile>,

    /// Process pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Maximum number of concurrent page workers
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Output file, or directory when several inputs are given (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also export pages as a zip archive (timestamped name if no path is given)
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    archive: Option<Option<PathBuf>>,

    /// Write a per-file summary CSV
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Continue with the next file when one cannot be opened
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Page-delimited full text
    Text,
    /// JSON report with per-page results
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

/// JSON output for one file.
#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    state: RunState,
    page_count: usize,
    failed_pages: usize,
    elapsed_secs: f64,
    pages: Vec<PageReport<'a>>,
}

#[derive(Serialize)]
struct PageReport<'a> {
    page: usize,
    text: &'a str,
    error: Option<&'a PageError>,
}

/// Summary row for one input file.
struct FileSummary {
    path: PathBuf,
    result: Result<RunStats, String>,
    state: Option<RunState>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let extraction = extraction_config(&args, &config.extraction)?;

    let files = resolve_inputs(&args.inputs)?;
    let multiple = files.len() > 1;

    let recognizer = TesseractRecognizer::from_config(&config.engine).map_err(|e| {
        anyhow::anyhow!("{}.\n\nRun 'pagescan engine' to check the installation.", e)
    })?;

    info!(
        "Extracting {} files at {} dpi ({}, {}, {})",
        files.len(),
        extraction.dpi,
        extraction.languages,
        extraction.profile,
        extraction.mode
    );

    if multiple {
        eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());
        if let Some(output_dir) = &args.output {
            fs::create_dir_all(output_dir)?;
        }
    }

    let mut stats = RunStats::default();
    let mut summaries = Vec::with_capacity(files.len());

    for path in &files {
        match process_file(path, &recognizer, &extraction).await {
            Ok(result) => {
                stats.record(&result);
                report_failed_pages(&result);
                write_output(&args, path, &result, multiple)?;
                if let Some(archive) = &args.archive {
                    write_archive(archive.as_deref(), path, &result, &config, multiple)?;
                }
                summaries.push(FileSummary {
                    path: path.clone(),
                    result: Ok(RunStats::from_result(&result)),
                    state: Some(result.state()),
                });
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to process {}: {}", path.display(), e);
                eprintln!("{} {}: {}", style("✗").red(), path.display(), e);
                summaries.push(FileSummary {
                    path: path.clone(),
                    result: Err(e.to_string()),
                    state: None,
                });
            }
            Err(e) => anyhow::bail!("Processing {} failed: {}", path.display(), e),
        }
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &summaries)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_stats(&stats, summaries.len());
    debug!("Total command time: {:?}", start.elapsed());

    Ok(())
}

/// Apply command line overrides on top of the configured extraction settings.
fn extraction_config(
    args: &ExtractArgs,
    base: &ExtractionConfig,
) -> anyhow::Result<ExtractionConfig> {
    let mut config = base.clone();

    if let Some(preset) = args.preset {
        preset.apply(&mut config);
    }
    if let Some(dpi) = args.dpi {
        config.dpi = dpi;
    }
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    if let Some(languages) = &args.lang {
        config.languages = languages.clone();
    }
    if args.sequential {
        config.mode = ExecutionMode::Sequential;
    }
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }

    config.validate()?;
    Ok(config)
}

/// Expand inputs into PDF paths. Existing files are taken as given, anything
/// else is treated as a glob pattern.
fn resolve_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }

        for entry in glob(input)? {
            match entry {
                Ok(p) if is_pdf(&p) => files.push(p),
                Ok(p) => debug!("Skipping non-PDF {}", p.display()),
                Err(e) => warn!("Cannot read {}: {}", e.path().display(), e),
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|p| seen.insert(p.clone()));

    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for: {}", inputs.join(" "));
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Rough wall time of a run, shown before processing starts.
fn estimated_seconds(pages: usize, dpi: u32) -> u64 {
    let per_page = match dpi {
        0..=200 => 5,
        201..=250 => 7,
        _ => 10,
    };
    pages as u64 * per_page
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

async fn process_file(
    path: &Path,
    recognizer: &TesseractRecognizer,
    config: &ExtractionConfig,
) -> anyhow::Result<ExtractionResult> {
    let document = PdfDocument::open_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot open {}: {}", path.display(), e))?;

    let pages = document.page_count();
    eprintln!(
        "{} {}: {} pages, estimated {}",
        style("ℹ").blue(),
        path.display(),
        pages,
        format_duration(Duration::from_secs(estimated_seconds(pages, config.dpi)))
    );

    let pb = ProgressBar::new(pages as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {}", e))?
            .progress_chars("=>-"),
    );

    let recognizer = recognizer.clone();
    let config = config.clone();
    let bar = pb.clone();
    let result = tokio::task::spawn_blocking(move || {
        run_extraction(document, recognizer, &config, |completed, _total| {
            bar.set_position(completed as u64)
        })
    })
    .await?;

    pb.finish_and_clear();
    Ok(result)
}

fn report_failed_pages(result: &ExtractionResult) {
    for outcome in result.failed_pages() {
        if let Some(error) = &outcome.error {
            eprintln!(
                "  {} page {}: {}",
                style("⚠").yellow(),
                outcome.page_number(),
                error
            );
        }
    }
}

fn file_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
}

fn render(path: &Path, result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(result.full_text.clone()),
        OutputFormat::Json => {
            let report = FileReport {
                file: path.display().to_string(),
                state: result.state(),
                page_count: result.page_count,
                failed_pages: result.failed_count(),
                elapsed_secs: result.elapsed.as_secs_f64(),
                pages: result
                    .outcomes
                    .iter()
                    .map(|o| PageReport {
                        page: o.page_number(),
                        text: &o.text,
                        error: o.error.as_ref(),
                    })
                    .collect(),
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

fn write_output(
    args: &ExtractArgs,
    path: &Path,
    result: &ExtractionResult,
    multiple: bool,
) -> anyhow::Result<()> {
    let content = render(path, result, args.format)?;

    let Some(output) = &args.output else {
        println!("{}", content);
        return Ok(());
    };

    let target = if multiple || output.is_dir() {
        output.join(format!("{}.{}", file_stem(path), args.format.extension()))
    } else {
        output.clone()
    };

    fs::write(&target, content)?;
    eprintln!(
        "{} Output written to {}",
        style("✓").green(),
        target.display()
    );
    Ok(())
}

fn write_archive(
    requested: Option<&Path>,
    path: &Path,
    result: &ExtractionResult,
    config: &PagescanConfig,
    multiple: bool,
) -> anyhow::Result<()> {
    let default_name = || {
        format!(
            "{}_pages_{}.zip",
            file_stem(path),
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )
    };

    let target = match requested {
        None => PathBuf::from(default_name()),
        Some(dir) if multiple || dir.is_dir() => {
            fs::create_dir_all(dir)?;
            dir.join(format!("{}_pages.zip", file_stem(path)))
        }
        Some(file) => file.to_path_buf(),
    };

    let bytes = package_with_prefix(
        &result.ordered_page_texts,
        &config.output.archive_entry_prefix,
    )?;
    fs::write(&target, bytes)?;

    eprintln!(
        "{} Pages archived to {}",
        style("✓").green(),
        target.display()
    );
    Ok(())
}

fn write_summary(path: &Path, summaries: &[FileSummary]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "pages",
        "failed_pages",
        "processing_time_s",
        "error",
    ])?;

    for summary in summaries {
        let filename = summary
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &summary.result {
            Ok(stats) => {
                let status = match summary.state {
                    Some(RunState::CompletedWithErrors) => "completed_with_errors",
                    _ => "completed",
                };
                wtr.write_record([
                    filename,
                    status,
                    &stats.pages_processed.to_string(),
                    &stats.failed_pages.to_string(),
                    &format!("{:.2}", stats.last_duration.as_secs_f64()),
                    "",
                ])?;
            }
            Err(error) => {
                wtr.write_record([filename, "error", "", "", "", error.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

fn print_stats(stats: &RunStats, attempted: usize) {
    eprintln!();
    eprintln!(
        "{} Processed {} of {} files, {} pages in {}",
        style("✓").green(),
        stats.files_processed,
        attempted,
        stats.pages_processed,
        format_duration(stats.total_duration)
    );
    eprintln!(
        "   {} pages recognized, {} failed",
        style(stats.pages_processed - stats.failed_pages).green(),
        style(stats.failed_pages).red()
    );
}
