//! CLI entry point for the segmentation engine.
//!
//! Commands mirror the engine operations: train on a candidate extract,
//! assign candidates to segments, evaluate and interpret a stored version.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use segmenta::display::{self, THEME};
use segmenta::interpretation::TemplateNamer;
use segmenta::io::{ExitCode, JsonResponse, OutputFormat, ResponseMeta};
use segmenta::record::{CandidateRecord, CandidateSource, JsonFileSource};
use segmenta::{SegmentError, SegmentResult, SegmentationEngine, Settings, VersionId};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Audience segmentation engine
#[derive(Parser)]
#[command(
    name = "segmenta",
    version = env!("CARGO_PKG_VERSION"),
    about = "Audience segmentation engine",
    long_about = "Encode candidate profiles, train k-means segments and assign candidates to them.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ segmenta init\n  $ segmenta train --input candidates.json\n  $ segmenta assign --input new_candidates.jsonl\n  $ segmenta interpret"
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Registry directory (overrides registry_path)
    #[arg(long, global = true, env = "SEGMENTA_REGISTRY")]
    registry: Option<PathBuf>,

    /// Show informational logs
    #[arg(long, global = true)]
    info: bool,

    /// Show debug logs
    #[arg(long, global = true)]
    debug: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Write a commented .segmenta/settings.toml
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display the active settings
    Config,

    /// Fit the encoder and segments on a candidate extract
    #[command(after_help = "Examples:\n  segmenta train --input candidates.json\n  segmenta train --input candidates.jsonl --k 4")]
    Train {
        /// JSON array or JSON-lines file of candidate records
        #[arg(short, long)]
        input: PathBuf,

        /// Number of segments (chosen automatically when omitted)
        #[arg(short, long)]
        k: Option<usize>,

        /// Fit candidate k values one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Assign candidates to segments of a stored version
    Assign {
        #[arg(short, long)]
        input: PathBuf,

        /// Version id (latest when omitted)
        #[arg(long)]
        version: Option<VersionId>,
    },

    /// Report partition quality of a stored version
    Evaluate {
        #[arg(long)]
        version: Option<VersionId>,

        /// Evaluate this sample instead of the stored training vectors
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Describe what distinguishes each segment
    Interpret {
        #[arg(long)]
        version: Option<VersionId>,

        /// Descriptors per segment (overrides interpretation.top_n)
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Assign candidates and list named segments with their members
    Segments {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        version: Option<VersionId>,

        /// Name template; placeholders {id}, {count}, {percent}, {descriptors}
        #[arg(long)]
        template: Option<String>,
    },

    /// List committed model versions
    Versions,
}

fn init_logging(cli: &Cli, settings: &Settings) {
    let level = if cli.debug || settings.debug {
        Level::DEBUG
    } else if cli.info {
        Level::INFO
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Settings::load()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("loading configuration")?,
    };
    if let Some(registry) = &cli.registry {
        settings.registry_path = registry.clone();
    }
    if let Commands::Train {
        sequential: true, ..
    } = cli.command
    {
        settings.training.parallel_sweep = false;
    }
    Ok(settings)
}

fn main() {
    let cli = Cli::parse();
    let format = OutputFormat::from_json_flag(cli.json);

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
            std::process::exit(ExitCode::ConfigError.into());
        }
    };
    init_logging(&cli, &settings);

    let code = match run(&cli, settings, format) {
        Ok(()) => ExitCode::Success,
        Err(error) => report_error(&error, format),
    };
    std::process::exit(code.into());
}

fn report_error(error: &SegmentError, format: OutputFormat) -> ExitCode {
    let code = ExitCode::from_error(error);
    if format.is_json() {
        let response = JsonResponse::from_error(error);
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("{error}"),
        }
    } else {
        eprintln!("{}", THEME.error_with_icon(&error.to_string()));
        for suggestion in error.recovery_suggestions() {
            eprintln!("  {}", THEME.apply(&THEME.dim, format!("hint: {suggestion}")));
        }
    }
    code
}

/// Prints `data` as a JSON envelope or as the text produced by `text`.
fn emit<T: Serialize>(
    format: OutputFormat,
    started: Instant,
    version: Option<&VersionId>,
    data: &T,
    text: impl FnOnce() -> String,
) -> SegmentResult<()> {
    if format.is_json() {
        let mut meta = ResponseMeta::now(started.elapsed().as_millis() as u64);
        if let Some(version) = version {
            meta = meta.with_model_version(version);
        }
        let response = JsonResponse::success(data).with_meta(meta);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn read_records(path: &Path) -> SegmentResult<Vec<CandidateRecord>> {
    let records = JsonFileSource::new(path).candidates()?;
    tracing::info!(path = %path.display(), records = records.len(), "read candidate records");
    Ok(records)
}

#[derive(Serialize)]
struct TrainOutput {
    version: VersionId,
    k: usize,
    records: usize,
    inertia: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    selection: Option<segmenta::clustering::KSelection>,
}

#[derive(Serialize)]
struct ConfigOutput<'a> {
    settings: &'a Settings,
}

fn run(cli: &Cli, settings: Settings, format: OutputFormat) -> SegmentResult<()> {
    let started = Instant::now();

    match &cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(*force).map_err(|e| SegmentError::Config {
                reason: e.to_string(),
            })?;
            let path_text = path.display().to_string();
            emit(format, started, None, &path_text, || {
                format!(
                    "{}\nEdit this file to customize your settings.",
                    THEME.success_with_icon(&format!("Created configuration file at: {path_text}"))
                )
            })
        }

        Commands::Config => {
            let toml = toml::to_string_pretty(&settings).map_err(|e| SegmentError::Config {
                reason: e.to_string(),
            })?;
            emit(format, started, None, &ConfigOutput { settings: &settings }, || {
                format!(
                    "{}\n{}\n{toml}",
                    THEME.apply(&THEME.header, "Current Configuration:"),
                    "=".repeat(50)
                )
            })
        }

        Commands::Train { input, k, .. } => {
            let records = read_records(input)?;
            let engine = SegmentationEngine::new(settings)?;
            let version = display::with_spinner(
                &format!("Training on {} records", records.len()),
                !format.is_json(),
                || engine.train(&records, *k),
            )?;
            let loaded = engine.registry().load(Some(&version))?;

            let output = TrainOutput {
                version: version.clone(),
                k: loaded.model.k,
                records: records.len(),
                inertia: loaded.model.inertia,
                selection: loaded.model.selection.clone(),
            };
            emit(format, started, Some(&version), &output, || {
                let mut text = THEME.success_with_icon(&format!(
                    "Trained {} segments on {} records",
                    output.k, output.records
                ));
                text.push_str(&format!(
                    "\nVersion: {}\nRegistry: {}",
                    THEME.apply(&THEME.id, &version),
                    THEME.apply(&THEME.path, engine.registry().base_path().display())
                ));
                if let Some(selection) = &output.selection {
                    text.push('\n');
                    text.push_str(&display::create_sweep_table(selection));
                }
                text
            })
        }

        Commands::Assign { input, version } => {
            let records = read_records(input)?;
            let engine = SegmentationEngine::new(settings)?;
            let assignments = engine.assign(&records, version.as_ref())?;
            emit(format, started, version.as_ref(), &assignments, || {
                display::create_assignment_table(&assignments)
            })
        }

        Commands::Evaluate { version, input } => {
            let engine = SegmentationEngine::new(settings)?;
            let report = match input {
                Some(path) => engine.evaluate_sample(&read_records(path)?, version.as_ref())?,
                None => engine.evaluate(version.as_ref())?,
            };
            emit(format, started, version.as_ref(), &report, || {
                display::create_evaluation_table(&report)
            })
        }

        Commands::Interpret { version, top_n } => {
            let engine = SegmentationEngine::new(settings)?;
            let summaries = engine.interpret(version.as_ref(), *top_n)?;
            let rows: Vec<_> = summaries.values().collect();
            emit(format, started, version.as_ref(), &rows, || {
                display::create_summary_table(&summaries)
            })
        }

        Commands::Segments {
            input,
            version,
            template,
        } => {
            let records = read_records(input)?;
            let engine = SegmentationEngine::new(settings)?;
            let namer = template
                .as_ref()
                .map_or_else(TemplateNamer::default, |t| TemplateNamer::new(t.as_str()));
            let segments = engine.segments(&records, version.as_ref(), &namer)?;
            emit(format, started, version.as_ref(), &segments, || {
                display::create_segment_table(&segments)
            })
        }

        Commands::Versions => {
            let engine = SegmentationEngine::new(settings)?;
            let manifests = engine.versions()?;
            let latest = if manifests.is_empty() {
                None
            } else {
                Some(engine.latest()?)
            };
            emit(format, started, latest.as_ref(), &manifests, || {
                if manifests.is_empty() {
                    THEME.warning_with_icon("No versions committed yet")
                } else {
                    display::create_versions_table(&manifests, latest.as_ref().map(VersionId::as_str))
                }
            })
        }
    }
}
