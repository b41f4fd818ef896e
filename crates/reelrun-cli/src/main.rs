//! ReelRun CLI - generate captioned vertical reels from a topic.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Run the pipeline for one reel config |
//! | `batch` | Run an array of reel configs concurrently |
//! | `timing` | Print the estimated word timing table for a text (offline) |
//! | `settings` | Print or reset the persisted settings |
//!
//! Summaries go to stdout as JSON; logs go to stderr (and optionally a daily
//! log file), so stdout can be piped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use reelrun_lib::core::cache::VisualCache;
use reelrun_lib::core::captions::CaptionClassifier;
use reelrun_lib::core::ffmpeg::{detect_ffmpeg, FFmpegRunner};
use reelrun_lib::core::generative::{
    EdgeTtsVoice, FfmpegComposer, GeminiScriptWriter, NarrationProvider, OpenRouterImageProvider,
};
use reelrun_lib::core::pipeline::{
    BatchRunner, CancellationToken, PipelineOrchestrator, PipelineRun, RunSummary,
};
use reelrun_lib::core::settings::{ReelSettings, SettingsManager};
use reelrun_lib::core::timing::{format_timing_table, ProportionalTimingEstimator};
use reelrun_lib::core::{ReelConfig, Tone};

/// ReelRun CLI - Topic-to-reel generation pipeline
#[derive(Parser)]
#[command(name = "reelrun")]
#[command(about = "Generate captioned vertical reels from a topic", long_about = None)]
struct Cli {
    /// Directory holding settings.json (default: user config dir)
    #[arg(long, global = true, env = "REELRUN_SETTINGS_DIR", value_name = "DIR")]
    settings_dir: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "REELRUN_LOG_DIR", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one reel
    Generate {
        /// Reel config as inline JSON
        #[arg(long, value_name = "JSON", conflicts_with = "config")]
        config_json: Option<String>,

        /// Reel config JSON file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Run an array of reel configs concurrently
    Batch {
        /// JSON file containing an array of reel configs
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Runs in flight at once (default: settings, else CPU count)
        #[arg(long, value_name = "N")]
        max_concurrent: Option<usize>,
    },
    /// Print the estimated word timing table for a text
    Timing {
        /// Narration text
        #[arg(long)]
        text: String,

        /// Voiceover duration in seconds
        #[arg(long)]
        duration: f64,
    },
    /// Print or reset the persisted settings
    Settings {
        /// Delete settings.json and print the defaults
        #[arg(long)]
        reset: bool,
    },
}

/// Flags that replace single fields of the loaded config
#[derive(clap::Args, Default)]
struct ConfigOverrides {
    /// Subject of the reel ("random" lets the writer choose)
    #[arg(long)]
    topic: Option<String>,

    /// Narration tone (humorous, serious, inspiring, casual, energetic)
    #[arg(long)]
    tone: Option<Tone>,

    /// Target duration in seconds
    #[arg(long, value_name = "SECONDS")]
    duration: Option<u32>,

    /// Visual style keyword
    #[arg(long)]
    visual_style: Option<String>,

    /// Visual model alias (flux, sdxl, dall-e-3)
    #[arg(long)]
    visual_model: Option<String>,

    /// Output file name
    #[arg(long)]
    output_name: Option<String>,

    /// Explicit visual prompt
    #[arg(long)]
    visual_prompt: Option<String>,

    /// Explicit synthesis voice
    #[arg(long)]
    voice: Option<String>,
}

impl ConfigOverrides {
    fn apply(self, mut config: ReelConfig) -> ReelConfig {
        if let Some(topic) = self.topic {
            config.topic = topic;
        }
        if let Some(tone) = self.tone {
            config.tone = tone;
        }
        if let Some(duration) = self.duration {
            config.duration_seconds = duration;
        }
        if let Some(style) = self.visual_style {
            config.visual_style = style;
        }
        if let Some(model) = self.visual_model {
            config.visual_model = model;
        }
        if let Some(name) = self.output_name {
            config.output_name = name;
        }
        if self.visual_prompt.is_some() {
            config.visual_prompt = self.visual_prompt;
        }
        if self.voice.is_some() {
            config.voice = self.voice;
        }
        config
    }
}

// =============================================================================
// Logging
// =============================================================================

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn init_logging(log_dir: Option<&Path>) {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions));

    let file_layer = log_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_appender = tracing_appender::rolling::daily(dir, "reelrun.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    // Avoid panics if already initialized.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref());

    let manager = match cli.settings_dir {
        Some(dir) => SettingsManager::new(dir),
        None => SettingsManager::user_default()?,
    };

    match cli.command {
        Commands::Generate {
            config_json,
            config,
            overrides,
        } => {
            let config = overrides.apply(load_config(config_json, config)?);
            if let Err(e) = config.validate() {
                warn!("Rejected reel config: {}", e);
                print_json(&RunSummary::rejected(&e))?;
                std::process::exit(1);
            }

            let settings = manager.load();
            let orchestrator = build_orchestrator(&settings)?;
            let cancel = cancel_on_ctrl_c();

            let run = orchestrator.run(&config, &cancel).await;
            print_json(&run.summary())?;
            if run.is_failed() {
                std::process::exit(1);
            }
        }
        Commands::Batch {
            file,
            max_concurrent,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let configs: Vec<ReelConfig> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config array in {}", file.display()))?;
            if configs.is_empty() {
                bail!("{} contains no configs", file.display());
            }

            let settings = manager.load();
            let orchestrator = Arc::new(build_orchestrator(&settings)?);
            let mut runner = BatchRunner::new(orchestrator);
            let limit = max_concurrent
                .or(match settings.output.max_concurrent_runs {
                    0 => None,
                    n => Some(n as usize),
                });
            if let Some(limit) = limit {
                runner = runner.with_max_concurrent(limit);
            }

            let cancel = cancel_on_ctrl_c();
            let runs = runner.run_all(&configs, &cancel).await?;
            let summaries: Vec<RunSummary> = runs.iter().map(PipelineRun::summary).collect();
            print_json(&summaries)?;
            if runs.iter().any(PipelineRun::is_failed) {
                std::process::exit(1);
            }
        }
        Commands::Timing { text, duration } => {
            let settings = manager.load();
            let timings = ProportionalTimingEstimator::with_weights(settings.timing)
                .estimate(&text, duration)?;
            print!("{}", format_timing_table(&timings));
        }
        Commands::Settings { reset } => {
            let settings = if reset {
                manager.reset()?
            } else {
                manager.load()
            };
            print_json(&settings)?;
        }
    }

    Ok(())
}

fn load_config(config_json: Option<String>, config_file: Option<PathBuf>) -> Result<ReelConfig> {
    let json = match (config_json, config_file) {
        (Some(json), _) => json,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => return Ok(ReelConfig::default()),
    };
    serde_json::from_str(&json).context("Invalid reel config JSON")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancels between stages on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current stage");
            token.cancel();
        }
    });
    cancel
}

// =============================================================================
// Provider Assembly
// =============================================================================

fn build_orchestrator(settings: &ReelSettings) -> Result<PipelineOrchestrator> {
    let providers = &settings.providers;
    let timeouts = settings.timeouts.to_pipeline_timeouts();
    let render = settings.output.render.clone();

    let ffmpeg = detect_ffmpeg(providers.ffmpeg_dir.as_deref())
        .context("FFmpeg is required to compose reels")?;
    info!("Using FFmpeg {} at {}", ffmpeg.version, ffmpeg.ffmpeg_path.display());
    let runner = FFmpegRunner::new(ffmpeg);

    let gemini_key = providers.resolve_gemini_api_key().context(
        "No Gemini API key: set GEMINI_API_KEY or providers.geminiApiKey in settings.json",
    )?;
    let writer = GeminiScriptWriter::new(gemini_key, timeouts.script_voice)?
        .with_base_url(providers.gemini_base_url.clone())
        .with_model(providers.gemini_model.clone());
    let voice = EdgeTtsVoice::new(providers.edge_tts_binary.clone());
    let script_provider = NarrationProvider::new(Arc::new(writer), Arc::new(voice))?
        .with_duration_probe(runner.clone());

    let openrouter_key = providers.resolve_openrouter_api_key();
    if openrouter_key.is_none() {
        warn!("No OpenRouter API key; every reel will use a placeholder visual");
    }
    let visual_provider =
        OpenRouterImageProvider::new(openrouter_key, runner.clone(), render.clone(), timeouts.visual)?
            .with_endpoint(providers.openrouter_endpoint.clone());

    let composer = FfmpegComposer::new(runner, render).with_captions(
        settings.captions.palette.clone(),
        settings.captions.style.clone(),
    );

    let mut builder = PipelineOrchestrator::builder(
        Arc::new(script_provider),
        Arc::new(visual_provider),
        Arc::new(composer),
    )
    .aligner(Arc::new(ProportionalTimingEstimator::with_weights(
        settings.timing,
    )))
    .classifier(CaptionClassifier::new(settings.word_lists()))
    .voices(settings.voices.clone())
    .timeouts(timeouts)
    .work_root(settings.output.work_dir.clone())
    .output_dir(settings.output.output_dir.clone());

    if settings.cache.enabled {
        builder = builder.cache(VisualCache::new());
    }

    Ok(builder.build())
}
