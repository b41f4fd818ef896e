//! Settings Persistence System
//!
//! Provides persistent pipeline settings with:
//! - Atomic file writes (temp file + rename)
//! - Schema validation with defaults
//! - Migration support for schema changes
//!
//! Storage location: {config_dir}/reelrun/settings.json

use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::captions::{CaptionPalette, CaptionStyle, CaptionWordLists};
use crate::core::ffmpeg::ReelRenderSettings;
use crate::core::fs::atomic_write_json_pretty;
use crate::core::pipeline::PipelineTimeouts;
use crate::core::script::VoiceMap;
use crate::core::timing::TimingWeights;
use crate::core::{CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Lock file name (advisory lock to prevent concurrent writers)
pub const SETTINGS_LOCK_FILE: &str = "settings.json.lock";

/// Environment variable consulted when no Gemini key is stored
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable consulted when no OpenRouter key is stored
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReelSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Caption colors, word lists and layout
    #[serde(default)]
    pub captions: CaptionSettings,

    /// Voice per tone
    #[serde(default)]
    pub voices: VoiceMap,

    /// Word timing estimation
    #[serde(default)]
    pub timing: TimingWeights,

    /// Per-call time limits
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    /// External service configuration
    #[serde(default)]
    pub providers: ProviderSettings,

    /// Directories and encoding
    #[serde(default)]
    pub output: OutputSettings,

    /// Visual cache
    #[serde(default)]
    pub cache: CacheSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for ReelSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            captions: CaptionSettings::default(),
            voices: VoiceMap::default(),
            timing: TimingWeights::default(),
            timeouts: TimeoutSettings::default(),
            providers: ProviderSettings::default(),
            output: OutputSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl ReelSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    ///
    /// Bad values are corrected instead of rejected, so an old or hand-edited
    /// file never blocks a run.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        self.captions.style.normalize();
        for list in [
            &mut self.captions.words.warning,
            &mut self.captions.words.highlight,
        ] {
            list.retain(|w| !w.trim().is_empty());
        }

        if !self.timing.char_overhead.is_finite() || self.timing.char_overhead <= 0.0 {
            self.timing.char_overhead = TimingWeights::default().char_overhead;
        }
        if !self.timing.punctuation_pause.is_finite() || self.timing.punctuation_pause < 0.0 {
            self.timing.punctuation_pause = 0.0;
        }

        self.timeouts.script_voice_secs = self.timeouts.script_voice_secs.clamp(5, 3600);
        self.timeouts.visual_secs = self.timeouts.visual_secs.clamp(5, 3600);
        self.timeouts.alignment_secs = self.timeouts.alignment_secs.clamp(1, 3600);
        self.timeouts.compose_secs = self.timeouts.compose_secs.clamp(10, 7200);

        if self.providers.gemini_model.trim().is_empty() {
            self.providers.gemini_model = default_gemini_model();
        }
        if self.providers.gemini_base_url.trim().is_empty() {
            self.providers.gemini_base_url = default_gemini_base_url();
        }
        if self.providers.openrouter_endpoint.trim().is_empty() {
            self.providers.openrouter_endpoint = default_openrouter_endpoint();
        }
        if self.providers.edge_tts_binary.as_os_str().is_empty() {
            self.providers.edge_tts_binary = default_edge_tts_binary();
        }

        let render = &mut self.output.render;
        let render_defaults = ReelRenderSettings::default();
        if render.width == 0 || render.height == 0 {
            render.width = render_defaults.width;
            render.height = render_defaults.height;
        }
        // Even dimensions for yuv420p.
        render.width = (render.width.clamp(2, 4096) / 2) * 2;
        render.height = (render.height.clamp(2, 4096) / 2) * 2;
        render.fps = render.fps.clamp(1, 120);
        render.crf = render.crf.map(|crf| crf.min(51));
        self.output.max_concurrent_runs = self.output.max_concurrent_runs.min(64);
    }

    /// Caption words as the classifier expects them
    pub fn word_lists(&self) -> &CaptionWordLists {
        &self.captions.words
    }
}

/// Caption settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSettings {
    #[serde(default)]
    pub words: CaptionWordLists,
    #[serde(default)]
    pub palette: CaptionPalette,
    #[serde(default)]
    pub style: CaptionStyle,
}

/// Time limits for external calls, in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutSettings {
    pub script_voice_secs: u64,
    pub visual_secs: u64,
    pub alignment_secs: u64,
    /// Final composition and placeholder rendering
    pub compose_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        let defaults = PipelineTimeouts::default();
        Self {
            script_voice_secs: defaults.script_voice.as_secs(),
            visual_secs: defaults.visual.as_secs(),
            alignment_secs: defaults.alignment.as_secs(),
            compose_secs: defaults.compose.as_secs(),
        }
    }
}

impl TimeoutSettings {
    pub fn to_pipeline_timeouts(&self) -> PipelineTimeouts {
        PipelineTimeouts {
            script_voice: Duration::from_secs(self.script_voice_secs),
            visual: Duration::from_secs(self.visual_secs),
            alignment: Duration::from_secs(self.alignment_secs),
            compose: Duration::from_secs(self.compose_secs),
        }
    }
}

/// External service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Gemini API key (falls back to `GEMINI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// OpenRouter API key (falls back to `OPENROUTER_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,

    #[serde(default = "default_openrouter_endpoint")]
    pub openrouter_endpoint: String,

    /// `edge-tts` executable
    #[serde(default = "default_edge_tts_binary")]
    pub edge_tts_binary: PathBuf,

    /// Directory holding `ffmpeg` and `ffprobe`; PATH when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_dir: Option<PathBuf>,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_openrouter_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_edge_tts_binary() -> PathBuf {
    PathBuf::from("edge-tts")
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: default_gemini_base_url(),
            gemini_model: default_gemini_model(),
            openrouter_api_key: None,
            openrouter_endpoint: default_openrouter_endpoint(),
            edge_tts_binary: default_edge_tts_binary(),
            ffmpeg_dir: None,
        }
    }
}

impl ProviderSettings {
    /// Stored Gemini key, else the environment
    pub fn resolve_gemini_api_key(&self) -> Option<String> {
        resolve_key(self.gemini_api_key.as_deref(), GEMINI_API_KEY_ENV)
    }

    /// Stored OpenRouter key, else the environment
    pub fn resolve_openrouter_api_key(&self) -> Option<String> {
        resolve_key(self.openrouter_api_key.as_deref(), OPENROUTER_API_KEY_ENV)
    }
}

fn resolve_key(stored: Option<&str>, env_var: &str) -> Option<String> {
    stored
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        })
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    /// Parent of per-run working directories
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Where composed reels are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Encoding of every rendered video
    #[serde(default)]
    pub render: ReelRenderSettings,

    /// Concurrent runs in a batch (0 = one per CPU)
    #[serde(default)]
    pub max_concurrent_runs: u32,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("output").join("work")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            output_dir: default_output_dir(),
            render: ReelRenderSettings::default(),
            max_concurrent_runs: 0,
        }
    }
}

/// Visual cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    /// Reuse visuals across runs with the same prompt, style and model
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a new settings manager storing its file in `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
        }
    }

    /// Manager for the per-user config directory
    pub fn user_default() -> CoreResult<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            CoreError::NotFound("No configuration directory for this user".to_string())
        })?;
        Ok(Self::new(dir.join("reelrun")))
    }

    fn lock_path(&self) -> PathBuf {
        self.settings_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(SETTINGS_LOCK_FILE)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        // Ensure parent directory exists so the lock file can be created.
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file)?;
        } else {
            fs2::FileExt::lock_shared(&lock_file)?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if the file is missing or
    /// unreadable
    pub fn load(&self) -> ReelSettings {
        let result = self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(ReelSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path)?;
            let mut settings = serde_json::from_str::<ReelSettings>(&content)?;

            if settings.version < SETTINGS_VERSION {
                info!(
                    "Migrating settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
                settings.version = SETTINGS_VERSION;
            }

            settings.normalize();
            Ok(settings)
        });

        match result {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                ReelSettings::default()
            }
        }
    }

    /// Save normalized settings atomically and return what was written
    pub fn save(&self, settings: &ReelSettings) -> CoreResult<ReelSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();
            atomic_write_json_pretty(&self.settings_path, &normalized)?;
            info!("Settings saved to {}", self.settings_path.display());
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<ReelSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                fs::remove_file(&self.settings_path)?;
                info!("Settings file deleted");
            }
            Ok(ReelSettings::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tone;
    use tempfile::TempDir;

    // ============================================================
    // Defaults & Serialization
    // ============================================================

    #[test]
    fn test_default_settings() {
        let settings = ReelSettings::default();
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.timeouts.visual_secs, 300);
        assert_eq!(settings.providers.gemini_model, "gemini-2.5-flash");
        assert_eq!(settings.output.render.fps, 24);
        assert!(settings.cache.enabled);
        assert_eq!(
            settings.voices.for_tone(Tone::Humorous).voice,
            "en-US-GuyNeural"
        );
    }

    #[test]
    fn test_settings_json_is_camel_case() {
        let json = serde_json::to_value(ReelSettings::default()).unwrap();
        assert_eq!(json["timeouts"]["scriptVoiceSecs"], 180);
        assert_eq!(json["output"]["maxConcurrentRuns"], 0);
        assert_eq!(json["captions"]["palette"]["number"], "#4CFF00");
        assert!(json["providers"].get("geminiApiKey").is_none());
    }

    #[test]
    fn test_timeouts_convert_to_durations() {
        let timeouts = TimeoutSettings {
            script_voice_secs: 10,
            visual_secs: 20,
            alignment_secs: 3,
            compose_secs: 40,
        }
        .to_pipeline_timeouts();
        assert_eq!(timeouts.visual, Duration::from_secs(20));
        assert_eq!(timeouts.compose, Duration::from_secs(40));
    }

    #[test]
    fn test_stored_key_wins_over_environment() {
        let providers = ProviderSettings {
            gemini_api_key: Some(" stored ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            providers.resolve_gemini_api_key().as_deref(),
            Some("stored")
        );
        assert_eq!(
            resolve_key(Some("  "), "REELRUN_TEST_UNSET_VARIABLE"),
            None
        );
    }

    // ============================================================
    // Normalization
    // ============================================================

    #[test]
    fn test_normalization_clamps_values() {
        let mut settings = ReelSettings::default();
        settings.timeouts.visual_secs = 0;
        settings.timeouts.compose_secs = 1_000_000;
        settings.output.render.width = 721;
        settings.output.render.fps = 0;
        settings.output.render.crf = Some(99);
        settings.providers.gemini_model = " ".to_string();
        settings.captions.words.warning = vec!["danger".to_string(), "".to_string()];
        settings.timing.char_overhead = f64::NAN;

        settings.normalize();

        assert_eq!(settings.timeouts.visual_secs, 5);
        assert_eq!(settings.timeouts.compose_secs, 7200);
        assert_eq!(settings.output.render.width, 720);
        assert_eq!(settings.output.render.fps, 1);
        assert_eq!(settings.output.render.crf, Some(51));
        assert_eq!(settings.providers.gemini_model, "gemini-2.5-flash");
        assert_eq!(settings.captions.words.warning, vec!["danger".to_string()]);
        assert_eq!(settings.timing.char_overhead, 2.0);
    }

    // ============================================================
    // Manager
    // ============================================================

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        assert_eq!(manager.load(), ReelSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        let mut settings = ReelSettings::default();
        settings.captions.words.highlight = vec!["stunning".to_string()];
        settings.output.output_dir = PathBuf::from("/tmp/reels");
        settings.cache.enabled = false;

        manager.save(&settings).unwrap();
        let loaded = manager.load();

        assert_eq!(loaded.captions.words.highlight, vec!["stunning".to_string()]);
        assert_eq!(loaded.output.output_dir, PathBuf::from("/tmp/reels"));
        assert!(!loaded.cache.enabled);
    }

    #[test]
    fn test_reset_deletes_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        manager.save(&ReelSettings::default()).unwrap();
        assert!(manager.settings_path().exists());

        let reset_settings = manager.reset().unwrap();
        assert!(!manager.settings_path().exists());
        assert_eq!(reset_settings, ReelSettings::default());
    }

    #[test]
    fn test_invalid_json_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(SETTINGS_FILE), "invalid json {{{").unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        assert_eq!(manager.load(), ReelSettings::default());
    }

    #[test]
    fn test_partial_json_uses_defaults_for_missing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(SETTINGS_FILE),
            r#"{"version": 0, "timeouts": {"visualSecs": 42}}"#,
        )
        .unwrap();

        let manager = SettingsManager::new(temp_dir.path().to_path_buf());
        let settings = manager.load();

        assert_eq!(settings.version, SETTINGS_VERSION);
        assert_eq!(settings.timeouts.visual_secs, 42);
        assert_eq!(settings.timeouts.compose_secs, 600);
        assert_eq!(settings.captions, CaptionSettings::default());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path().to_path_buf());

        manager.save(&ReelSettings::default()).unwrap();
        manager.save(&ReelSettings::default()).unwrap();

        assert!(manager.settings_path().exists());
        assert!(!temp_dir.path().join("settings.json.tmp").exists());
        assert!(!temp_dir.path().join("settings.json.bak").exists());
    }

    #[test]
    fn test_concurrent_read_write() {
        use std::sync::Arc;
        use std::thread;

        let temp_dir = TempDir::new().unwrap();
        let manager = Arc::new(SettingsManager::new(temp_dir.path().to_path_buf()));
        manager.save(&ReelSettings::default()).unwrap();

        let mut handles = vec![];
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    let _ = manager.load();
                }
            }));
        }
        for i in 0..3u64 {
            let manager = Arc::clone(&manager);
            handles.push(thread::spawn(move || {
                for j in 0..5u64 {
                    let mut settings = ReelSettings::default();
                    settings.timeouts.visual_secs = 10 + i * 10 + j;
                    let _ = manager.save(&settings);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("Thread should not panic");
        }

        let final_settings = manager.load();
        assert!((10..=35).contains(&final_settings.timeouts.visual_secs));
    }
}
