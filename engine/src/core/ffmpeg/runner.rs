//! FFmpeg Runner Module
//!
//! Executes FFmpeg commands for the reel pipeline. Argument lists are built
//! by pure functions so they can be checked without a binary present.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{FFmpegError, FFmpegInfo, FFmpegResult};

/// Lines of stderr kept in execution errors
const STDERR_TAIL_LINES: usize = 12;

/// Output encoding for every video the pipeline writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReelRenderSettings {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Output frame rate
    pub fps: u32,
    /// Video codec (e.g., "libx264")
    pub video_codec: String,
    /// Audio codec (e.g., "aac")
    pub audio_codec: String,
    /// Audio bitrate (e.g., "192k")
    pub audio_bitrate: String,
    /// Preset (for x264/x265: ultrafast, superfast, fast, medium, slow)
    pub preset: String,
    /// CRF value for quality-based encoding (0-51, lower is better)
    pub crf: Option<u8>,
}

impl Default for ReelRenderSettings {
    fn default() -> Self {
        Self {
            width: 720,
            height: 1280,
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            preset: "medium".to_string(),
            crf: Some(23),
        }
    }
}

impl ReelRenderSettings {
    /// Scale to the target height, center-crop wide sources and pad narrow
    /// ones with black.
    fn fit_filter(&self) -> String {
        let (w, h) = (self.width, self.height);
        format!(
            "scale=-2:{h},crop=w=min(iw\\,{w}):h={h},pad={w}:{h}:(ow-iw)/2:0:black,setsar=1"
        )
    }

    fn video_codec_args(&self) -> Vec<String> {
        let mut args = vec![
            "-r".to_string(),
            self.fps.to_string(),
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
        ];
        if let Some(crf) = self.crf {
            args.push("-crf".to_string());
            args.push(crf.to_string());
        }
        args.push("-pix_fmt".to_string());
        args.push("yuv420p".to_string());
        args
    }
}

/// Subtitle document burned into the final reel
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionBurnIn {
    /// ASS or SRT document
    pub path: PathBuf,
    /// libass style override, used for SRT documents
    pub force_style: Option<String>,
}

impl CaptionBurnIn {
    /// Document that carries its own styling (ASS)
    pub fn styled_document(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            force_style: None,
        }
    }

    /// Plain document rendered with a style override (SRT)
    pub fn with_force_style(path: impl Into<PathBuf>, force_style: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            force_style: Some(force_style.into()),
        }
    }

    fn filter(&self) -> String {
        let mut filter = format!("subtitles=filename={}", escape_filter_path(&self.path));
        if let Some(style) = &self.force_style {
            filter.push_str(&format!(":force_style='{}'", style));
        }
        filter
    }
}

/// Escapes a path for use as a filter option value
pub fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '\\' => escaped.push('/'),
            ':' | '\'' | ',' | '[' | ']' | ';' => {
                escaped.push('\\');
                escaped.push(c);
            }
            other => escaped.push(other),
        }
    }
    escaped
}

/// Arguments for the final composition.
///
/// The visual loops as needed and the output is cut to `duration_sec`, so a
/// short clip is repeated and a long clip is trimmed to the voiceover.
pub fn build_compose_args(
    visual: &Path,
    audio: &Path,
    captions: Option<&CaptionBurnIn>,
    duration_sec: f64,
    output: &Path,
    settings: &ReelRenderSettings,
) -> Vec<String> {
    let mut filter = settings.fit_filter();
    if let Some(captions) = captions {
        filter.push(',');
        filter.push_str(&captions.filter());
    }

    let mut args = vec![
        "-y".to_string(),
        "-stream_loop".to_string(),
        "-1".to_string(),
        "-i".to_string(),
        visual.to_string_lossy().to_string(),
        "-i".to_string(),
        audio.to_string_lossy().to_string(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-t".to_string(),
        format!("{:.3}", duration_sec),
        "-vf".to_string(),
        filter,
    ];
    args.extend(settings.video_codec_args());
    args.extend([
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-b:a".to_string(),
        settings.audio_bitrate.clone(),
        output.to_string_lossy().to_string(),
    ]);
    args
}

/// Extracts `format.duration` from `ffprobe -print_format json` output
pub fn parse_probe_duration(json_str: &str) -> FFmpegResult<f64> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FFmpegError::ParseError(format!("Invalid JSON: {}", e)))?;

    let duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| match d {
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            serde_json::Value::Number(n) => n.as_f64(),
            _ => None,
        })
        .ok_or_else(|| FFmpegError::ParseError("Missing format.duration".to_string()))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(FFmpegError::ParseError(format!(
            "Non-positive duration: {}",
            duration
        )));
    }
    Ok(duration)
}

/// FFmpeg Runner for executing video processing commands
#[derive(Clone)]
pub struct FFmpegRunner {
    info: Arc<FFmpegInfo>,
}

impl FFmpegRunner {
    /// Create a new FFmpegRunner from detected FFmpeg installation
    pub fn new(info: FFmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    /// Get the FFmpeg info
    pub fn info(&self) -> &FFmpegInfo {
        &self.info
    }

    /// Measures the playback length of a media file in seconds
    pub async fn probe_duration(&self, input: &Path) -> FFmpegResult<f64> {
        ensure_input(input)?;

        let output = tokio::process::Command::new(&self.info.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                &input.to_string_lossy(),
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ProbeError(format!("FFprobe failed: {}", stderr)));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    /// Turns a still image into a vertical video of `duration_sec`
    pub async fn image_to_video(
        &self,
        image: &Path,
        duration_sec: f64,
        output: &Path,
        settings: &ReelRenderSettings,
    ) -> FFmpegResult<()> {
        ensure_input(image)?;
        ensure_output_dir(output)?;

        let mut args = vec![
            "-y".to_string(),
            "-loop".to_string(),
            "1".to_string(),
            "-i".to_string(),
            image.to_string_lossy().to_string(),
            "-t".to_string(),
            format!("{:.3}", duration_sec),
            "-vf".to_string(),
            settings.fit_filter(),
            "-an".to_string(),
        ];
        args.extend(settings.video_codec_args());
        args.push(output.to_string_lossy().to_string());

        self.run(&args, "Image-to-video conversion").await
    }

    /// Writes a solid-color video of `duration_sec`
    pub async fn solid_color_video(
        &self,
        rgb: (u8, u8, u8),
        duration_sec: f64,
        output: &Path,
        settings: &ReelRenderSettings,
    ) -> FFmpegResult<()> {
        ensure_output_dir(output)?;

        let source = format!(
            "color=c=0x{:02X}{:02X}{:02X}:s={}x{}:r={}:d={:.3}",
            rgb.0, rgb.1, rgb.2, settings.width, settings.height, settings.fps, duration_sec
        );
        let mut args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            source,
        ];
        args.extend(settings.video_codec_args());
        args.push(output.to_string_lossy().to_string());

        self.run(&args, "Placeholder video generation").await
    }

    /// Muxes visual and voiceover into the final reel, burning in captions
    pub async fn compose_reel(
        &self,
        visual: &Path,
        audio: &Path,
        captions: Option<&CaptionBurnIn>,
        duration_sec: f64,
        output: &Path,
        settings: &ReelRenderSettings,
    ) -> FFmpegResult<()> {
        ensure_input(visual)?;
        ensure_input(audio)?;
        if let Some(captions) = captions {
            ensure_input(&captions.path)?;
        }
        ensure_output_dir(output)?;

        let args = build_compose_args(visual, audio, captions, duration_sec, output, settings);
        self.run(&args, "Reel composition").await
    }

    async fn run(&self, args: &[String], context: &str) -> FFmpegResult<()> {
        tracing::debug!("ffmpeg {}", args.join(" "));

        let output = tokio::process::Command::new(&self.info.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(FFmpegError::ExecutionFailed(format!(
                "{} failed: {}",
                context, tail
            )));
        }

        Ok(())
    }
}

fn ensure_input(input: &Path) -> FFmpegResult<()> {
    if !input.exists() {
        return Err(FFmpegError::InvalidInput(format!(
            "Input file does not exist: {}",
            input.display()
        )));
    }
    Ok(())
}

fn ensure_output_dir(output: &Path) -> FFmpegResult<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            FFmpegError::OutputError(format!("Failed to create output directory: {}", e))
        })?;
    }
    Ok(())
}
