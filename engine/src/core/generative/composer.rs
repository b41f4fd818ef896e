//! FFmpeg Reel Composer
//!
//! Writes the caption document for the plan and muxes everything with the
//! system FFmpeg.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use super::providers::{placeholder_path, CaptionPlan, CompositionRequest, ReelComposer};
use crate::core::captions::{build_animated_ass, build_static_srt, CaptionPalette, CaptionStyle};
use crate::core::ffmpeg::{CaptionBurnIn, FFmpegRunner, ReelRenderSettings};
use crate::core::fs::atomic_write_bytes;
use crate::core::timing::validate_timings;
use crate::core::{CoreError, CoreResult, TimeSec, VisualAsset};

/// Fill color of placeholder visuals
pub const PLACEHOLDER_RGB: (u8, u8, u8) = (20, 20, 40);

/// Line count of the canvas libass assumes for documents without one (SRT)
const LIBASS_DEFAULT_PLAY_RES_Y: f64 = 288.0;

/// libass style override for static SRT captions.
///
/// Sizes are rescaled from the reel canvas to libass' default canvas so the
/// phrases render at the same size as animated words.
pub fn static_caption_style(palette: &CaptionPalette, style: &CaptionStyle) -> String {
    let scale = LIBASS_DEFAULT_PLAY_RES_Y / style.canvas_height.max(1) as f64;
    let font_size = (style.font_size as f64 * scale).round().max(1.0) as u32;
    let margin_v =
        (style.canvas_height as f64 * (1.0 - style.vertical_position) * scale).round() as u32;

    format!(
        "Fontname={},Fontsize={},PrimaryColour={},BackColour={},OutlineColour={},BorderStyle=3,Outline=1,Shadow=0,Bold=1,Alignment=2,MarginV={}",
        style.font_family,
        font_size,
        palette.default.to_ass_color(),
        style.background_color.to_ass_color(),
        style.background_color.to_ass_color(),
        margin_v
    )
}

/// [`ReelComposer`] backed by the FFmpeg CLI
#[derive(Clone)]
pub struct FfmpegComposer {
    runner: FFmpegRunner,
    render: ReelRenderSettings,
    palette: CaptionPalette,
    style: CaptionStyle,
}

impl FfmpegComposer {
    pub fn new(runner: FFmpegRunner, render: ReelRenderSettings) -> Self {
        Self {
            runner,
            render,
            palette: CaptionPalette::default(),
            style: CaptionStyle::default(),
        }
    }

    /// Sets caption colors and layout
    pub fn with_captions(mut self, palette: CaptionPalette, style: CaptionStyle) -> Self {
        self.palette = palette;
        self.style = style;
        self
    }

    /// Writes the caption document for `plan` into `work_dir`
    pub fn write_caption_document(
        &self,
        plan: &CaptionPlan,
        script_text: &str,
        total_seconds: TimeSec,
        work_dir: &Path,
    ) -> CoreResult<CaptionBurnIn> {
        match plan {
            CaptionPlan::Animated(timings) => {
                let expected = script_text.split_whitespace().count();
                validate_timings(timings, expected, total_seconds)?;

                let path = work_dir.join("captions.ass");
                let document = build_animated_ass(timings, &self.palette, &self.style);
                atomic_write_bytes(&path, document.as_bytes())
                    .map_err(|e| CoreError::CaptionTimingFailed(e.to_string()))?;
                Ok(CaptionBurnIn::styled_document(path))
            }
            CaptionPlan::Static => {
                let path = work_dir.join("captions.srt");
                let document = build_static_srt(script_text, total_seconds)
                    .map_err(|e| CoreError::CompositionFailed(e.to_string()))?;
                atomic_write_bytes(&path, document.as_bytes())?;
                Ok(CaptionBurnIn::with_force_style(
                    path,
                    static_caption_style(&self.palette, &self.style),
                ))
            }
        }
    }
}

#[async_trait]
impl ReelComposer for FfmpegComposer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn compose_output(&self, request: &CompositionRequest<'_>) -> CoreResult<()> {
        let duration = request.script.audio_duration_seconds;
        let captions = self.write_caption_document(
            request.captions,
            &request.script.text,
            duration,
            request.work_dir,
        )?;

        self.runner
            .compose_reel(
                &request.visual.path,
                &request.script.audio_path,
                Some(&captions),
                duration,
                request.output_path,
                &self.render,
            )
            .await?;

        if !request.output_path.exists() {
            return Err(CoreError::CompositionFailed(format!(
                "FFmpeg reported success but {} is missing",
                request.output_path.display()
            )));
        }

        info!("Reel composed: {}", request.output_path.display());
        Ok(())
    }

    async fn render_placeholder(
        &self,
        duration_seconds: TimeSec,
        out_dir: &Path,
    ) -> CoreResult<VisualAsset> {
        let path = placeholder_path(out_dir);
        self.runner
            .solid_color_video(PLACEHOLDER_RGB, duration_seconds, &path, &self.render)
            .await?;
        info!("Placeholder visual rendered: {}", path.display());
        Ok(VisualAsset::fallback(path, duration_seconds))
    }
}
