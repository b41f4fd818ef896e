//! Caption Document Builders
//!
//! Both builders produce documents FFmpeg's `subtitles` filter can burn in.
//!
//! - ASS: one word on screen at a time, uppercase, colored by tag, with a
//!   pop-in scale and short fades.
//! - SRT: short uppercase phrases on an even cadence, no animation. Used
//!   when word timing is unavailable.

use crate::core::{CoreError, CoreResult, TimeSec, WordTiming};

use super::{CaptionPalette, CaptionStyle};

/// Words grouped into one static caption cue
pub const STATIC_WORDS_PER_CUE: usize = 3;

/// The pop-in scale has decayed to under 5% of its peak after this long
const POP_IN_SETTLE_MS: u64 = 430;

/// Acceleration for the `\t` scale transform (< 1 decelerates)
const POP_IN_ACCEL: f64 = 0.35;

const ASS_STYLE_NAME: &str = "Reel";

// =============================================================================
// ASS (animated)
// =============================================================================

/// Builds an animated ASS document from a tagged timing table
pub fn build_animated_ass(
    timings: &[WordTiming],
    palette: &CaptionPalette,
    style: &CaptionStyle,
) -> String {
    let mut output = ass_header(style);

    let x = style.canvas_width / 2;
    let y = (style.canvas_height as f64 * style.vertical_position).round() as u32;
    let peak = (100.0 * (1.0 + style.pop_in_scale)).round() as u32;

    for timing in timings {
        let text = escape_ass_text(&timing.word.to_uppercase());
        if text.is_empty() {
            continue;
        }

        let duration_ms = (timing.duration().max(0.0) * 1000.0).round() as u64;
        let fade = (style.fade_ms as u64).min(duration_ms / 2);
        let color = palette.color_for(timing.color_tag).to_ass_inline();

        let mut tags = format!("\\an8\\pos({},{})\\1c{}\\fad({},{})", x, y, color, fade, fade);
        if peak > 100 {
            let settle = POP_IN_SETTLE_MS.min(duration_ms.max(1));
            tags.push_str(&format!(
                "\\fscx{peak}\\fscy{peak}\\t(0,{settle},{POP_IN_ACCEL},\\fscx100\\fscy100)"
            ));
        }

        output.push_str(&format!(
            "Dialogue: 0,{},{},{},,0,0,0,,{{{}}}{}\n",
            format_ass_timestamp(timing.start_seconds),
            format_ass_timestamp(timing.end_seconds),
            ASS_STYLE_NAME,
            tags,
            text
        ));
    }

    output
}

fn ass_header(style: &CaptionStyle) -> String {
    let mut header = String::new();
    header.push_str("[Script Info]\n");
    header.push_str("ScriptType: v4.00+\n");
    header.push_str(&format!("PlayResX: {}\n", style.canvas_width));
    header.push_str(&format!("PlayResY: {}\n", style.canvas_height));
    header.push_str("WrapStyle: 2\n");
    header.push_str("ScaledBorderAndShadow: yes\n\n");

    header.push_str("[V4+ Styles]\n");
    header.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
         BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
         BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    // BorderStyle 3 draws an opaque box in OutlineColour behind the text.
    let box_color = style.background_color.to_ass_color();
    header.push_str(&format!(
        "Style: {},{},{},&H00FFFFFF,&H00FFFFFF,{},{},-1,0,0,0,100,100,0,0,3,18,0,8,20,20,0,1\n\n",
        ASS_STYLE_NAME, style.font_family, style.font_size, box_color, box_color
    ));

    header.push_str("[Events]\n");
    header.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    header
}

/// Override blocks start with `{`, so braces and backslashes cannot appear
/// in dialogue text.
fn escape_ass_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '{' => Some('('),
            '}' => Some(')'),
            '\\' => None,
            '\n' | '\r' => Some(' '),
            other => Some(other),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Formats seconds as ASS timestamp (H:MM:SS.cc)
pub fn format_ass_timestamp(seconds: TimeSec) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, cs)
}

// =============================================================================
// SRT (static)
// =============================================================================

/// Builds a static SRT document without word timing.
///
/// Words are grouped into cues of [`STATIC_WORDS_PER_CUE`] and the cues share
/// `total_seconds` evenly; the last cue ends exactly at `total_seconds`.
pub fn build_static_srt(text: &str, total_seconds: TimeSec) -> CoreResult<String> {
    if !total_seconds.is_finite() || total_seconds <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "Caption duration must be positive, got {}",
            total_seconds
        )));
    }

    let words: Vec<String> = text.split_whitespace().map(|w| w.to_uppercase()).collect();
    if words.is_empty() {
        return Err(CoreError::InvalidInput(
            "Caption text cannot be empty".to_string(),
        ));
    }

    let cues: Vec<String> = words
        .chunks(STATIC_WORDS_PER_CUE)
        .map(|chunk| chunk.join(" "))
        .collect();
    let step = total_seconds / cues.len() as f64;
    let last = cues.len() - 1;

    let mut output = String::new();
    for (index, cue) in cues.iter().enumerate() {
        let start = step * index as f64;
        let end = if index == last {
            total_seconds
        } else {
            step * (index + 1) as f64
        };

        output.push_str(&format!("{}\n", index + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(start),
            format_srt_timestamp(end)
        ));
        output.push_str(cue);
        output.push_str("\n\n");
    }

    Ok(output)
}

/// Formats seconds as SRT timestamp (00:00:00,000)
pub fn format_srt_timestamp(seconds: TimeSec) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColorTag;

    fn word(text: &str, start: f64, end: f64, tag: ColorTag) -> WordTiming {
        WordTiming {
            word: text.to_string(),
            start_seconds: start,
            end_seconds: end,
            color_tag: tag,
        }
    }

    // -------------------------------------------------------------------------
    // Timestamp Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(format_srt_timestamp(90.0), "00:01:30,000");
        assert_eq!(format_srt_timestamp(5400.0), "01:30:00,000");
    }

    #[test]
    fn test_format_ass_timestamp() {
        assert_eq!(format_ass_timestamp(0.0), "0:00:00.00");
        assert_eq!(format_ass_timestamp(1.234), "0:00:01.23");
        assert_eq!(format_ass_timestamp(61.5), "0:01:01.50");
        assert_eq!(format_ass_timestamp(3725.0), "1:02:05.00");
    }

    // -------------------------------------------------------------------------
    // ASS Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_animated_ass_one_dialogue_per_word() {
        let timings = vec![
            word("Mars", 0.0, 0.8, ColorTag::Default),
            word("has", 0.8, 1.4, ColorTag::Default),
            word("2", 1.4, 2.0, ColorTag::Number),
        ];
        let ass = build_animated_ass(
            &timings,
            &CaptionPalette::default(),
            &CaptionStyle::default(),
        );

        assert!(ass.starts_with("[Script Info]"));
        assert!(ass.contains("PlayResY: 1280"));
        assert_eq!(ass.matches("Dialogue:").count(), 3);
        assert!(ass.contains("0:00:00.00,0:00:00.80,Reel"));
        assert!(ass.contains("}MARS\n"));
        assert!(ass.contains("}HAS\n"));
        // 55% of 1280
        assert!(ass.contains("\\pos(360,704)"));
        assert!(ass.contains("\\fad(80,80)"));
        assert!(ass.contains("\\fscx140\\fscy140"));
    }

    #[test]
    fn test_animated_ass_colors_follow_tags() {
        let palette = CaptionPalette::default();
        let timings = vec![
            word("15", 0.0, 1.0, ColorTag::Number),
            word("danger", 1.0, 2.0, ColorTag::Warning),
        ];
        let ass = build_animated_ass(&timings, &palette, &CaptionStyle::default());

        let lines: Vec<&str> = ass.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert!(lines[0].contains(&palette.number.to_ass_inline()));
        assert!(lines[1].contains(&palette.warning.to_ass_inline()));
    }

    #[test]
    fn test_animated_ass_fade_clamped_for_short_words() {
        let timings = vec![word("a", 0.0, 0.1, ColorTag::Default)];
        let ass = build_animated_ass(
            &timings,
            &CaptionPalette::default(),
            &CaptionStyle::default(),
        );
        assert!(ass.contains("\\fad(50,50)"));
    }

    #[test]
    fn test_animated_ass_without_pop_in() {
        let style = CaptionStyle {
            pop_in_scale: 0.0,
            ..Default::default()
        };
        let timings = vec![word("calm", 0.0, 1.0, ColorTag::Default)];
        let ass = build_animated_ass(&timings, &CaptionPalette::default(), &style);
        assert!(!ass.contains("\\fscx"));
    }

    #[test]
    fn test_ass_text_escaping() {
        assert_eq!(escape_ass_text("{bad}\\word"), "(bad)word");
        assert_eq!(escape_ass_text(" two\nlines "), "two lines");
    }

    // -------------------------------------------------------------------------
    // SRT Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_static_srt_groups_words_and_spans_duration() {
        let srt = build_static_srt("Mars has two tiny moons", 4.0).unwrap();
        let expected = "1\n00:00:00,000 --> 00:00:02,000\nMARS HAS TWO\n\n\
                        2\n00:00:02,000 --> 00:00:04,000\nTINY MOONS\n\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_static_srt_rejects_invalid_input() {
        assert!(build_static_srt("", 4.0).is_err());
        assert!(build_static_srt("hello", 0.0).is_err());
    }
}
