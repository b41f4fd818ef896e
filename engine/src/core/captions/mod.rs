//! Caption System Module
//!
//! Turns a word timing table into burn-in caption documents:
//! - Semantic color tagging of spoken words
//! - Color palette and caption style
//! - Animated ASS (one word at a time, pop-in) and static SRT export
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption System                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  classifier.rs - Word → ColorTag (number/warning/highlight)     │
//! │  palette.rs    - Color, CaptionPalette, CaptionStyle            │
//! │  document.rs   - ASS (animated) and SRT (static) builders       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use crate::core::captions::{build_animated_ass, CaptionClassifier, CaptionPalette, CaptionStyle};
//!
//! let classifier = CaptionClassifier::default();
//! classifier.tag_all(&mut timings);
//!
//! let ass = build_animated_ass(&timings, &CaptionPalette::default(), &CaptionStyle::default());
//! ```

mod classifier;
mod document;
mod palette;

pub use classifier::{CaptionClassifier, CaptionWordLists};
pub use document::{
    build_animated_ass, build_static_srt, format_ass_timestamp, format_srt_timestamp,
    STATIC_WORDS_PER_CUE,
};
pub use palette::{CaptionPalette, CaptionStyle, Color};
