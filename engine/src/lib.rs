//! ReelRun Core Library
//!
//! Topic-to-reel generation pipeline.
//! This library contains the pipeline orchestrator, the provider seams for
//! script, voice, visual and composition services, and the caption and
//! timing engines that sit between them.
//!
//! Binaries (see `reelrun-cli`) build providers from [`core::settings`] and
//! drive [`core::pipeline::PipelineOrchestrator`].

pub mod core;
