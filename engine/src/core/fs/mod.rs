//! Filesystem utilities.
//!
//! Crash-tolerant writes for settings and timing tables, output name
//! validation, and the per-run working directory layout.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// Path Validation Utilities
// =============================================================================

/// Validates that an output file name is a single safe path component.
///
/// Rejects empty names, traversal sequences (`..`), path separators,
/// drive letters and control characters.
pub fn validate_output_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("outputName is empty or contains only whitespace".to_string());
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err("Invalid outputName: contains path traversal characters".to_string());
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err("Invalid outputName: contains control characters".to_string());
    }
    Ok(())
}

// =============================================================================
// Run Workspace
// =============================================================================

/// Directory layout for one pipeline run.
///
/// Intermediate artifacts live under `{work_root}/{run_id}/`; the composed
/// reel goes to `{output_dir}/{output_name}`.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    run_dir: PathBuf,
    output_path: PathBuf,
}

impl RunWorkspace {
    /// Computes the layout without touching the filesystem
    pub fn new(work_root: &Path, output_dir: &Path, run_id: &str, output_name: &str) -> Self {
        Self {
            run_dir: work_root.join(run_id),
            output_path: output_dir.join(output_name.trim()),
        }
    }

    /// Creates the run and output directories
    pub fn prepare(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.audio_dir())?;
        std::fs::create_dir_all(self.visual_dir())?;
        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.run_dir.join("audio")
    }

    pub fn visual_dir(&self) -> PathBuf {
        self.run_dir.join("visuals")
    }

    /// Plain-text word timing table
    pub fn timing_table_path(&self) -> PathBuf {
        self.run_dir.join("timestamps.txt")
    }

    /// Where the composer writes before the reel is moved into place.
    ///
    /// Keeps the container extension of the final name so FFmpeg picks the
    /// same muxer.
    pub fn partial_output_path(&self) -> PathBuf {
        let extension = self
            .output_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        self.run_dir.join(format!("reel.partial.{extension}"))
    }

    /// Final composed reel
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

// =============================================================================
// Atomic Writes
// =============================================================================

/// Write bytes to `path` using an atomic replace pattern.
///
/// Writes a sibling temporary file, syncs it, then renames it into place.
/// An existing destination is moved aside as `.bak` first and removed after
/// the swap succeeds.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_path(path, "tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    atomic_replace(path, &tmp_path)
}

/// Write a JSON file atomically with pretty formatting.
pub fn atomic_write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes)
}

/// Moves a finished file onto `dest`, replacing any previous file only once
/// the new one is in place.
///
/// Falls back to copy + remove when `src` sits on another filesystem.
pub fn promote_file(src: &Path, dest: &Path) -> CoreResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let staged = sibling_path(dest, "tmp");
    if std::fs::rename(src, &staged).is_err() {
        std::fs::copy(src, &staged)?;
        std::fs::remove_file(src)?;
    }
    atomic_replace(dest, &staged)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| suffix.to_string());
    sibling.set_file_name(format!("{file_name}.{suffix}"));
    sibling
}

fn atomic_replace(dest: &Path, src_tmp: &Path) -> CoreResult<()> {
    if !dest.exists() {
        std::fs::rename(src_tmp, dest)?;
        return Ok(());
    }

    // Rename-over-existing is not portable; swap through a backup.
    let bak = sibling_path(dest, "bak");
    if bak.exists() {
        let _ = std::fs::remove_file(&bak);
    }

    std::fs::rename(dest, &bak)?;
    match std::fs::rename(src_tmp, dest) {
        Ok(()) => {
            let _ = std::fs::remove_file(&bak);
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::rename(&bak, dest);
            let _ = std::fs::remove_file(src_tmp);
            Err(CoreError::IoError(e))
        }
    }
}
