//! FFmpeg Detection Module
//!
//! Locates FFmpeg/FFprobe binaries from explicit paths or the system PATH.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{FFmpegError, FFmpegResult};

/// Information about detected FFmpeg installation
#[derive(Debug, Clone)]
pub struct FFmpegInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary
    pub ffprobe_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

/// Detect FFmpeg, preferring an explicitly configured binary directory
pub fn detect_ffmpeg(binary_dir: Option<&Path>) -> FFmpegResult<FFmpegInfo> {
    if let Some(dir) = binary_dir {
        let ffmpeg_path = dir.join(binary_name("ffmpeg"));
        let ffprobe_path = dir.join(binary_name("ffprobe"));
        if ffmpeg_path.exists() && ffprobe_path.exists() {
            let version = get_ffmpeg_version(&ffmpeg_path)?;
            return Ok(FFmpegInfo {
                ffmpeg_path,
                ffprobe_path,
                version,
            });
        }
        tracing::warn!(
            "FFmpeg not found in {}, falling back to PATH",
            dir.display()
        );
    }

    detect_system_ffmpeg()
}

/// Detect FFmpeg from system PATH
pub fn detect_system_ffmpeg() -> FFmpegResult<FFmpegInfo> {
    let ffmpeg_path = which("ffmpeg")?;
    let ffprobe_path = which("ffprobe")?;

    let version = get_ffmpeg_version(&ffmpeg_path)?;

    Ok(FFmpegInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

fn binary_name(stem: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

/// Find a binary in common install locations, then via `which`/`where`
fn which(stem: &str) -> FFmpegResult<PathBuf> {
    let name = binary_name(stem);

    for dir in get_common_ffmpeg_paths() {
        let candidate = dir.join(&name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let locator = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };
    let output = Command::new(locator)
        .arg(stem)
        .output()
        .map_err(|_| FFmpegError::NotFound)?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = path_str.lines().next() {
            let trimmed = first_line.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }
    }

    Err(FFmpegError::NotFound)
}

/// Get common FFmpeg installation paths for the current platform
fn get_common_ffmpeg_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin"));

        if let Ok(userprofile) = std::env::var("USERPROFILE") {
            paths.push(PathBuf::from(userprofile).join("scoop").join("shims"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/opt/homebrew/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/snap/bin"));
    }

    paths
}

/// Get FFmpeg version string
fn get_ffmpeg_version(ffmpeg_path: &Path) -> FFmpegResult<String> {
    let output = Command::new(ffmpeg_path)
        .arg("-version")
        .output()
        .map_err(FFmpegError::ProcessError)?;

    if !output.status.success() {
        return Err(FFmpegError::ExecutionFailed(
            "Failed to get FFmpeg version".to_string(),
        ));
    }

    parse_version(&String::from_utf8_lossy(&output.stdout))
}

/// Parses "ffmpeg version X.X.X ..." from the first output line
fn parse_version(output: &str) -> FFmpegResult<String> {
    let Some(first_line) = output.lines().next().filter(|l| !l.trim().is_empty()) else {
        return Err(FFmpegError::ParseError(
            "Could not parse FFmpeg version".to_string(),
        ));
    };

    Ok(first_line
        .strip_prefix("ffmpeg version ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(first_line)
        .to_string())
}

/// Validate that FFmpeg binaries are functional
pub fn validate_ffmpeg(info: &FFmpegInfo) -> FFmpegResult<()> {
    for (label, path) in [("FFmpeg", &info.ffmpeg_path), ("FFprobe", &info.ffprobe_path)] {
        let output = Command::new(path)
            .arg("-version")
            .output()
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            return Err(FFmpegError::ExecutionFailed(format!(
                "{} binary is not functional",
                label
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_paths_not_empty() {
        let paths = get_common_ffmpeg_paths();
        assert!(!paths.is_empty());
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023\nbuilt with gcc")
                .unwrap(),
            "6.1.1-3ubuntu5"
        );
        assert_eq!(parse_version("custom build\n").unwrap(), "custom build");
        assert!(parse_version("").is_err());
    }

    #[test]
    fn test_detect_system_ffmpeg() {
        // Passes whether or not FFmpeg is installed
        if let Ok(info) = detect_system_ffmpeg() {
            assert!(!info.version.is_empty());
            assert!(info.ffprobe_path.file_name().is_some());
        }
    }
}
