//! Directory enumeration of candidate video files.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::video::{SubtitleNaming, VideoDescriptor};

/// File extensions treated as videos, compared case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mkv", "avi"];

/// Errors from scanning a root directory.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root does not exist.
    #[error("video directory not found: {}", path.display())]
    RootNotFound {
        /// The missing root.
        path: PathBuf,
    },

    /// The root exists but is not a directory.
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
}

/// Returns true if `path` has one of [`VIDEO_EXTENSIONS`].
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Returns true if a subtitle under either naming convention sits beside `video`.
#[must_use]
pub fn has_existing_subtitle(video: &Path) -> bool {
    [SubtitleNaming::Plain, SubtitleNaming::LanguageQualified]
        .iter()
        .any(|naming| naming.subtitle_path(video).is_file())
}

/// Recursively finds video files under `root`, in file-name order per directory.
///
/// Unreadable entries are skipped with a warning.
///
/// # Errors
///
/// Returns [`ScanError`] if `root` is missing or is not a directory.
pub fn scan_videos(root: &Path) -> Result<Vec<VideoDescriptor>, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut videos = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(error = %error, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_video_file(path) {
            continue;
        }

        let descriptor = VideoDescriptor::new(path, has_existing_subtitle(path));
        debug!(
            path = %path.display(),
            identifier = ?descriptor.identifier,
            has_existing_subtitle = descriptor.has_existing_subtitle,
            "found video"
        );
        videos.push(descriptor);
    }

    Ok(videos)
}
