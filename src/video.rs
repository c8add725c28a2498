//! Video descriptor types and subtitle naming policy.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identifier;

/// Processing status of one video within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Not yet picked up.
    Pending,
    /// Resolution or save in progress.
    Downloading,
    /// Subtitle present (written now or already on disk).
    Success,
    /// No subtitle could be obtained.
    Failed,
}

impl VideoStatus {
    /// Returns the stable string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the subtitle file beside a video is named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleNaming {
    /// `movie.mp4` → `movie.srt`
    #[default]
    Plain,
    /// `movie.mp4` → `movie.en.srt`
    #[serde(rename = "language")]
    LanguageQualified,
}

impl SubtitleNaming {
    /// Suffix that replaces the video extension.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Plain => "srt",
            Self::LanguageQualified => "en.srt",
        }
    }

    /// Path of the subtitle file for `video`.
    #[must_use]
    pub fn subtitle_path(&self, video: &Path) -> PathBuf {
        video.with_extension(self.extension())
    }
}

impl std::str::FromStr for SubtitleNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" | "srt" => Ok(Self::Plain),
            "language" | "en.srt" => Ok(Self::LanguageQualified),
            _ => Err(format!("invalid subtitle naming: {s} (expected plain or language)")),
        }
    }
}

/// One video file considered by a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct VideoDescriptor {
    /// Location of the video file.
    pub path: PathBuf,
    /// Catalog identifier derived from the file name.
    pub identifier: Option<String>,
    /// Whether a subtitle already sits beside the video.
    pub has_existing_subtitle: bool,
    /// Current processing status.
    pub status: VideoStatus,
    /// Human-readable processing trace, append-only.
    pub log: Vec<String>,
}

impl VideoDescriptor {
    /// Creates a pending descriptor, deriving the identifier from the file name.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, has_existing_subtitle: bool) -> Self {
        let path = path.into();
        let identifier = identifier::extract_from_path(&path);
        Self {
            path,
            identifier,
            has_existing_subtitle,
            status: VideoStatus::Pending,
            log: Vec::new(),
        }
    }

    /// Overrides the derived identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: Option<String>) -> Self {
        self.identifier = identifier;
        self
    }

    /// Returns the display name used in logs.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |name| {
                name.to_string_lossy().into_owned()
            })
    }
}
