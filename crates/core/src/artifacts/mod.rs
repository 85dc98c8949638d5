//! Paths follow `{category}/{kind}_{video_id}_{timestamp}.{ext}`; nothing here touches the filesystem.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Kind of artifact attached to a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Script,
    Audio,
    Video,
    Thumbnail,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Script => "txt",
            Self::Audio => "mp3",
            Self::Video => "mp4",
            Self::Thumbnail => "jpg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact locations for one video, filled in as the video advances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub script: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub thumbnail: Option<String>,
}

impl ArtifactPaths {
    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Script => self.script.as_deref(),
            ArtifactKind::Audio => self.audio.as_deref(),
            ArtifactKind::Video => self.video.as_deref(),
            ArtifactKind::Thumbnail => self.thumbnail.as_deref(),
        }
    }

    /// Computes and stores the path for `kind`, overwriting any previous one.
    pub fn assign(
        &mut self,
        category: &str,
        kind: ArtifactKind,
        video_id: u64,
        at: DateTime<Utc>,
    ) {
        let path = artifact_path(category, kind, video_id, at);
        let slot = match kind {
            ArtifactKind::Script => &mut self.script,
            ArtifactKind::Audio => &mut self.audio,
            ArtifactKind::Video => &mut self.video,
            ArtifactKind::Thumbnail => &mut self.thumbnail,
        };
        *slot = Some(path);
    }
}

/// Builds the relative path of an artifact.
pub fn artifact_path(
    category: &str,
    kind: ArtifactKind,
    video_id: u64,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}/{}_{}_{}.{}",
        category_dir(category),
        kind,
        video_id,
        at.format(TIMESTAMP_FORMAT),
        kind.extension()
    )
}

/// Lowercase directory name; runs of non-alphanumerics collapse to `_`.
fn category_dir(category: &str) -> String {
    let mut dir = String::with_capacity(category.len());
    for ch in category.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            dir.push(ch.to_ascii_lowercase());
        } else if !dir.ends_with('_') {
            dir.push('_');
        }
    }

    let dir = dir.trim_matches('_');
    if dir.is_empty() {
        "uncategorized".to_string()
    } else {
        dir.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 31, 8, 5, 9).unwrap()
    }

    #[test]
    fn builds_paths_from_the_naming_convention() {
        let path = artifact_path("Finance", ArtifactKind::Thumbnail, 7, at());
        assert_eq!(path, "finance/thumbnail_7_20250131_080509.jpg");
    }

    #[test]
    fn normalises_category_directories() {
        assert_eq!(category_dir("Personal Finance & Investing"), "personal_finance_investing");
        assert_eq!(category_dir("  "), "uncategorized");
    }

    #[test]
    fn assign_overwrites_existing_slot() {
        let mut paths = ArtifactPaths::default();
        paths.assign("Tech", ArtifactKind::Video, 1, at());
        let first = paths.video.clone();

        paths.assign("Tech", ArtifactKind::Video, 1, at() + chrono::Duration::seconds(1));
        assert_ne!(paths.video, first);
        assert_eq!(paths.get(ArtifactKind::Script), None);
        assert!(paths.get(ArtifactKind::Video).unwrap().starts_with("tech/video_1_"));
    }
}
