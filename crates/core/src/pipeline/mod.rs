//! Video lifecycle: `script_generated -> video_produced -> published`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    artifacts::{ArtifactKind, ArtifactPaths},
    catalog::Niche,
    PipelineError, Result, Session,
};

const PUBLICATION_PREFIX: &str = "pub";

/// Lifecycle status of a [`Video`]. Ordering follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    ScriptGenerated,
    VideoProduced,
    Published,
}

impl VideoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScriptGenerated => "script_generated",
            Self::VideoProduced => "video_produced",
            Self::Published => "published",
        }
    }

    /// The single status reachable from `self`, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::ScriptGenerated => Some(Self::VideoProduced),
            Self::VideoProduced => Some(Self::Published),
            Self::Published => None,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: u64,
    /// Niche the video was generated from. The niche may later be replaced
    /// by a new discovery.
    pub niche_id: u64,
    pub title: String,
    pub description: String,
    /// Category of the source niche, used for artifact directories.
    pub category: String,
    /// Countries of the source niche at generation time.
    pub target_countries: Vec<String>,
    pub artifacts: ArtifactPaths,
    pub publication_id: Option<String>,
    status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Video {
    pub fn status(&self) -> VideoStatus {
        self.status
    }

    pub fn is_published(&self) -> bool {
        self.status == VideoStatus::Published
    }

    /// Moves to the next lifecycle status. Any other target is refused.
    fn advance(&mut self, to: VideoStatus, operation: &'static str) -> Result<()> {
        if self.status.next() == Some(to) {
            self.status = to;
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> PipelineError {
        PipelineError::InvalidState {
            video_id: self.id,
            status: self.status,
            operation,
        }
    }
}

fn title_for(niche: &Niche) -> String {
    match niche.primary_keyword() {
        Some(keyword) => format!("{}: {} Explained", niche.name, capitalize(keyword)),
        None => format!("{}: The Complete Guide", niche.name),
    }
}

fn description_for(niche: &Niche) -> String {
    let focus = niche
        .primary_keyword()
        .map(str::to_string)
        .unwrap_or_else(|| niche.name.to_lowercase());
    format!(
        "A {} deep dive into {}, focused on {}.",
        niche.category.to_lowercase(),
        niche.name,
        focus
    )
}

fn capitalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn publication_id(video_id: u64, at: DateTime<Utc>) -> String {
    format!(
        "{PUBLICATION_PREFIX}-{video_id}-{:x}",
        at.timestamp_millis().max(0)
    )
}

/// Creates a video from a niche, in `script_generated` with script and audio
/// paths assigned.
pub fn generate_content(session: &mut Session, niche_id: u64) -> Result<Video> {
    if !session.is_connected() {
        return Err(PipelineError::NotConnected);
    }
    let niche = session
        .niche(niche_id)
        .ok_or(PipelineError::NicheNotFound(niche_id))?;

    let id = session.next_video_id;
    let now = session.now();
    let mut artifacts = ArtifactPaths::default();
    artifacts.assign(&niche.category, ArtifactKind::Script, id, now);
    artifacts.assign(&niche.category, ArtifactKind::Audio, id, now);

    let video = Video {
        id,
        niche_id,
        title: title_for(niche),
        description: description_for(niche),
        category: niche.category.clone(),
        target_countries: niche.target_countries.clone(),
        artifacts,
        publication_id: None,
        status: VideoStatus::ScriptGenerated,
        created_at: now,
        published_at: None,
    };

    session.next_video_id += 1;
    session.videos.push(video.clone());

    info!(video_id = id, niche_id, title = %video.title, "generated content");
    Ok(video)
}

/// Produces the media asset: assigns video and thumbnail paths and moves the
/// video to `video_produced`.
///
/// Re-producing a `video_produced` video regenerates its paths and keeps the
/// status. A published video is rejected with [`PipelineError::InvalidState`].
pub fn produce(session: &mut Session, video_id: u64) -> Result<Video> {
    if !session.is_connected() {
        return Err(PipelineError::NotConnected);
    }
    let now = session.now();
    let video = session
        .video_mut(video_id)
        .ok_or(PipelineError::VideoNotFound(video_id))?;

    let reproduced = match video.status {
        VideoStatus::ScriptGenerated => false,
        VideoStatus::VideoProduced => true,
        VideoStatus::Published => return Err(video.invalid("produce")),
    };

    let mut artifacts = video.artifacts.clone();
    artifacts.assign(&video.category, ArtifactKind::Video, video_id, now);
    artifacts.assign(&video.category, ArtifactKind::Thumbnail, video_id, now);

    if !reproduced {
        video.advance(VideoStatus::VideoProduced, "produce")?;
    }
    video.artifacts = artifacts;

    info!(video_id, reproduced, "produced video");
    Ok(video.clone())
}

/// Publishes a produced video, assigning its publication id and timestamp.
pub fn publish(session: &mut Session, video_id: u64) -> Result<Video> {
    if !session.is_connected() {
        return Err(PipelineError::NotConnected);
    }
    let now = session.now();
    let video = session
        .video_mut(video_id)
        .ok_or(PipelineError::VideoNotFound(video_id))?;

    video.advance(VideoStatus::Published, "publish")?;
    let publication_id = publication_id(video_id, now);
    video.publication_id = Some(publication_id.clone());
    video.published_at = Some(now);

    info!(video_id, %publication_id, "published video");
    Ok(video.clone())
}
