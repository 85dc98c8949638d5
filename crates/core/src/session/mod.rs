mod shared;

pub use shared::SharedSession;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::{
    analytics::{self, PerformanceRecord},
    catalog::{self, Niche},
    clock::{Clock, SystemClock},
    config::normalize_country,
    pipeline::{self, Video},
    AppConfig, PipelineError, Result,
};

/// In-memory state for one interactive session.
///
/// Create one per session and pass it to the pipeline operations; sessions
/// never share state. Wrap it in [`SharedSession`] when several triggers may
/// reach it concurrently.
pub struct Session {
    config: AppConfig,
    clock: Box<dyn Clock>,
    endpoint: Option<String>,
    pub(crate) target_countries: Vec<String>,
    pub(crate) niches: Vec<Niche>,
    pub(crate) videos: Vec<Video>,
    pub(crate) performance: Vec<PerformanceRecord>,
    pub(crate) next_niche_id: u64,
    pub(crate) next_video_id: u64,
}

impl Session {
    /// Starts a session driven by the host clock.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Starts a session with an explicit time source.
    pub fn with_clock(config: AppConfig, clock: impl Clock + 'static) -> Result<Self> {
        config.validate()?;
        let target_countries = normalize_countries(&config.session.default_countries)?;

        Ok(Self {
            config,
            clock: Box::new(clock),
            endpoint: None,
            target_countries,
            niches: Vec::new(),
            videos: Vec::new(),
            performance: Vec::new(),
            next_niche_id: 1,
            next_video_id: 1,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records the backend endpoint and marks the session as connected.
    pub fn connect(&mut self, endpoint: &str) -> Result<()> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(PipelineError::invalid_input(
                "a backend endpoint is required to connect",
            ));
        }

        info!(endpoint, "connected to generation backend");
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.endpoint.take().is_some() {
            info!("disconnected from generation backend");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Human readable connection status.
    pub fn api_status(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("connected to {endpoint}"),
            None => "not connected".to_string(),
        }
    }

    pub fn target_countries(&self) -> &[String] {
        &self.target_countries
    }

    /// Replaces the countries applied to future discoveries. Niches already
    /// discovered keep their own set.
    pub fn set_target_countries<I, S>(&mut self, countries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let countries: Vec<String> = countries
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        self.target_countries = normalize_countries(&countries)?;
        Ok(())
    }

    pub fn niches(&self) -> &[Niche] {
        &self.niches
    }

    pub fn niche(&self, id: u64) -> Option<&Niche> {
        self.niches.iter().find(|niche| niche.id == id)
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn video(&self, id: u64) -> Option<&Video> {
        self.videos.iter().find(|video| video.id == id)
    }

    pub(crate) fn video_mut(&mut self, id: u64) -> Option<&mut Video> {
        self.videos.iter_mut().find(|video| video.id == id)
    }

    pub fn performance(&self) -> &[PerformanceRecord] {
        &self.performance
    }

    pub fn records_for(&self, video_id: u64) -> impl Iterator<Item = &PerformanceRecord> {
        self.performance
            .iter()
            .filter(move |record| record.video_id == video_id)
    }

    pub fn discover(&mut self, limit: usize) -> Result<Vec<Niche>> {
        catalog::discover(self, limit)
    }

    pub fn generate_content(&mut self, niche_id: u64) -> Result<Video> {
        pipeline::generate_content(self, niche_id)
    }

    pub fn produce(&mut self, video_id: u64) -> Result<Video> {
        pipeline::produce(self, video_id)
    }

    pub fn publish(&mut self, video_id: u64) -> Result<Video> {
        pipeline::publish(self, video_id)
    }

    pub fn measure(&mut self, video_id: Option<u64>) -> Result<Vec<PerformanceRecord>> {
        analytics::measure(self, video_id)
    }

    /// Copies the current state for display or export.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            api_status: self.api_status(),
            connected: self.is_connected(),
            target_countries: self.target_countries.clone(),
            niches: self.niches.clone(),
            videos: self.videos.clone(),
            performance: self.performance.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            clock: Box::new(SystemClock),
            endpoint: None,
            target_countries: AppConfig::default().session.default_countries,
            niches: Vec::new(),
            videos: Vec::new(),
            performance: Vec::new(),
            next_niche_id: 1,
            next_video_id: 1,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("target_countries", &self.target_countries)
            .field("niches", &self.niches.len())
            .field("videos", &self.videos.len())
            .field("performance", &self.performance.len())
            .finish()
    }
}

/// Serialisable view over a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub api_status: String,
    pub connected: bool,
    pub target_countries: Vec<String>,
    pub niches: Vec<Niche>,
    pub videos: Vec<Video>,
    pub performance: Vec<PerformanceRecord>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Upper-cases, validates and de-duplicates two-letter country codes,
/// keeping first-seen order.
fn normalize_countries(countries: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(countries.len());
    for code in countries {
        let code = normalize_country(code)?;
        if !normalized.contains(&code) {
            normalized.push(code);
        }
    }

    if normalized.is_empty() {
        return Err(PipelineError::invalid_input(
            "at least one target country is required",
        ));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_with_default_countries() {
        let session = Session::new(AppConfig::default()).unwrap();
        assert!(session.niches().is_empty());
        assert!(session.videos().is_empty());
        assert!(session.performance().is_empty());
        assert_eq!(session.target_countries(), ["US", "CA", "GB", "AU"]);
        assert!(!session.is_connected());
    }

    #[test]
    fn connect_rejects_blank_endpoints() {
        let mut session = Session::default();
        let err = session.connect("   ").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(session.api_status(), "not connected");

        session.connect(" https://colab.example/nb ").unwrap();
        assert_eq!(session.endpoint(), Some("https://colab.example/nb"));
        assert_eq!(session.api_status(), "connected to https://colab.example/nb");

        session.disconnect();
        assert!(!session.is_connected());
    }

    #[test]
    fn normalises_target_countries() {
        let mut session = Session::default();
        session.set_target_countries(["us", "nz", "US"]).unwrap();
        assert_eq!(session.target_countries(), ["US", "NZ"]);

        assert!(session.set_target_countries(["USA"]).is_err());
        assert!(session.set_target_countries(Vec::<String>::new()).is_err());
        assert_eq!(session.target_countries(), ["US", "NZ"]);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = AppConfig::default();
        config.analytics.residual_share = 0.3;
        assert!(matches!(
            Session::new(config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn snapshot_serialises_state() {
        let mut session = Session::default();
        session.connect("https://colab.example/nb").unwrap();
        session.discover(2).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.niches.len(), 2);
        assert!(snapshot.connected);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"api_status\""));
        assert!(json.contains("Passive Income") || json.contains("AI for Content Creators"));
    }
}
