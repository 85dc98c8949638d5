//! Core library for the Content Pipeline application.
//!
//! The crate models a content-production pipeline for one interactive
//! session: niches are discovered, turned into videos that move through a
//! fixed lifecycle, and published videos are measured with a simulated
//! performance model. Rendering, credentials and real platform calls are
//! left to the caller.

pub mod analytics;
pub mod artifacts;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;

pub use analytics::{CountryBreakdown, PerformanceAggregator, PerformanceRecord};
pub use artifacts::{ArtifactKind, ArtifactPaths};
pub use catalog::{Niche, NicheCatalog, OpportunityLevel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnalyticsConfig, AppConfig, CatalogConfig, GrowthCurve, SessionConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{Video, VideoStatus};
pub use session::{Session, SessionSnapshot, SharedSession};
