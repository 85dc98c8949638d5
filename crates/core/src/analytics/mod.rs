use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{round2, AnalyticsConfig},
    pipeline::Video,
    PipelineError, Result, Session,
};

const CTR_BASE: f64 = 2.0;
const CTR_SPREAD: f64 = 6.0;
const VIEW_MINUTES_BASE: f64 = 3.0;
const VIEW_MINUTES_SPREAD: f64 = 5.0;
const LIKE_RATE_BASE: f64 = 0.02;
const LIKE_RATE_SPREAD: f64 = 0.06;
const COMMENT_RATE_BASE: f64 = 0.002;
const COMMENT_RATE_SPREAD: f64 = 0.008;

/// Metrics attributed to a single country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryBreakdown {
    pub views: u64,
    pub watch_time_hours: f64,
    pub revenue: f64,
}

/// Snapshot of simulated performance for one published video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub video_id: u64,
    pub publication_id: String,
    pub views: u64,
    /// Click-through rate in percent.
    pub ctr: f64,
    pub watch_time_hours: f64,
    pub likes: u64,
    pub comments: u64,
    pub estimated_cpm: f64,
    pub estimated_revenue: f64,
    pub countries: BTreeMap<String, CountryBreakdown>,
    pub measured_at: DateTime<Utc>,
}

/// Pure metric model: every output depends only on the video id, the time
/// since publication, the CPM and the configuration.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceAggregator<'a> {
    config: &'a AnalyticsConfig,
}

impl<'a> PerformanceAggregator<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Views after `hours` since publication; non-decreasing in `hours`.
    pub fn views(&self, video_id: u64, hours: f64) -> u64 {
        let peak = self.config.growth.peak_views * (0.5 + unit(video_id, 0));
        (peak * self.config.growth.progress(hours)).round() as u64
    }

    /// Builds the record for a published video measured at `now`.
    pub fn record(
        &self,
        video: &Video,
        publication_id: &str,
        published_at: DateTime<Utc>,
        cpm: f64,
        now: DateTime<Utc>,
    ) -> PerformanceRecord {
        let id = video.id;
        let hours = (now - published_at).num_milliseconds().max(0) as f64 / 3_600_000.0;
        let views = self.views(id, hours);
        let views_f = views as f64;

        let ctr = round2(CTR_BASE + CTR_SPREAD * unit(id, 1));
        let minutes_per_view = VIEW_MINUTES_BASE + VIEW_MINUTES_SPREAD * unit(id, 2);
        let watch_time_hours = round2(views_f * minutes_per_view / 60.0);
        let likes = (views_f * (LIKE_RATE_BASE + LIKE_RATE_SPREAD * unit(id, 3))).round() as u64;
        let comments =
            (views_f * (COMMENT_RATE_BASE + COMMENT_RATE_SPREAD * unit(id, 4))).round() as u64;
        let estimated_revenue = estimated_revenue(views, cpm);

        let countries = self.partition(
            &video.target_countries,
            views,
            watch_time_hours,
            estimated_revenue,
        );

        debug!(video_id = id, hours, views, estimated_revenue, "computed performance");

        PerformanceRecord {
            video_id: id,
            publication_id: publication_id.to_string(),
            views,
            ctr,
            watch_time_hours,
            likes,
            comments,
            estimated_cpm: cpm,
            estimated_revenue,
            countries,
            measured_at: now,
        }
    }

    /// Normalised share per country. Unknown countries get the residual
    /// weight; the returned shares sum to 1 unless every weight is zero.
    pub fn shares(&self, countries: &[String]) -> Vec<(String, f64)> {
        let weights: Vec<(String, f64)> = countries
            .iter()
            .map(|code| (code.clone(), self.config.share_for(code)))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();

        if total <= f64::EPSILON {
            let even = if weights.is_empty() {
                0.0
            } else {
                1.0 / weights.len() as f64
            };
            return weights.into_iter().map(|(code, _)| (code, even)).collect();
        }

        weights
            .into_iter()
            .map(|(code, weight)| (code, weight / total))
            .collect()
    }

    fn partition(
        &self,
        countries: &[String],
        views: u64,
        watch_time_hours: f64,
        revenue: f64,
    ) -> BTreeMap<String, CountryBreakdown> {
        let shares = self.shares(countries);
        let split_views = largest_remainder(views, &shares);

        shares
            .into_iter()
            .zip(split_views)
            .map(|((code, share), views)| {
                let breakdown = CountryBreakdown {
                    views,
                    watch_time_hours: round2(watch_time_hours * share),
                    revenue: round2(revenue * share),
                };
                (code, breakdown)
            })
            .collect()
    }
}

/// `views / 1000 * cpm`, rounded to cents.
pub fn estimated_revenue(views: u64, cpm: f64) -> f64 {
    round2(views as f64 / 1000.0 * cpm)
}

/// Splits `total` by `shares` so the parts sum exactly to `total`.
fn largest_remainder(total: u64, shares: &[(String, f64)]) -> Vec<u64> {
    if shares.is_empty() {
        return Vec::new();
    }

    let exact: Vec<f64> = shares.iter().map(|(_, s)| total as f64 * s).collect();
    let mut parts: Vec<u64> = exact.iter().map(|v| v.floor() as u64).collect();
    let assigned: u64 = parts.iter().sum();
    let mut leftover = total.saturating_sub(assigned);

    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    for index in order.into_iter().cycle() {
        if leftover == 0 {
            break;
        }
        parts[index] += 1;
        leftover -= 1;
    }

    parts
}

/// Deterministic value in `[0, 1)` derived from a video id and a salt.
fn unit(video_id: u64, salt: u64) -> f64 {
    let mut x = video_id
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(salt.wrapping_mul(0xD1B5_4A32_D192_ED03));
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    (x >> 11) as f64 / (1u64 << 53) as f64
}

/// Measures one published video, or every published video when `video_id`
/// is `None`, and stores the fresh records in the session.
pub fn measure(session: &mut Session, video_id: Option<u64>) -> Result<Vec<PerformanceRecord>> {
    let targets: Vec<&Video> = match video_id {
        Some(id) => {
            let video = session.video(id).ok_or(PipelineError::VideoNotFound(id))?;
            if !video.is_published() {
                return Err(PipelineError::InvalidState {
                    video_id: id,
                    status: video.status(),
                    operation: "measure",
                });
            }
            vec![video]
        }
        None => {
            let published: Vec<&Video> =
                session.videos().iter().filter(|v| v.is_published()).collect();
            if published.is_empty() {
                return Err(PipelineError::NoPublishedVideos);
            }
            published
        }
    };

    let config = &session.config().analytics;
    let aggregator = PerformanceAggregator::new(config);
    let now = session.now();

    let mut records = Vec::with_capacity(targets.len());
    for video in targets {
        let (Some(publication_id), Some(published_at)) =
            (video.publication_id.as_deref(), video.published_at)
        else {
            return Err(PipelineError::InvalidState {
                video_id: video.id,
                status: video.status(),
                operation: "measure",
            });
        };

        let cpm = match session.niche(video.niche_id) {
            Some(niche) => niche.cpm_score,
            None => {
                warn!(
                    video_id = video.id,
                    niche_id = video.niche_id,
                    default_cpm = config.default_cpm,
                    "niche no longer available, using default CPM"
                );
                config.default_cpm
            }
        };

        records.push(aggregator.record(video, publication_id, published_at, cpm, now));
    }

    match video_id {
        Some(id) => {
            session.performance.retain(|record| record.video_id != id);
            session.performance.extend(records.iter().cloned());
        }
        None => session.performance = records.clone(),
    }

    info!(measured = records.len(), single = video_id.is_some(), "measured performance");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog, clock::ManualClock, pipeline};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn countries(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn published_session(count: usize) -> (Session, ManualClock, Vec<u64>) {
        let clock = ManualClock::starting_at(start());
        let mut session = Session::with_clock(Default::default(), clock.clone()).unwrap();
        session.connect("https://backend.example/notebook").unwrap();
        catalog::discover(&mut session, 3).unwrap();

        let niche_id = session.niches()[0].id;
        let mut ids = Vec::new();
        for _ in 0..count {
            let video = pipeline::generate_content(&mut session, niche_id).unwrap();
            pipeline::produce(&mut session, video.id).unwrap();
            pipeline::publish(&mut session, video.id).unwrap();
            ids.push(video.id);
        }
        (session, clock, ids)
    }

    #[test]
    fn unit_values_are_deterministic_and_bounded() {
        for id in 0..200 {
            let value = unit(id, 3);
            assert_eq!(value, unit(id, 3));
            assert!((0.0..1.0).contains(&value));
        }
        assert_ne!(unit(1, 0), unit(1, 1));
    }

    #[test]
    fn views_grow_with_elapsed_time() {
        let config = AnalyticsConfig::default();
        let aggregator = PerformanceAggregator::new(&config);
        let mut last = 0;
        for hour in 0..400 {
            let views = aggregator.views(42, hour as f64);
            assert!(views >= last);
            last = views;
        }
        assert!(last > aggregator.views(42, 0.0));
    }

    #[test]
    fn shares_use_table_and_residual() {
        let config = AnalyticsConfig::default();
        let aggregator = PerformanceAggregator::new(&config);
        let shares = aggregator.shares(&countries(&["US", "CA", "GB", "AU", "NZ"]));

        let total: f64 = shares.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((shares[0].1 - 0.55).abs() < 1e-9);
        assert!((shares[4].1 - 0.08).abs() < 1e-9);

        let only_us = aggregator.shares(&countries(&["US"]));
        assert_eq!(only_us, vec![("US".to_string(), 1.0)]);
    }

    #[test]
    fn largest_remainder_preserves_total() {
        let shares = vec![
            ("A".to_string(), 1.0 / 3.0),
            ("B".to_string(), 1.0 / 3.0),
            ("C".to_string(), 1.0 / 3.0),
        ];
        let parts = largest_remainder(1000, &shares);
        assert_eq!(parts.iter().sum::<u64>(), 1000);
        assert_eq!(parts, vec![334, 333, 333]);
        assert!(largest_remainder(10, &[]).is_empty());
    }

    #[test]
    fn measures_single_video_with_niche_cpm() {
        let (mut session, clock, ids) = published_session(1);
        clock.advance(Duration::hours(48)).unwrap();

        let records = measure(&mut session, Some(ids[0])).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        let cpm = session.niches()[0].cpm_score;
        assert_eq!(record.estimated_cpm, cpm);
        assert_eq!(record.estimated_revenue, estimated_revenue(record.views, cpm));
        assert_eq!(
            record.countries.values().map(|c| c.views).sum::<u64>(),
            record.views
        );
        let revenue: f64 = record.countries.values().map(|c| c.revenue).sum();
        assert!((revenue - record.estimated_revenue).abs() <= 0.05);
        assert!(record.likes <= record.views);
        assert!(record.comments <= record.likes);
        assert_eq!(session.performance(), records.as_slice());
    }

    #[test]
    fn falls_back_to_default_cpm_when_niche_is_gone() {
        let (mut session, _, ids) = published_session(1);
        catalog::discover(&mut session, 3).unwrap();

        let record = &measure(&mut session, Some(ids[0])).unwrap()[0];
        assert_eq!(record.estimated_cpm, session.config().analytics.default_cpm);
    }

    #[test]
    fn repeated_measurement_is_reproducible() {
        let (mut session, _, ids) = published_session(1);
        let first = measure(&mut session, Some(ids[0])).unwrap();
        let second = measure(&mut session, Some(ids[0])).unwrap();

        assert_eq!(first, second);
        assert_eq!(session.performance().len(), 1);
    }

    #[test]
    fn single_measurement_keeps_other_records() {
        let (mut session, clock, ids) = published_session(2);
        measure(&mut session, None).unwrap();
        let other = session.records_for(ids[1]).cloned().collect::<Vec<_>>();

        clock.advance(Duration::hours(10)).unwrap();
        let updated = measure(&mut session, Some(ids[0])).unwrap();

        assert_eq!(session.performance().len(), 2);
        assert_eq!(session.records_for(ids[1]).cloned().collect::<Vec<_>>(), other);
        assert_eq!(session.records_for(ids[0]).cloned().collect::<Vec<_>>(), updated);
    }

    #[test]
    fn measuring_all_requires_published_videos() {
        let clock = ManualClock::starting_at(start());
        let mut session = Session::with_clock(Default::default(), clock).unwrap();
        assert!(matches!(
            measure(&mut session, None),
            Err(PipelineError::NoPublishedVideos)
        ));
        assert!(matches!(
            measure(&mut session, Some(5)),
            Err(PipelineError::VideoNotFound(5))
        ));
    }

    #[test]
    fn unpublished_video_cannot_be_measured() {
        let (mut session, _, _) = published_session(0);
        let niche_id = session.niches()[0].id;
        let video = pipeline::generate_content(&mut session, niche_id).unwrap();

        let err = measure(&mut session, Some(video.id)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { operation: "measure", .. }));
        assert!(session.performance().is_empty());
    }
}
