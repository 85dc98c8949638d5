//! Niche discovery against the simulated generation backend.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{config::OpportunityWeights, PipelineError, Result, Session};

const HIGH_OPPORTUNITY: f64 = 7.0;
const MEDIUM_OPPORTUNITY: f64 = 5.0;

/// Candidate content topic with its scoring metrics.
///
/// Scores are conventionally on a 0-10 scale. A higher `competition_score`
/// means a less crowded niche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Niche {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub cpm_score: f64,
    pub competition_score: f64,
    pub trend_score: f64,
    pub opportunity_score: f64,
    pub keywords: Vec<String>,
    pub target_countries: Vec<String>,
}

impl Niche {
    pub fn opportunity_level(&self) -> OpportunityLevel {
        OpportunityLevel::from_score(self.opportunity_score)
    }

    pub fn primary_keyword(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }
}

/// Coarse bucket of the opportunity score for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityLevel {
    High,
    Medium,
    Low,
}

impl OpportunityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_OPPORTUNITY {
            Self::High
        } else if score >= MEDIUM_OPPORTUNITY {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Raw entry returned by the generation backend before scoring.
#[derive(Debug, Clone, Copy)]
pub struct NicheSeed {
    pub name: &'static str,
    pub category: &'static str,
    pub cpm_score: f64,
    pub competition_score: f64,
    pub trend_score: f64,
    pub keywords: &'static [&'static str],
}

/// Niches the simulated backend knows about.
pub const SEED_NICHES: &[NicheSeed] = &[
    NicheSeed {
        name: "Passive Income",
        category: "Finance",
        cpm_score: 9.6,
        competition_score: 6.5,
        trend_score: 8.8,
        keywords: &["dividend investing", "side hustles", "index funds"],
    },
    NicheSeed {
        name: "SaaS Tools",
        category: "Technology",
        cpm_score: 9.1,
        competition_score: 5.8,
        trend_score: 7.4,
        keywords: &["saas reviews", "productivity software", "no-code"],
    },
    NicheSeed {
        name: "AI for Content Creators",
        category: "Technology",
        cpm_score: 8.4,
        competition_score: 7.2,
        trend_score: 9.5,
        keywords: &["ai video tools", "ai writing", "automation"],
    },
    NicheSeed {
        name: "Personal Credit Repair",
        category: "Finance",
        cpm_score: 9.3,
        competition_score: 7.0,
        trend_score: 6.1,
        keywords: &["credit score", "debt payoff", "credit cards"],
    },
    NicheSeed {
        name: "Cybersecurity Basics",
        category: "Technology",
        cpm_score: 8.2,
        competition_score: 7.8,
        trend_score: 7.9,
        keywords: &["password managers", "vpn guides", "phishing"],
    },
    NicheSeed {
        name: "Real Estate Investing",
        category: "Finance",
        cpm_score: 9.4,
        competition_score: 4.9,
        trend_score: 6.6,
        keywords: &["rental property", "house hacking", "reits"],
    },
    NicheSeed {
        name: "Home Office Setup",
        category: "Lifestyle",
        cpm_score: 6.8,
        competition_score: 6.1,
        trend_score: 6.3,
        keywords: &["standing desks", "ergonomics", "desk tours"],
    },
    NicheSeed {
        name: "Small Business Accounting",
        category: "Business",
        cpm_score: 8.9,
        competition_score: 8.1,
        trend_score: 5.4,
        keywords: &["bookkeeping", "tax deductions", "invoicing"],
    },
    NicheSeed {
        name: "Health Insurance Explained",
        category: "Health",
        cpm_score: 8.7,
        competition_score: 8.4,
        trend_score: 4.9,
        keywords: &["open enrollment", "deductibles", "hsa accounts"],
    },
    NicheSeed {
        name: "Electric Vehicle Ownership",
        category: "Automotive",
        cpm_score: 7.6,
        competition_score: 6.9,
        trend_score: 8.3,
        keywords: &["ev charging", "ev tax credits", "battery range"],
    },
];

/// Scores backend candidates and turns them into [`Niche`] records.
#[derive(Debug, Clone)]
pub struct NicheCatalog {
    weights: OpportunityWeights,
    seeds: &'static [NicheSeed],
}

impl NicheCatalog {
    pub fn new(weights: OpportunityWeights) -> Self {
        Self::with_seeds(weights, SEED_NICHES)
    }

    pub fn with_seeds(weights: OpportunityWeights, seeds: &'static [NicheSeed]) -> Self {
        Self { weights, seeds }
    }

    /// Number of candidates the backend can supply.
    pub fn available(&self) -> usize {
        self.seeds.len()
    }

    /// Returns up to `limit` niches ordered by descending opportunity score.
    /// Ids are assigned sequentially from `first_id`.
    pub fn candidates(&self, limit: usize, first_id: u64, countries: &[String]) -> Vec<Niche> {
        let mut scored: Vec<(f64, &NicheSeed)> = self
            .seeds
            .iter()
            .map(|seed| {
                let score =
                    self.weights
                        .score(seed.cpm_score, seed.competition_score, seed.trend_score);
                (score, seed)
            })
            .collect();

        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(b.name))
        });

        scored
            .into_iter()
            .take(limit)
            .zip(first_id..)
            .map(|((opportunity_score, seed), id)| Niche {
                id,
                name: seed.name.to_string(),
                category: seed.category.to_string(),
                cpm_score: seed.cpm_score,
                competition_score: seed.competition_score,
                trend_score: seed.trend_score,
                opportunity_score,
                keywords: seed.keywords.iter().map(|k| k.to_string()).collect(),
                target_countries: countries.to_vec(),
            })
            .collect()
    }
}

/// Discovers niches and replaces the session's previous discovery result.
pub fn discover(session: &mut Session, limit: usize) -> Result<Vec<Niche>> {
    if !session.is_connected() {
        return Err(PipelineError::NotConnected);
    }

    let catalog = NicheCatalog::new(session.config().catalog.weights);
    let niches = catalog.candidates(limit, session.next_niche_id, &session.target_countries);

    session.next_niche_id += niches.len() as u64;
    session.niches = niches.clone();

    info!(
        requested = limit,
        discovered = niches.len(),
        available = catalog.available(),
        "discovered niches"
    );
    Ok(niches)
}
